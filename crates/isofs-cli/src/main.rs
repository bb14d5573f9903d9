mod cli;
mod sector_writer;

use isofs::entry::{Attributes, EntryIdx, EntryKind};
use isofs::{Config, DirTree, VolumeIdentifiers, VolumeWriter};
use sector_writer::PlainSectorWriter;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Walks `src_dir` with `walkdir` and inserts every file and directory
/// into `tree` under `root`. Directories are created on first sight of a
/// path under them, so a file's parent always exists by the time it is
/// inserted regardless of walkdir's traversal order within a directory.
fn capture_dir(
  tree: &mut DirTree,
  root: EntryIdx,
  src_dir: &Path,
  config: &Config,
) -> Result<(), isofs::Error> {
  let mut dirs: HashMap<PathBuf, EntryIdx> = HashMap::new();
  dirs.insert(src_dir.to_path_buf(), root);

  let mut entries: Vec<_> = walkdir::WalkDir::new(src_dir)
    .min_depth(1)
    .into_iter()
    .collect::<std::result::Result<Vec<_>, _>>()?;
  entries.sort_by(|a, b| a.path().cmp(b.path()));

  for entry in entries {
    let path = entry.path();
    let parent_path = path.parent().unwrap_or(src_dir);
    let parent = *dirs.get(parent_path).expect("walkdir visits parents first");
    let name = entry.file_name().to_string_lossy().into_owned();

    if entry.file_type().is_dir() {
      let (subdir, _existed) = tree.add_subdir(parent, &name, Some(path), Attributes::default(), config);
      dirs.insert(path.to_path_buf(), subdir);
    } else if entry.file_type().is_file() {
      let id = if name.contains(';') {
        name
      } else {
        format!("{};1", name)
      };
      tree.add_file(
        parent,
        &id,
        EntryKind::File,
        path,
        Attributes::default(),
        None,
        config,
        None,
      )?;
    }
  }

  Ok(())
}

fn main() -> Result<(), isofs::Error> {
  pretty_env_logger::init();

  let cli = cli::parse();

  match cli.command {
    cli::Command::Create { output, directory } => {
      let config = Config::default();

      let mut tree = DirTree::create_root(config.build_time.into(), false, &config);
      let root = tree.root();
      capture_dir(&mut tree, root, &directory, &config)?;

      let out_file = std::fs::File::create(&output)?;
      let mut writer = PlainSectorWriter::new(out_file);

      let total_sectors = VolumeWriter::emit(
        &mut tree,
        &VolumeIdentifiers::default(),
        None,
        &config,
        &mut writer,
      )?;

      log::info!("wrote {} ({} sectors)", output.display(), total_sectors);
    }
  }

  Ok(())
}
