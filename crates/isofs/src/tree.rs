//! In-memory directory tree: insertion, duplicate handling, and directory
//! record sizing.

use crate::config::Config;
use crate::entry::{Attributes, DirEntry, EntryIdx, EntryKind, EntryStore, DA_PLACEHOLDER};
use crate::error::{Error, Result};
use crate::pair::{round_to_even, IsoDate};
use crate::redbook::{cdda_length_bytes, RedbookProbe};
use std::path::{Path, PathBuf};

/// A directory tree rooted at a single entry in a shared [`EntryStore`].
pub struct DirTree {
  store: EntryStore,
  root: EntryIdx,
}

fn record_size(id_len: usize, xa_enabled: bool) -> u32 {
  let base = round_to_even(33 + id_len as u32);
  base + if xa_enabled { 14 } else { 0 }
}

/// Adds `rec` to `total`, first rounding `total` up to the next sector
/// boundary if `rec` would otherwise straddle one.
fn add_with_boundary(total: u32, rec: u32) -> u32 {
  let remaining = 2048 - (total % 2048);

  if rec > remaining {
    round_to_even_sector(total) + rec
  } else {
    total + rec
  }
}

fn round_to_even_sector(v: u32) -> u32 {
  (v + 2047) / 2048 * 2048
}

impl DirTree {
  /// Creates a tree whose root directory carries `date` (folded modulo 100
  /// when `config.new_type` is unset).
  pub fn create_root(date: IsoDate, hidden: bool, config: &Config) -> Self {
    let date = if config.new_type {
      date
    } else {
      date.with_legacy_year_mod()
    };

    let mut store = EntryStore::new();
    let root = store.push(DirEntry {
      id: String::new(),
      kind: EntryKind::Directory,
      attrs: Attributes {
        hidden,
        ..Attributes::default()
      },
      date,
      length: 0,
      lba: 0,
      src_path: PathBuf::new(),
      track_id: None,
      parent: None,
      children: Vec::new(),
      dir_entry_len: 0,
    });

    Self { store, root }
  }

  pub fn root(&self) -> EntryIdx {
    self.root
  }

  pub fn store(&self) -> &EntryStore {
    &self.store
  }

  pub fn store_mut(&mut self) -> &mut EntryStore {
    &mut self.store
  }

  fn duplicate_exists(&self, dir: EntryIdx, id: &str) -> bool {
    let wanted = id.to_ascii_uppercase();
    self.store.get(dir).children.iter().any(|&c| {
      let child = self.store.get(c);
      !child.is_directory() && child.id.to_ascii_uppercase() == wanted
    })
  }

  /// Adds a named, non-directory entry (`File`, `Xa`, `XaDataOnly`, or
  /// `CddaTrack`) under `dir`.
  pub fn add_file(
    &mut self,
    dir: EntryIdx,
    id: &str,
    kind: EntryKind,
    src_path: &Path,
    attrs: Attributes,
    track_id: Option<u32>,
    config: &Config,
    redbook: Option<&dyn RedbookProbe>,
  ) -> Result<EntryIdx> {
    let full_id = id.to_ascii_uppercase();

    if self.duplicate_exists(dir, &full_id) {
      return Err(Error::DuplicateEntry { id: full_id });
    }

    let (resolved_kind, length, date) = match kind {
      EntryKind::CddaTrack => {
        let Some(probe) = redbook else {
          return Err(Error::AudioProbeFailed(src_path.to_path_buf()));
        };
        if track_id.is_none() {
          return Err(Error::MissingTrackId { id: full_id });
        }
        let length = cdda_length_bytes(probe, src_path)?;
        let date: IsoDate = config.build_time.into();
        (EntryKind::CddaTrack, length, date.with_gmt_offset(attrs.gmt_offset))
      }
      EntryKind::Xa => {
        let meta = std::fs::metadata(src_path)
          .map_err(|_| Error::SourceMissing(src_path.to_path_buf()))?;
        let bytes =
          std::fs::read(src_path).map_err(|_| Error::SourceMissing(src_path.to_path_buf()))?;

        if bytes.len() >= 4 && &bytes[0..4] == b"RIFF" {
          return Err(Error::WavRejected(src_path.to_path_buf()));
        }

        let size = meta.len();
        let resolved_kind = if size % 2336 == 0 {
          EntryKind::Xa
        } else if size % 2048 == 0 {
          log::warn!(
            "{} is not a multiple of 2336 bytes, reclassifying as XaDataOnly",
            src_path.display()
          );
          EntryKind::XaDataOnly
        } else {
          return Err(Error::BadXaSize {
            path: src_path.to_path_buf(),
            size,
          });
        };

        let date = mtime_or_build_time(src_path, config).with_gmt_offset(attrs.gmt_offset);
        (resolved_kind, size as u32, date)
      }
      EntryKind::File | EntryKind::XaDataOnly => {
        let meta = std::fs::metadata(src_path)
          .map_err(|_| Error::SourceMissing(src_path.to_path_buf()))?;
        let date = mtime_or_build_time(src_path, config).with_gmt_offset(attrs.gmt_offset);
        (kind, meta.len() as u32, date)
      }
      EntryKind::Directory | EntryKind::Dummy => {
        unreachable!("add_file only handles non-directory, non-dummy entries")
      }
    };

    let idx = self.store.push(DirEntry {
      id: full_id,
      kind: resolved_kind,
      attrs,
      date,
      length,
      lba: if matches!(resolved_kind, EntryKind::CddaTrack) {
        DA_PLACEHOLDER
      } else {
        0
      },
      src_path: src_path.to_path_buf(),
      track_id,
      parent: Some(dir),
      children: Vec::new(),
      dir_entry_len: 0,
    });

    self.store.get_mut(dir).children.push(idx);

    Ok(idx)
  }

  /// Adds or returns an existing subdirectory `id` under `dir`.
  ///
  /// Returns `(subdir, already_existed)`.
  pub fn add_subdir(
    &mut self,
    dir: EntryIdx,
    id: &str,
    src_dir: Option<&Path>,
    attrs: Attributes,
    config: &Config,
  ) -> (EntryIdx, bool) {
    let full_id = id.to_ascii_uppercase();

    if let Some(&existing) = self
      .store
      .get(dir)
      .children
      .iter()
      .find(|&&c| self.store.get(c).is_directory() && self.store.get(c).id == full_id)
    {
      return (existing, true);
    }

    let date: IsoDate = match src_dir {
      Some(path) => mtime_or_build_time(path, config),
      None => {
        if !id.is_empty() {
          log::warn!(
            "subdirectory {:?} has no source directory; using build time",
            id
          );
        }
        config.build_time.into()
      }
    };
    let date = date.with_gmt_offset(attrs.gmt_offset);

    let idx = self.store.push(DirEntry {
      id: full_id,
      kind: EntryKind::Directory,
      attrs,
      date,
      length: 0,
      lba: 0,
      src_path: src_dir.map(Path::to_path_buf).unwrap_or_default(),
      track_id: None,
      parent: Some(dir),
      children: Vec::new(),
      dir_entry_len: 0,
    });

    self.store.get_mut(dir).children.push(idx);

    (idx, false)
  }

  /// Adds an unnamed zero-filled gap under `dir`.
  pub fn add_dummy(
    &mut self,
    dir: EntryIdx,
    sectors: u32,
    sector_size: u32,
    fixed_lba: u32,
    config: &Config,
  ) -> EntryIdx {
    let idx = self.store.push(DirEntry {
      id: String::new(),
      kind: EntryKind::Dummy,
      attrs: Attributes {
        fixed_lba,
        ..Attributes::default()
      },
      date: config.build_time.into(),
      length: sectors * sector_size,
      lba: 0,
      src_path: PathBuf::new(),
      track_id: None,
      parent: Some(dir),
      children: Vec::new(),
      dir_entry_len: 0,
    });

    self.store.get_mut(dir).children.push(idx);

    idx
  }

  /// Recomputes `dir_entry_len` for every directory in the tree, bottom-up.
  pub fn recompute_sizes(&mut self, config: &Config) {
    fn visit(store: &mut EntryStore, idx: EntryIdx, xa_enabled: bool) {
      let children: Vec<EntryIdx> = store.get(idx).children.clone();

      for &child in &children {
        if store.get(child).is_directory() {
          visit(store, child, xa_enabled);
        }
      }

      let mut total = 0u32;
      // self (".") and parent ("..") records.
      total = add_with_boundary(total, record_size(1, xa_enabled));
      total = add_with_boundary(total, record_size(1, xa_enabled));

      for &child in &children {
        if store.get(child).id.is_empty() {
          continue;
        }
        let id_len = store.get(child).id.len();
        total = add_with_boundary(total, record_size(id_len, xa_enabled));
      }

      store.get_mut(idx).dir_entry_len = round_to_even_sector(total.max(1));
    }

    visit(&mut self.store, self.root, !config.no_xa);
  }

  /// Stably sorts every directory's children depth-first.
  ///
  /// Priority: `order` field if `by_order`, else assigned `lba` if
  /// `by_lba`, else cleaned (version-suffix-stripped) identifier.
  pub fn sort_tree(&mut self, by_order: bool, by_lba: bool) {
    fn visit(store: &mut EntryStore, idx: EntryIdx, by_order: bool, by_lba: bool) {
      let mut children = store.get(idx).children.clone();

      children.sort_by(|&a, &b| {
        let ea = store.get(a);
        let eb = store.get(b);
        if by_order {
          ea.attrs.order.cmp(&eb.attrs.order)
        } else if by_lba {
          ea.lba.cmp(&eb.lba)
        } else {
          ea.cleaned_id().cmp(eb.cleaned_id())
        }
      });

      store.get_mut(idx).children = children.clone();

      for child in children {
        if store.get(child).is_directory() {
          visit(store, child, by_order, by_lba);
        }
      }
    }

    visit(&mut self.store, self.root, by_order, by_lba);
  }
}

fn mtime_or_build_time(path: &Path, config: &Config) -> IsoDate {
  std::fs::metadata(path)
    .and_then(|m| m.modified())
    .map(|t| chrono::DateTime::<chrono::Utc>::from(t).into())
    .unwrap_or_else(|_| {
      log::warn!(
        "could not read mtime of {}, using build time",
        path.display()
      );
      config.build_time.into()
    })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn cfg() -> Config {
    Config {
      new_type: true,
      ..Config::default()
    }
  }

  #[test]
  fn empty_directory_has_minimal_dir_entry_len() {
    let mut tree = DirTree::create_root(cfg().build_time.into(), false, &cfg());
    tree.recompute_sizes(&cfg());
    assert_eq!(tree.store().get(tree.root()).dir_entry_len, 2048);
  }

  #[test]
  fn legacy_year_mod_applies_to_root() {
    let c = Config {
      new_type: false,
      ..Config::default()
    };
    let date: IsoDate = c.build_time.into();
    let tree = DirTree::create_root(date, false, &c);
    assert!(tree.store().get(tree.root()).date.years_since_1900 < 100);
  }

  #[test]
  fn duplicate_file_rejected() {
    let c = cfg();
    let mut tree = DirTree::create_root(c.build_time.into(), false, &c);
    let root = tree.root();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.dat");
    std::fs::write(&path, b"hello").unwrap();

    tree
      .add_file(
        root,
        "A.DAT",
        EntryKind::File,
        &path,
        Attributes::default(),
        None,
        &c,
        None,
      )
      .unwrap();

    let err = tree
      .add_file(
        root,
        "a.dat",
        EntryKind::File,
        &path,
        Attributes::default(),
        None,
        &c,
        None,
      )
      .unwrap_err();

    assert!(matches!(err, Error::DuplicateEntry { .. }));
  }

  #[test]
  fn dummy_gap_is_excluded_from_dir_entry_len() {
    let c = cfg();
    let mut tree = DirTree::create_root(c.build_time.into(), false, &c);
    let root = tree.root();
    tree.recompute_sizes(&c);
    let without_dummy = tree.store().get(root).dir_entry_len;

    tree.add_dummy(root, 4, 2048, 0, &c);
    tree.recompute_sizes(&c);
    let with_dummy = tree.store().get(root).dir_entry_len;

    assert_eq!(without_dummy, with_dummy);
  }

  #[test]
  fn gmt_offset_is_applied_to_entry_date() {
    let c = cfg();
    let mut tree = DirTree::create_root(c.build_time.into(), false, &c);
    let root = tree.root();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.dat");
    std::fs::write(&path, b"hello").unwrap();

    let idx = tree
      .add_file(
        root,
        "A.DAT",
        EntryKind::File,
        &path,
        Attributes {
          gmt_offset: -20,
          ..Attributes::default()
        },
        None,
        &c,
        None,
      )
      .unwrap();

    assert_eq!(tree.store().get(idx).date.gmt_offset, -20);
  }

  #[test]
  fn subdir_merges_on_second_declaration() {
    let c = cfg();
    let mut tree = DirTree::create_root(c.build_time.into(), false, &c);
    let root = tree.root();
    let (a, existed1) = tree.add_subdir(root, "SUB", None, Attributes::default(), &c);
    let (b, existed2) = tree.add_subdir(root, "sub", None, Attributes::default(), &c);
    assert!(!existed1);
    assert!(existed2);
    assert_eq!(a, b);
  }
}
