//! Assembles the complete image: license data, Primary Volume Descriptor,
//! terminator, path tables, directory records, and file payloads.

use crate::config::Config;
use crate::dir_record::{build_parent_record, build_record, build_self_record};
use crate::entry::{EntryIdx, EntryKind};
use crate::error::Result;
use crate::pair::{pair16, pair32, sectors};
use crate::path_table::PathTableBuilder;
use crate::planner::LayoutPlanner;
use crate::sector::{EdcEcc, SectorWriter};
use crate::tree::DirTree;

/// Textual identifiers for the Primary Volume Descriptor. Values longer
/// than their field width are truncated; shorter values are space-padded.
#[derive(Debug, Clone)]
pub struct VolumeIdentifiers {
  pub system_id: String,
  pub volume_id: String,
  pub volume_set_id: String,
  pub publisher_id: String,
  pub data_preparer_id: String,
  pub application_id: String,
  pub copyright_file_id: String,
  pub abstract_file_id: String,
  pub bibliographic_file_id: String,
  pub creation_date: String,
  pub modification_date: String,
}

impl Default for VolumeIdentifiers {
  fn default() -> Self {
    Self {
      system_id: String::new(),
      volume_id: String::new(),
      volume_set_id: String::new(),
      publisher_id: String::new(),
      data_preparer_id: String::new(),
      application_id: String::new(),
      copyright_file_id: String::new(),
      abstract_file_id: String::new(),
      bibliographic_file_id: String::new(),
      creation_date: "0000000000000000".to_string(),
      modification_date: "0000000000000000".to_string(),
    }
  }
}

fn pad_upper(s: &str, width: usize) -> Vec<u8> {
  let upper = s.to_ascii_uppercase();
  let mut bytes = upper.into_bytes();
  bytes.truncate(width);
  bytes.resize(width, b' ');
  bytes
}

fn pad_date(s: &str) -> [u8; 17] {
  let mut out = [b'0'; 17];
  out[16] = 0;
  let bytes = s.as_bytes();
  let n = bytes.len().min(16);
  out[..n].copy_from_slice(&bytes[..n]);
  out
}

pub struct VolumeWriter;

impl VolumeWriter {
  /// Assembles the whole image, returning the total length in sectors.
  ///
  /// `license_data` must be exactly `12 * 2336` bytes if present (the
  /// license area occupies LBA 0..12, Mode 2 Form 2).
  pub fn emit(
    tree: &mut DirTree,
    ids: &VolumeIdentifiers,
    license_data: Option<&[u8]>,
    config: &Config,
    writer: &mut dyn SectorWriter,
  ) -> Result<u32> {
    tree.recompute_sizes(config);

    // 1. License area + gap: LBA 0..16.
    if let Some(data) = license_data {
      let mut view = writer.view_m2f2(0, 12, EdcEcc::Form2);
      view.write_memory(data)?;
    }

    let descriptor_count: u32 = if config.new_type { 2 } else { 3 };

    // 2. Size the path table without real LBAs to learn where the root
    //    directory body starts.
    let placeholder_table = PathTableBuilder::build(tree);
    let path_table_sectors = sectors(placeholder_table.table_len(), 2048);

    let root_lba = 16 + descriptor_count + 4 * path_table_sectors;

    let root = tree.root();
    tree.store_mut().get_mut(root).lba = root_lba;

    let root_body_sectors = sectors(tree.store().get(root).dir_entry_len, 2048);
    let total_sectors = LayoutPlanner::assign(tree, root_lba + root_body_sectors);

    // 3. Now that every directory has its real LBA, rebuild the path
    //    table with the real values.
    let path_table = PathTableBuilder::build(tree);
    let path_table_l_lba = 16 + descriptor_count;
    let path_table_m_lba = path_table_l_lba + 2 * path_table_sectors;

    Self::write_descriptors(
      writer,
      ids,
      config,
      tree,
      path_table.table_len(),
      path_table_l_lba,
      path_table_m_lba,
      total_sectors,
    )?;

    Self::write_path_tables(writer, &path_table, path_table_sectors, path_table_l_lba, path_table_m_lba)?;

    Self::write_directory_tree(writer, tree, tree.root(), config)?;
    Self::write_payloads(writer, tree, tree.root(), config)?;

    Ok(total_sectors)
  }

  fn write_descriptors(
    writer: &mut dyn SectorWriter,
    ids: &VolumeIdentifiers,
    config: &Config,
    tree: &DirTree,
    path_table_len: u32,
    path_table_l_lba: u32,
    path_table_m_lba: u32,
    total_sectors: u32,
  ) -> Result<()> {
    let mut pvd = [0u8; 2048];

    pvd[0] = 1; // Primary Volume Descriptor
    pvd[1..6].copy_from_slice(b"CD001");
    pvd[6] = 1; // version

    pvd[8..40].copy_from_slice(&pad_upper(&ids.system_id, 32));
    pvd[40..72].copy_from_slice(&pad_upper(&ids.volume_id, 32));

    pvd[80..88].copy_from_slice(&pair32(total_sectors));

    pvd[120..124].copy_from_slice(&pair16(1)); // volume_set_size
    pvd[124..128].copy_from_slice(&pair16(1)); // volume_sequence_number
    pvd[128..132].copy_from_slice(&pair16(2048)); // logical_block_size

    pvd[132..140].copy_from_slice(&pair32(path_table_len));
    pvd[140..144].copy_from_slice(&path_table_l_lba.to_le_bytes());
    pvd[144..148].copy_from_slice(&path_table_l_lba.to_le_bytes());
    pvd[148..152].copy_from_slice(&path_table_m_lba.to_be_bytes());
    pvd[152..156].copy_from_slice(&path_table_m_lba.to_be_bytes());

    // The root directory record embedded in the PVD is always the fixed
    // 34-byte form; the XA attribute block only appears on the on-disc
    // copy within the root directory's own extent.
    let root = tree.store().get(tree.root());
    let pvd_config = Config {
      no_xa: true,
      ..config.clone()
    };
    let root_record = build_record(root, Some(&[0u8]), &pvd_config);
    pvd[156..156 + root_record.len()].copy_from_slice(&root_record);

    pvd[190..318].copy_from_slice(&pad_upper(&ids.volume_set_id, 128));
    pvd[318..446].copy_from_slice(&pad_upper(&ids.publisher_id, 128));
    pvd[446..574].copy_from_slice(&pad_upper(&ids.data_preparer_id, 128));
    pvd[574..702].copy_from_slice(&pad_upper(&ids.application_id, 128));
    pvd[702..739].copy_from_slice(&pad_upper(&ids.copyright_file_id, 37));
    pvd[739..776].copy_from_slice(&pad_upper(&ids.abstract_file_id, 37));
    pvd[776..813].copy_from_slice(&pad_upper(&ids.bibliographic_file_id, 37));

    pvd[813..830].copy_from_slice(&pad_date(&ids.creation_date));
    pvd[830..847].copy_from_slice(&pad_date(&ids.modification_date));
    pvd[847..864].copy_from_slice(&pad_date("0000000000000000"));
    pvd[864..881].copy_from_slice(&pad_date("0000000000000000"));

    pvd[881] = 1; // file structure version

    if !config.no_xa {
      pvd[883 + 141..883 + 149].copy_from_slice(b"CD-XA001");
    }

    let mut view = writer.view_m2f1(16, 1, EdcEcc::Form1);
    view.write_memory(&pvd)?;

    let mut terminator = [0u8; 2048];
    terminator[0] = 255;
    terminator[1..6].copy_from_slice(b"CD001");
    terminator[6] = 1;

    let mut view = writer.view_m2f1(17, 1, EdcEcc::Form1);
    view.write_memory(&terminator)?;

    Ok(())
  }

  fn write_path_tables(
    writer: &mut dyn SectorWriter,
    table: &PathTableBuilder,
    path_table_sectors: u32,
    l_lba: u32,
    m_lba: u32,
  ) -> Result<()> {
    let l_bytes = table.write_l_table();
    let m_bytes = table.write_m_table();

    for offset in [0u32, path_table_sectors] {
      let mut view = writer.view_m2f1(l_lba + offset, path_table_sectors, EdcEcc::Form1);
      view.write_memory(&l_bytes)?;
    }

    for offset in [0u32, path_table_sectors] {
      let mut view = writer.view_m2f1(m_lba + offset, path_table_sectors, EdcEcc::Form1);
      view.write_memory(&m_bytes)?;
    }

    Ok(())
  }

  fn write_directory_tree(
    writer: &mut dyn SectorWriter,
    tree: &DirTree,
    dir: EntryIdx,
    config: &Config,
  ) -> Result<()> {
    let entry = tree.store().get(dir);
    let lba = entry.lba;
    let body_sectors = sectors(entry.dir_entry_len, 2048);

    let mut view = writer.view_m2f1(lba, body_sectors, EdcEcc::Form1);

    view.write_memory(&build_self_record(entry, config))?;

    let parent = entry.parent.map(|p| tree.store().get(p)).unwrap_or(entry);
    view.write_memory(&build_parent_record(parent, config))?;

    for &child in &entry.children {
      let child_entry = tree.store().get(child);

      if child_entry.id.is_empty() {
        continue;
      }

      if matches!(child_entry.kind, EntryKind::CddaTrack)
        && child_entry.lba == crate::entry::DA_PLACEHOLDER
      {
        log::warn!(
          "directory record for {:?} still carries the CD-DA placeholder LBA",
          child_entry.id
        );
      }

      let record = build_record(child_entry, None, config);
      if record.len() > 2048 {
        return Err(crate::error::Error::SectorOverflow {
          id: child_entry.id.clone(),
        });
      }
      view.write_memory(&record)?;
    }

    for &child in &entry.children {
      if tree.store().get(child).is_directory() {
        Self::write_directory_tree(writer, tree, child, config)?;
      }
    }

    Ok(())
  }

  fn write_payloads(
    writer: &mut dyn SectorWriter,
    tree: &DirTree,
    dir: EntryIdx,
    config: &Config,
  ) -> Result<()> {
    let entry = tree.store().get(dir);

    for &child in &entry.children {
      let child_entry = tree.store().get(child);

      match child_entry.kind {
        EntryKind::Directory => Self::write_payloads(writer, tree, child, config)?,
        EntryKind::CddaTrack => {
          // Out-of-band audio track; no ISO-filesystem sectors to write.
        }
        EntryKind::Dummy => {
          let count = sectors(child_entry.length, 2048);
          let mut view = writer.view_m2f1(child_entry.lba, count, EdcEcc::Form1);
          view.write_blank_sectors(count, 0, false)?;
        }
        EntryKind::Xa => {
          let count = sectors(child_entry.length, 2336);
          let mut view = writer.view_m2f2(child_entry.lba, count, EdcEcc::Autodetect);
          let mut file = std::fs::File::open(&child_entry.src_path)?;
          view.write_file(&mut file)?;
        }
        EntryKind::File | EntryKind::XaDataOnly => {
          let count = sectors(child_entry.length, 2048);
          let mut view = writer.view_m2f1(child_entry.lba, count, EdcEcc::Form1);
          let mut file = std::fs::File::open(&child_entry.src_path)?;
          view.write_file(&mut file)?;
        }
      }
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::entry::Attributes;
  use crate::sector::testing::MemorySectorWriter;

  #[test]
  fn emits_an_empty_disc() {
    let config = Config {
      new_type: true,
      ..Config::default()
    };
    let mut tree = DirTree::create_root(config.build_time.into(), false, &config);
    let mut writer = MemorySectorWriter::new(64, 2048);

    let total = VolumeWriter::emit(
      &mut tree,
      &VolumeIdentifiers::default(),
      None,
      &config,
      &mut writer,
    )
    .unwrap();

    assert_eq!(total, 23);
  }

  #[test]
  fn single_file_is_placed_after_header() {
    let config = Config::default();
    let mut tree = DirTree::create_root(config.build_time.into(), false, &config);
    let root = tree.root();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hello.bin");
    std::fs::write(&path, vec![0u8; 3000]).unwrap();

    tree
      .add_file(
        root,
        "HELLO.BIN;1",
        EntryKind::File,
        &path,
        Attributes::default(),
        None,
        &config,
        None,
      )
      .unwrap();

    let mut writer = MemorySectorWriter::new(64, 2048);
    VolumeWriter::emit(
      &mut tree,
      &VolumeIdentifiers::default(),
      None,
      &config,
      &mut writer,
    )
    .unwrap();

    let children = tree.store().get(root).children.clone();
    let file_entry = tree.store().get(children[0]);
    assert_eq!(file_entry.lba, 23);
  }

  #[test]
  fn dummy_gap_does_not_get_a_directory_record() {
    let config = Config::default();
    let mut tree = DirTree::create_root(config.build_time.into(), false, &config);
    let root = tree.root();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hello.bin");
    std::fs::write(&path, vec![0u8; 3000]).unwrap();

    tree.add_dummy(root, 4, 2048, 0, &config);
    tree
      .add_file(
        root,
        "HELLO.BIN;1",
        EntryKind::File,
        &path,
        Attributes::default(),
        None,
        &config,
        None,
      )
      .unwrap();

    let mut writer = MemorySectorWriter::new(64, 2048);
    VolumeWriter::emit(
      &mut tree,
      &VolumeIdentifiers::default(),
      None,
      &config,
      &mut writer,
    )
    .unwrap();
  }
}
