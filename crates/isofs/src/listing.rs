//! Optional human/machine-readable listings of the finished layout: a C
//! header of `#define LBA_...` constants, and a column-formatted LBA table.

use crate::entry::{DirEntry, EntryIdx, EntryKind};
use crate::pair::sectors;
use crate::tree::DirTree;
use std::fmt::Write as _;

fn clean_define_name(id: &str) -> String {
  let trimmed = id.split(';').next().unwrap_or(id);
  trimmed
    .chars()
    .map(|c| match c {
      '.' | ' ' | '-' => '_',
      c => c.to_ascii_uppercase(),
    })
    .collect()
}

/// Recursively emits `#define LBA_<CLEAN_ID> <lba>` for every non-directory
/// named entry, wrapped in an include guard at the top level.
pub fn write_header_listing(tree: &DirTree) -> String {
  let mut out = String::new();
  out.push_str("#ifndef _ISO_FILES\n#define _ISO_FILES\n\n");
  emit_header(tree, tree.root(), &mut out);
  out.push('\n');
  out
}

fn emit_header(tree: &DirTree, dir: EntryIdx, out: &mut String) {
  for &child in &tree.store().get(dir).children {
    let entry = tree.store().get(child);
    if !entry.is_directory() {
      writeln!(out, "#define LBA_{} {}", clean_define_name(&entry.id), entry.lba).unwrap();
    }
  }
  for &child in &tree.store().get(dir).children {
    if tree.store().get(child).is_directory() {
      emit_header(tree, child, out);
    }
  }
}

fn kind_label(kind: EntryKind) -> &'static str {
  match kind {
    EntryKind::File => "file",
    EntryKind::Xa => "xa",
    EntryKind::XaDataOnly => "str",
    EntryKind::CddaTrack => "cdda",
    EntryKind::Directory => "dir",
    EntryKind::Dummy => "dummy",
  }
}

fn sector_len(entry: &DirEntry) -> u32 {
  match entry.kind {
    EntryKind::Xa => sectors(entry.length, 2336),
    EntryKind::CddaTrack => sectors(entry.length, 2352),
    _ => sectors(entry.length, 2048),
  }
}

fn msf(lba: u32) -> String {
  let frames = 150 + lba;
  let ff = frames % 75;
  let total_seconds = frames / 75;
  let ss = total_seconds % 60;
  let mm = total_seconds / 60;
  format!("{:02}:{:02}:{:02}", mm, ss, ff)
}

/// Recursively emits a `type | name | sectors | lba | timecode | size |
/// source` row per entry.
pub fn write_lba_listing(tree: &DirTree) -> String {
  let mut out = String::new();
  writeln!(
    out,
    "{:<6} {:<32} {:>8} {:>8} {:>11} {:>10} {}",
    "type", "name", "sectors", "lba", "timecode", "size", "source"
  )
  .unwrap();
  emit_lba_rows(tree, tree.root(), &mut out);
  out
}

fn emit_lba_rows(tree: &DirTree, dir: EntryIdx, out: &mut String) {
  for &child in &tree.store().get(dir).children {
    let entry = tree.store().get(child);

    if entry.is_directory() {
      continue;
    }

    writeln!(
      out,
      "{:<6} {:<32} {:>8} {:>8} {:>11} {:>10} {}",
      kind_label(entry.kind),
      entry.id,
      sector_len(entry),
      entry.lba,
      msf(entry.lba),
      entry.length,
      entry.src_path.display()
    )
    .unwrap();
  }

  for &child in &tree.store().get(dir).children {
    if tree.store().get(child).is_directory() {
      let entry = tree.store().get(child);
      writeln!(
        out,
        "{:<6} {:<32} {:>8} {:>8} {:>11} {:>10} {}",
        "dir",
        entry.id,
        sector_len(entry),
        entry.lba,
        msf(entry.lba),
        entry.length,
        entry.src_path.display()
      )
      .unwrap();

      emit_lba_rows(tree, child, out);
      writeln!(out, "End").unwrap();
    }
  }
}
