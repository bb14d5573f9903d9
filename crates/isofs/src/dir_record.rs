//! Serialises directory records, including the CD-XA attribute block.

use crate::config::Config;
use crate::entry::{DirEntry, EntryKind};
use crate::pair::{pair16, pair32, round_to_even};

/// Self (".") identifier byte.
const SELF_ID: &[u8] = &[0x01];
/// Parent ("..") identifier byte.
const PARENT_ID: &[u8] = &[0x00];

bitflags::bitflags! {
  /// `flags` byte of an ISO_DIR_ENTRY.
  #[derive(Debug, Clone, Copy)]
  pub struct DirRecordFlags: u8 {
    const HIDDEN = 1 << 0;
    const DIRECTORY = 1 << 1;
  }
}

fn entry_size(entry: &DirEntry) -> u32 {
  match entry.kind {
    EntryKind::Xa => 2048 * crate::pair::sectors(entry.length, 2336),
    EntryKind::XaDataOnly => 2048 * crate::pair::sectors(entry.length, 2048),
    EntryKind::CddaTrack => 2048 * crate::pair::sectors(entry.length, 2352),
    EntryKind::Directory => entry.dir_entry_len,
    EntryKind::File | EntryKind::Dummy => entry.length,
  }
}

fn xa_attribute_word(entry: &DirEntry) -> u16 {
  let perm = entry.attrs.xa_perm;

  match entry.kind {
    EntryKind::File | EntryKind::XaDataOnly | EntryKind::Dummy => perm | 0x0800,
    EntryKind::CddaTrack => perm | 0x4000,
    EntryKind::Directory => perm | 0x8800,
    EntryKind::Xa => {
      perm
        | if entry.attrs.xa_attrib != 0xFF {
          (entry.attrs.xa_attrib as u16) << 8
        } else {
          0x3800
        }
    }
  }
}

fn xa_filenum(entry: &DirEntry) -> u8 {
  if !matches!(entry.kind, EntryKind::Xa) {
    return 0;
  }

  std::fs::read(&entry.src_path)
    .ok()
    .and_then(|b| b.first().copied())
    .unwrap_or(1)
    .max(1)
}

/// Writes a 14-byte CD-XA attribute block.
fn write_xa_block(out: &mut Vec<u8>, entry: &DirEntry) {
  out.extend_from_slice(&entry.attrs.gid.to_be_bytes());
  out.extend_from_slice(&entry.attrs.uid.to_be_bytes());
  out.extend_from_slice(&xa_attribute_word(entry).to_be_bytes());
  out.extend_from_slice(b"XA");
  out.push(xa_filenum(entry));
  out.extend_from_slice(&[0u8; 5]);
}

/// Serialises one directory record (ISO_DIR_ENTRY, optionally followed by
/// the XA block) for `entry`, using `id_override` for the identifier bytes
/// (used for the self/parent "." and ".." pseudo-entries).
pub fn build_record(entry: &DirEntry, id_override: Option<&[u8]>, config: &Config) -> Vec<u8> {
  let identifier: &[u8] = id_override.unwrap_or(entry.id.as_bytes());
  let id_len = identifier.len() as u8;

  let mut flags = DirRecordFlags::empty();
  if entry.is_directory() {
    flags |= DirRecordFlags::DIRECTORY;
  }
  if entry.attrs.hidden {
    flags |= DirRecordFlags::HIDDEN;
  }
  let flags = flags.bits();

  let xa_enabled = !config.no_xa;
  let fixed_len = 33u32 + id_len as u32;
  let padded_len = round_to_even(fixed_len);
  let total_len = padded_len + if xa_enabled { 14 } else { 0 };

  let mut out = Vec::with_capacity(total_len as usize);

  out.push(total_len as u8); // entry_length
  out.push(0); // ext_attr_length
  out.extend_from_slice(&pair32(entry.lba));
  out.extend_from_slice(&pair32(entry_size(entry)));
  out.extend_from_slice(&entry.date.to_bytes());
  out.push(flags);
  out.push(0); // file_unit_size (interleave not used)
  out.push(0); // interleave_gap_size
  out.extend_from_slice(&pair16(1)); // vol_seq_num
  out.push(id_len);
  out.extend_from_slice(identifier);

  if identifier.len() % 2 == 1 {
    out.push(0);
  }

  if xa_enabled {
    write_xa_block(&mut out, entry);
  }

  debug_assert_eq!(out.len() as u32, total_len);

  out
}

/// Builds the "." pseudo-record for `dir` (self).
pub fn build_self_record(dir: &DirEntry, config: &Config) -> Vec<u8> {
  build_record(dir, Some(SELF_ID), config)
}

/// Builds the ".." pseudo-record, using the parent directory's own record
/// fields (lba / size) but identifying as "..".
pub fn build_parent_record(parent: &DirEntry, config: &Config) -> Vec<u8> {
  build_record(parent, Some(PARENT_ID), config)
}
