//! Two-pass LBA layout assignment.

use crate::entry::{EntryIdx, EntryKind, DA_PLACEHOLDER};
use crate::pair::sectors;
use crate::tree::DirTree;

/// Assigns an LBA to every entry in `tree`, honoring per-entry `fixed_lba`
/// overrides, and returns the total image length in sectors.
///
/// Entries with `fixed_lba != 0` occupy that LBA without advancing the
/// layout cursor; the cursor still accounts for a fixed-LBA directory's
/// subtree body, matching the original mastering tool's behavior (see
/// the fixed-LBA recursion note in DESIGN.md).
pub struct LayoutPlanner;

impl LayoutPlanner {
  pub fn assign(tree: &mut DirTree, start_cursor: u32) -> u32 {
    Self::assign_dir(tree, tree.root(), start_cursor)
  }

  fn assign_dir(tree: &mut DirTree, dir: EntryIdx, cursor: u32) -> u32 {
    let mut cursor = cursor;
    let mut max_fixed: u32 = 0;
    let mut max_fixed_tail: u32 = 0;
    let mut has_fixed = false;

    let children = tree.store().get(dir).children.clone();

    for child in children {
      let fixed_lba = tree.store().get(child).attrs.fixed_lba;
      let kind = tree.store().get(child).kind;

      let assigned_lba = if fixed_lba != 0 { fixed_lba } else { cursor };
      tree.store_mut().get_mut(child).lba = assigned_lba;

      let advance = match kind {
        EntryKind::Directory => {
          let body_sectors = sectors(tree.store().get(child).dir_entry_len, 2048);
          let next = Self::assign_dir(tree, child, assigned_lba + body_sectors);
          next - assigned_lba
        }
        EntryKind::File | EntryKind::XaDataOnly | EntryKind::Dummy => {
          sectors(tree.store().get(child).length, 2048)
        }
        EntryKind::Xa => sectors(tree.store().get(child).length, 2336),
        EntryKind::CddaTrack => {
          tree.store_mut().get_mut(child).lba = DA_PLACEHOLDER;
          0
        }
      };

      if fixed_lba != 0 {
        has_fixed = true;
        if fixed_lba > max_fixed {
          max_fixed = fixed_lba;
          max_fixed_tail = fixed_lba + advance;
        }
      } else {
        cursor = assigned_lba + advance;
      }
    }

    if has_fixed {
      max_fixed_tail.max(cursor)
    } else {
      cursor
    }
  }
}
