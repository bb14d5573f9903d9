//! BFS path-table construction: Type L (little-endian) and Type M
//! (big-endian) tables, each listing every directory in the tree.

use crate::entry::{EntryIdx, EntryKind};
use crate::tree::DirTree;
use std::collections::VecDeque;

struct Record {
  id: Vec<u8>,
  lba: u32,
  parent_index: u16,
}

pub struct PathTableBuilder {
  records: Vec<Record>,
}

impl PathTableBuilder {
  /// Breadth-first traversal assigning 1-based directory indices, root
  /// first.
  pub fn build(tree: &DirTree) -> Self {
    let mut records = vec![Record {
      id: Vec::new(),
      lba: tree.store().get(tree.root()).lba,
      parent_index: 1,
    }];

    let mut queue: VecDeque<(EntryIdx, u16)> = VecDeque::new();
    queue.push_back((tree.root(), 1));

    while let Some((dir, dir_index)) = queue.pop_front() {
      for &child in &tree.store().get(dir).children {
        if tree.store().get(child).kind == EntryKind::Directory {
          let entry = tree.store().get(child);
          records.push(Record {
            id: entry.id.as_bytes().to_vec(),
            lba: entry.lba,
            parent_index: dir_index,
          });
          let child_index = records.len() as u16;
          queue.push_back((child, child_index));
        }
      }
    }

    Self { records }
  }

  /// Total byte length of one table (L and M are the same size).
  pub fn table_len(&self) -> u32 {
    self
      .records
      .iter()
      .map(|r| Self::record_len(r) as u32)
      .sum()
  }

  fn record_len(r: &Record) -> usize {
    let id_len = r.id.len().max(1);
    8 + id_len + (id_len % 2)
  }

  pub fn write_l_table(&self) -> Vec<u8> {
    self.write(Endian::Little)
  }

  pub fn write_m_table(&self) -> Vec<u8> {
    self.write(Endian::Big)
  }

  fn write(&self, endian: Endian) -> Vec<u8> {
    let mut out = Vec::with_capacity(self.table_len() as usize);

    for r in &self.records {
      let id_len = r.id.len().max(1);
      out.push(id_len as u8);
      out.push(0); // ext attr length

      match endian {
        Endian::Little => {
          out.extend_from_slice(&r.lba.to_le_bytes());
          out.extend_from_slice(&r.parent_index.to_le_bytes());
        }
        Endian::Big => {
          out.extend_from_slice(&r.lba.to_be_bytes());
          out.extend_from_slice(&r.parent_index.to_be_bytes());
        }
      }

      if r.id.is_empty() {
        out.push(0);
      } else {
        out.extend_from_slice(&r.id);
      }

      if id_len % 2 == 1 {
        out.push(0);
      }
    }

    out
  }
}

enum Endian {
  Little,
  Big,
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Config;
  use crate::entry::Attributes;

  #[test]
  fn l_and_m_tables_are_byteswapped() {
    let config = Config::default();
    let mut tree = DirTree::create_root(config.build_time.into(), false, &config);
    let root = tree.root();
    tree.add_subdir(root, "SUB", None, Attributes::default(), &config);
    tree.recompute_sizes(&config);
    crate::planner::LayoutPlanner::assign(&mut tree, 23);

    let table = PathTableBuilder::build(&tree);
    let l = table.write_l_table();
    let m = table.write_m_table();

    assert_eq!(l.len(), m.len());
    // lba field (bytes 2..6) should be byte-swapped between tables.
    assert_eq!(&l[2..6], &m[2..6].iter().rev().cloned().collect::<Vec<_>>()[..]);
  }

  #[test]
  fn root_entry_is_first() {
    let config = Config::default();
    let mut tree = DirTree::create_root(config.build_time.into(), false, &config);
    tree.recompute_sizes(&config);
    let table = PathTableBuilder::build(&tree);
    assert_eq!(table.records.len(), 1);
  }
}
