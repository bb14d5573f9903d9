//! A plain pass-through [`isofs::sector::SectorWriter`] that writes raw
//! sector bytes with no EDC/ECC or scrambling. Production mastering needs
//! a real CD sector codec (out of scope for this crate); this exists so
//! the CLI produces a runnable `.bin` for inspection and testing.

use isofs::error::Result;
use isofs::sector::{EdcEcc, SectorView, SectorWriter, SubheaderVariant};
use std::io::{Read, Seek, SeekFrom, Write};

pub struct PlainSectorWriter<W> {
  inner: W,
}

impl<W: Write + Seek> PlainSectorWriter<W> {
  pub fn new(inner: W) -> Self {
    Self { inner }
  }
}

struct PlainSectorView<'a, W> {
  inner: &'a mut W,
  sector_size: u64,
  cursor: u64,
}

impl<'a, W: Write + Seek> SectorView for PlainSectorView<'a, W> {
  fn space_in_current_sector(&self) -> usize {
    let sector_start = (self.cursor / self.sector_size) * self.sector_size;
    (sector_start + self.sector_size - self.cursor) as usize
  }

  fn next_sector(&mut self) -> Result<()> {
    self.cursor = ((self.cursor / self.sector_size) + 1) * self.sector_size;
    Ok(())
  }

  fn write_memory(&mut self, bytes: &[u8]) -> Result<()> {
    if bytes.len() > self.space_in_current_sector() {
      self.next_sector()?;
    }

    self.inner.seek(SeekFrom::Start(self.cursor))?;
    self.inner.write_all(bytes)?;
    self.cursor += bytes.len() as u64;

    Ok(())
  }

  fn write_file(&mut self, source: &mut dyn Read) -> Result<()> {
    self.inner.seek(SeekFrom::Start(self.cursor))?;
    let written = std::io::copy(source, &mut self.inner)?;
    self.cursor += written;
    Ok(())
  }

  fn write_blank_sectors(&mut self, n: u32, _submode: u8, _ecc_addr: bool) -> Result<()> {
    let zeros = vec![0u8; self.sector_size as usize];
    for _ in 0..n {
      self.inner.seek(SeekFrom::Start(self.cursor))?;
      self.inner.write_all(&zeros)?;
      self.cursor += self.sector_size;
    }
    Ok(())
  }

  fn set_subheader(&mut self, _variant: SubheaderVariant) {}
}

impl<W: Write + Seek> SectorWriter for PlainSectorWriter<W> {
  fn view_m2f1<'a>(
    &'a mut self,
    start_lba: u32,
    _count: u32,
    _edc_ecc: EdcEcc,
  ) -> Box<dyn SectorView + 'a> {
    let sector_size = 2048u64;
    let start = start_lba as u64 * sector_size;
    Box::new(PlainSectorView {
      inner: &mut self.inner,
      sector_size,
      cursor: start,
    })
  }

  fn view_m2f2<'a>(
    &'a mut self,
    start_lba: u32,
    _count: u32,
    _edc_ecc: EdcEcc,
  ) -> Box<dyn SectorView + 'a> {
    let sector_size = 2336u64;
    let start = start_lba as u64 * sector_size;
    Box::new(PlainSectorView {
      inner: &mut self.inner,
      sector_size,
      cursor: start,
    })
  }
}
