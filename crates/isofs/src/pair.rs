//! Both-endian field encoding used throughout ISO 9660 structures, and the
//! 7-byte directory-record date stamp.

use byteorder::{BigEndian, LittleEndian, WriteBytesExt};

/// `[little-endian u16][big-endian u16]`.
pub fn pair16(v: u16) -> [u8; 4] {
  let mut out = [0u8; 4];
  (&mut out[0..2]).write_u16::<LittleEndian>(v).unwrap();
  (&mut out[2..4]).write_u16::<BigEndian>(v).unwrap();
  out
}

/// `[little-endian u32][big-endian u32]`.
pub fn pair32(v: u32) -> [u8; 8] {
  let mut out = [0u8; 8];
  (&mut out[0..4]).write_u32::<LittleEndian>(v).unwrap();
  (&mut out[4..8]).write_u32::<BigEndian>(v).unwrap();
  out
}

/// 7-byte directory-record recording date: `year-1900, month, day, hour,
/// minute, second, gmt_offset` (signed 15-minute units).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IsoDate {
  pub years_since_1900: u8,
  pub month: u8,
  pub day: u8,
  pub hour: u8,
  pub minute: u8,
  pub second: u8,
  pub gmt_offset: i8,
}

impl IsoDate {
  pub fn to_bytes(self) -> [u8; 7] {
    [
      self.years_since_1900,
      self.month,
      self.day,
      self.hour,
      self.minute,
      self.second,
      self.gmt_offset as u8,
    ]
  }

  /// Folds the year modulo 100, reproducing the overflow legacy mastering
  /// tools exhibit when the "new type" flag is unset.
  pub fn with_legacy_year_mod(mut self) -> Self {
    self.years_since_1900 %= 100;
    self
  }

  /// Applies a per-entry signed 15-minute GMT offset.
  pub fn with_gmt_offset(mut self, gmt_offset: i8) -> Self {
    self.gmt_offset = gmt_offset;
    self
  }
}

impl<Tz: chrono::TimeZone> From<chrono::DateTime<Tz>> for IsoDate {
  fn from(dt: chrono::DateTime<Tz>) -> Self {
    use chrono::{Datelike, Timelike};

    Self {
      years_since_1900: (dt.year().max(1900) - 1900) as u8,
      month: dt.month() as u8,
      day: dt.day() as u8,
      hour: dt.hour() as u8,
      minute: dt.minute() as u8,
      second: dt.second() as u8,
      gmt_offset: 0,
    }
  }
}

/// Rounds `v` up to the nearest even number.
pub fn round_to_even(v: u32) -> u32 {
  v + (v & 1)
}

/// Number of `sector_size`-byte sectors needed to hold `len` bytes.
pub fn sectors(len: u32, sector_size: u32) -> u32 {
  (len + sector_size - 1) / sector_size
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn pair16_halves_agree_byteswapped() {
    let p = pair16(0x1234);
    assert_eq!(&p[0..2], &[0x34, 0x12]);
    assert_eq!(&p[2..4], &[0x12, 0x34]);
  }

  #[test]
  fn pair32_halves_agree_byteswapped() {
    let p = pair32(0xDEAD_BEEF);
    assert_eq!(&p[0..4], &[0xEF, 0xBE, 0xAD, 0xDE]);
    assert_eq!(&p[4..8], &[0xDE, 0xAD, 0xBE, 0xEF]);
  }

  #[test]
  fn round_to_even_rounds_odd_up() {
    assert_eq!(round_to_even(33), 34);
    assert_eq!(round_to_even(34), 34);
  }

  #[test]
  fn sectors_rounds_up() {
    assert_eq!(sectors(1, 2048), 1);
    assert_eq!(sectors(2048, 2048), 1);
    assert_eq!(sectors(2049, 2048), 2);
  }

  #[test]
  fn legacy_year_mod_folds() {
    let d = IsoDate {
      years_since_1900: 130,
      month: 1,
      day: 1,
      hour: 0,
      minute: 0,
      second: 0,
      gmt_offset: 0,
    }
    .with_legacy_year_mod();
    assert_eq!(d.years_since_1900, 30);
  }
}
