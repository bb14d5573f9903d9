//! External collaborator contract for querying CD-DA (Red Book) audio track
//! length. The core never decodes audio itself.

use crate::error::{Error, Result};
use std::path::Path;

/// Supplies the PCM frame count (44.1 kHz, stereo) of an audio source.
pub trait RedbookProbe {
  fn probe(&self, src_path: &Path) -> Result<u64>;
}

/// Turns a frame count into a sector-aligned CD-DA byte length.
///
/// Each frame is 4 bytes (16-bit stereo); CD-DA sectors are 2352 bytes.
pub fn cdda_length_bytes(probe: &dyn RedbookProbe, src_path: &Path) -> Result<u32> {
  let frames = probe.probe(src_path)?;

  if frames == 0 {
    return Err(Error::AudioProbeFailed(src_path.to_path_buf()));
  }

  let pcm_bytes = frames * 4;
  let sectors = crate::pair::sectors(pcm_bytes as u32, 2352);

  Ok(sectors * 2352)
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::path::PathBuf;

  struct FixedProbe(u64);

  impl RedbookProbe for FixedProbe {
    fn probe(&self, _src_path: &Path) -> Result<u64> {
      Ok(self.0)
    }
  }

  #[test]
  fn ten_second_track_sizes_correctly() {
    let probe = FixedProbe(441_000);
    let len = cdda_length_bytes(&probe, &PathBuf::from("track.wav")).unwrap();
    assert_eq!(len, 750 * 2352);
  }

  #[test]
  fn zero_frames_is_an_error() {
    let probe = FixedProbe(0);
    assert!(matches!(
      cdda_length_bytes(&probe, &PathBuf::from("silence.wav")),
      Err(Error::AudioProbeFailed(_))
    ));
  }
}
