use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),
  #[error("source path does not exist or could not be read: {0}")]
  SourceMissing(PathBuf),
  #[error("XA source looks like a RIFF/WAV file, which is not a valid XA stream: {0}")]
  WavRejected(PathBuf),
  #[error("XA source size ({size}) is not a multiple of 2336 or 2048 bytes: {path}")]
  BadXaSize { path: PathBuf, size: u64 },
  #[error("duplicate entry {id:?} in directory")]
  DuplicateEntry { id: String },
  #[error("CD-DA track {id:?} requires a track_id")]
  MissingTrackId { id: String },
  #[error("audio probe reported zero PCM frames for {0}")]
  AudioProbeFailed(PathBuf),
  #[error("directory record for {id:?} would exceed one sector (2048 bytes)")]
  SectorOverflow { id: String },
  #[error("walkdir error: {0}")]
  WalkDir(#[from] walkdir::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
