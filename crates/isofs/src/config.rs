//! Emission-wide flags, carried as an immutable value instead of process globals.

/// Flags that affect mastering output but never change once layout begins.
///
/// Constructed once by the caller and threaded by reference through the tree,
/// planner and emitters.
#[derive(Debug, Clone)]
pub struct Config {
  /// Disable CD-XA attribute blocks on directory records.
  pub no_xa: bool,
  /// Use the post-2003 mastering type. When false, the root directory's
  /// recording year is folded modulo 100 to mimic legacy mastering tools.
  pub new_type: bool,
  /// Suppress informational logging (warnings and errors still fire).
  pub quiet: bool,
  /// Timestamp used for any entry whose source mtime can't be read.
  pub build_time: chrono::DateTime<chrono::Utc>,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      no_xa: false,
      new_type: true,
      quiet: false,
      build_time: chrono::Utc::now(),
    }
  }
}
