//! File-based locking for fixture generation.
//!
//! One lock file per generator key under `{work_dir}/fixtures/.locks/`. The
//! lock is held for the whole copy/render/swap sequence so two generations of
//! the same key never interleave; different keys never contend.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Written into the lock file so a waiting generator can name the holder.
#[derive(Debug, Serialize, Deserialize)]
struct LockMetadata {
  pid: u32,
  started_at_unix: u64,
  key: String,
}

#[derive(Debug, Error)]
pub enum FixtureLockError {
  #[error("fixture {key} is being generated by PID {pid} (lock file {lock_path})")]
  Contention { key: String, pid: u32, lock_path: PathBuf },

  #[error("fixture lock {lock_path} is held by another process")]
  ContentionUnknown { lock_path: PathBuf },

  #[error("failed to create lock directory: {0}")]
  CreateDir(#[source] io::Error),

  #[error("failed to open lock file: {0}")]
  OpenFile(#[source] io::Error),

  #[error("failed to write lock metadata: {0}")]
  WriteMetadata(#[source] io::Error),

  #[error("failed to acquire lock: {0}")]
  LockFailed(#[source] io::Error),
}

/// An exclusive lock on one generator key, released on drop.
#[derive(Debug)]
pub struct FixtureLock {
  // the lock is released when this handle closes
  _file: File,
  lock_path: PathBuf,
}

impl FixtureLock {
  /// Block until the lock for `key` is held.
  pub fn acquire(lock_dir: &Path, lock_name: &str, key: &str) -> Result<Self, FixtureLockError> {
    let (file, lock_path) = open_lock_file(lock_dir, lock_name)?;
    debug!(path = ?lock_path, key = %key, "waiting for fixture lock");
    lock(&file, true).map_err(FixtureLockError::LockFailed)?;
    write_metadata(&file, key)?;
    Ok(Self { _file: file, lock_path })
  }

  /// Take the lock for `key` or fail immediately if someone else holds it.
  pub fn try_acquire(lock_dir: &Path, lock_name: &str, key: &str) -> Result<Self, FixtureLockError> {
    let (file, lock_path) = open_lock_file(lock_dir, lock_name)?;
    if let Err(err) = lock(&file, false) {
      if err.kind() == io::ErrorKind::WouldBlock {
        return Err(read_contention_error(&lock_path));
      }
      return Err(FixtureLockError::LockFailed(err));
    }
    write_metadata(&file, key)?;
    Ok(Self { _file: file, lock_path })
  }

  pub fn lock_path(&self) -> &Path {
    &self.lock_path
  }
}

fn open_lock_file(lock_dir: &Path, lock_name: &str) -> Result<(File, PathBuf), FixtureLockError> {
  std::fs::create_dir_all(lock_dir).map_err(FixtureLockError::CreateDir)?;
  let lock_path = lock_dir.join(format!("{lock_name}.lock"));

  let file = OpenOptions::new()
    .read(true)
    .write(true)
    .create(true)
    .truncate(false)
    .open(&lock_path)
    .map_err(FixtureLockError::OpenFile)?;

  Ok((file, lock_path))
}

fn write_metadata(file: &File, key: &str) -> Result<(), FixtureLockError> {
  let metadata = LockMetadata {
    pid: std::process::id(),
    started_at_unix: SystemTime::now()
      .duration_since(UNIX_EPOCH)
      .unwrap_or_default()
      .as_secs(),
    key: key.to_string(),
  };

  file.set_len(0).map_err(FixtureLockError::WriteMetadata)?;
  let mut writer = io::BufWriter::new(file);
  serde_json::to_writer(&mut writer, &metadata).map_err(|e| FixtureLockError::WriteMetadata(io::Error::other(e)))?;
  writer.flush().map_err(FixtureLockError::WriteMetadata)?;
  Ok(())
}

fn read_contention_error(lock_path: &Path) -> FixtureLockError {
  if let Ok(mut file) = File::open(lock_path) {
    let mut contents = String::new();
    if file.read_to_string(&mut contents).is_ok()
      && let Ok(metadata) = serde_json::from_str::<LockMetadata>(&contents)
    {
      return FixtureLockError::Contention {
        key: metadata.key,
        pid: metadata.pid,
        lock_path: lock_path.to_path_buf(),
      };
    }
  }

  FixtureLockError::ContentionUnknown {
    lock_path: lock_path.to_path_buf(),
  }
}

#[cfg(unix)]
fn lock(file: &File, blocking: bool) -> io::Result<()> {
  use rustix::fs::{FlockOperation, flock};
  use std::os::unix::io::AsFd;

  let operation = if blocking {
    FlockOperation::LockExclusive
  } else {
    FlockOperation::NonBlockingLockExclusive
  };

  flock(file.as_fd(), operation).map_err(|e| io::Error::from_raw_os_error(e.raw_os_error()))
}

#[cfg(windows)]
fn lock(file: &File, blocking: bool) -> io::Result<()> {
  use std::os::windows::io::AsRawHandle;
  use windows_sys::Win32::Foundation::HANDLE;
  use windows_sys::Win32::Storage::FileSystem::{LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY, LockFileEx};

  let handle = file.as_raw_handle() as HANDLE;
  let flags = if blocking {
    LOCKFILE_EXCLUSIVE_LOCK
  } else {
    LOCKFILE_FAIL_IMMEDIATELY | LOCKFILE_EXCLUSIVE_LOCK
  };

  // SAFETY: OVERLAPPED is valid when zero-initialized and the handle is owned by `file`.
  let result = unsafe {
    let mut overlapped = std::mem::zeroed();
    LockFileEx(handle, flags, 0, 1, 0, &mut overlapped)
  };

  if result == 0 {
    let err = io::Error::last_os_error();
    // ERROR_LOCK_VIOLATION
    if err.raw_os_error() == Some(33) {
      return Err(io::Error::from(io::ErrorKind::WouldBlock));
    }
    Err(err)
  } else {
    Ok(())
  }
}
