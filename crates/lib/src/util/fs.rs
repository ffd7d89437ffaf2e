//! Filesystem helpers.

use std::fs;
use std::io;
use std::path::Path;

use walkdir::WalkDir;

/// Recursively copy `src` into `dest`, creating `dest` if needed.
///
/// Permissions are preserved for regular files. Symlinks are recreated on
/// unix and followed elsewhere.
pub fn copy_dir(src: &Path, dest: &Path) -> io::Result<()> {
  fs::create_dir_all(dest)?;

  for entry in WalkDir::new(src).min_depth(1).sort_by_file_name() {
    let entry = entry.map_err(io::Error::other)?;
    let rel = entry.path().strip_prefix(src).map_err(io::Error::other)?;
    let target = dest.join(rel);
    let file_type = entry.file_type();

    if file_type.is_dir() {
      fs::create_dir_all(&target)?;
    } else if file_type.is_symlink() {
      copy_symlink(entry.path(), &target)?;
    } else {
      fs::copy(entry.path(), &target)?;
    }
  }

  Ok(())
}

/// Remove `path` if it exists. Missing paths are not an error.
pub fn remove_dir_if_exists(path: &Path) -> io::Result<()> {
  match fs::remove_dir_all(path) {
    Ok(()) => Ok(()),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
    Err(e) => Err(e),
  }
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dest: &Path) -> io::Result<()> {
  let target = fs::read_link(src)?;
  std::os::unix::fs::symlink(target, dest)
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dest: &Path) -> io::Result<()> {
  if src.is_dir() {
    copy_dir(src, dest)
  } else {
    fs::copy(src, dest).map(|_| ())
  }
}
