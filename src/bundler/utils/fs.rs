//! File system utilities for package assembly.
//!
//! Provides directory creation, tree copies that prefer a copy-on-write
//! clone and fall back to a permission-preserving recursive copy, and the
//! atomic delivery of finished artifacts.

use crate::bundler::error::{Context, Error, ErrorExt, Result};
use std::{
    collections::HashMap,
    io,
    path::{Path, PathBuf},
};
use tokio::fs;

/// Creates all of the directories of the specified path.
pub async fn create_dir_all(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .await
        .fs_context("creating directory", path)
}

/// Removes the file at `path` if it exists.
pub async fn remove_file(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).fs_context("removing", path),
    }
}

/// Gives the owner full access to every directory under `root`, so a tree
/// staged from read-only sources can be deleted. Blocking.
///
/// Failures are skipped; the removal that follows reports them.
#[cfg(unix)]
pub fn make_tree_removable(root: &Path) {
    use std::os::unix::fs::PermissionsExt;

    // Parents are yielded before walkdir opens them, so a fixed-up
    // directory is readable by the time its entries are listed.
    for entry in walkdir::WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_dir() {
            continue;
        }
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        let mut perms = meta.permissions();
        if perms.mode() & 0o700 != 0o700 {
            perms.set_mode(perms.mode() | 0o700);
            let _ = std::fs::set_permissions(entry.path(), perms);
        }
    }
}

#[cfg(not(unix))]
pub fn make_tree_removable(_root: &Path) {}

/// Makes a symbolic link to a directory.
#[cfg(unix)]
fn symlink_dir(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

/// Makes a symbolic link to a directory.
#[cfg(windows)]
fn symlink_dir(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(src, dst)
}

/// Makes a symbolic link to a file.
#[cfg(unix)]
fn symlink_file(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

/// Makes a symbolic link to a file.
#[cfg(windows)]
fn symlink_file(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(src, dst)
}

/// Copies a regular file from one path to another, creating any parent
/// directories of the destination path as necessary.
///
/// Fails if the source path is a directory or doesn't exist.
pub async fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if !from.is_file() {
        crate::bail!("{} is not a file", from.display());
    }
    if let Some(dest_dir) = to.parent() {
        fs::create_dir_all(dest_dir)
            .await
            .fs_context("creating directory", dest_dir)?;
    }
    fs::copy(from, to).await.fs_context("copying file", from)?;
    Ok(())
}

/// Adds the executable bits (`a+x`) to `path`, keeping the other mode bits.
#[cfg(unix)]
pub async fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)
        .await
        .fs_context("reading permissions of", path)?
        .permissions();
    perms.set_mode(perms.mode() | 0o111);
    fs::set_permissions(path, perms)
        .await
        .fs_context("setting permissions of", path)
}

#[cfg(not(unix))]
pub async fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// Places `artifact` at `output` so that `output` holds either its previous
/// content or the complete artifact, never a partial file.
///
/// The artifact is copied into a hidden sibling of `output` and renamed over
/// it. Parent directories are created on demand; the sibling is removed on
/// failure.
pub async fn deliver_file(artifact: &Path, output: &Path) -> Result<()> {
    let parent = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let name = output
        .file_name()
        .with_context(|| format!("output path has no file name: {}", output.display()))?;

    fs::create_dir_all(&parent)
        .await
        .fs_context("creating output directory", &parent)?;

    let partial = parent.join(format!(".{}.partial", name.to_string_lossy()));

    let result = match fs::copy(artifact, &partial).await {
        Ok(_) => fs::rename(&partial, output)
            .await
            .fs_context("replacing", output),
        Err(e) => Err(e).fs_context("writing", &partial),
    };

    if result.is_err() {
        let _ = fs::remove_file(&partial).await;
    }
    result
}

/// How a tree reached its destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CopyMethod {
    /// Copy-on-write clone of the whole tree.
    Clone,
    /// Recursive byte copy.
    Copy,
}

/// Remembers, per (source device, destination device) pair, whether a
/// copy-on-write clone works.
///
/// One cache lives for one staging run. A pair is tried once; the first
/// clone failure marks it non-cloneable and every later copy between those
/// devices goes straight to the recursive copy.
#[derive(Debug, Default)]
pub struct CloneCache {
    pairs: HashMap<(u64, u64), bool>,
}

impl CloneCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies a file or directory tree from `from` to `to`.
    ///
    /// `to` must not exist; its parent directories are created. Symlinks are
    /// copied as links and permission bits are preserved. Every I/O failure
    /// is reported as [`Error::Staging`].
    pub async fn copy_tree(&mut self, from: &Path, to: &Path) -> Result<CopyMethod> {
        let source_meta = fs::symlink_metadata(from)
            .await
            .staging_context("reading", from)?;

        let parent = to.parent().map(Path::to_path_buf).unwrap_or_default();
        fs::create_dir_all(&parent)
            .await
            .staging_context("creating directory", &parent)?;
        let dest_meta = fs::metadata(&parent)
            .await
            .staging_context("reading", &parent)?;

        let key = (device_id(&source_meta), device_id(&dest_meta));
        let try_clone = !source_meta.file_type().is_symlink()
            && key.0 == key.1
            && *self.pairs.get(&key).unwrap_or(&true);

        let from = from.to_path_buf();
        let to = to.to_path_buf();

        let (method, cloneable) = tokio::task::spawn_blocking(move || {
            let mut cloneable = None;
            if try_clone {
                match clone_path(&from, &to) {
                    Ok(()) => return Ok((CopyMethod::Clone, Some(true))),
                    Err(e) => {
                        log::debug!(
                            "Clone of {} failed ({}), falling back to copy",
                            from.display(),
                            e
                        );
                        remove_remnant(&to);
                        cloneable = Some(false);
                    }
                }
            }
            copy_recursive(&from, &to).map(|()| (CopyMethod::Copy, cloneable))
        })
        .await
        .map_err(|e| Error::GenericError(format!("Tree copy task panicked: {e}")))??;

        if let Some(cloneable) = cloneable {
            self.pairs.insert(key, cloneable);
        }
        Ok(method)
    }
}

#[cfg(unix)]
fn device_id(meta: &std::fs::Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    meta.dev()
}

#[cfg(not(unix))]
fn device_id(_meta: &std::fs::Metadata) -> u64 {
    0
}

/// Clones `from` to `to` with `clonefile(2)`. Directories clone recursively.
#[cfg(target_os = "macos")]
fn clone_path(from: &Path, to: &Path) -> io::Result<()> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    // <sys/clonefile.h>
    const CLONE_NOFOLLOW: u32 = 0x0001;

    let src = CString::new(from.as_os_str().as_bytes())?;
    let dst = CString::new(to.as_os_str().as_bytes())?;
    // SAFETY: both pointers come from live, NUL-terminated CStrings.
    let rc = unsafe { libc::clonefile(src.as_ptr(), dst.as_ptr(), CLONE_NOFOLLOW) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(target_os = "macos"))]
fn clone_path(_from: &Path, _to: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "copy-on-write clone is not available on this platform",
    ))
}

fn remove_remnant(path: &Path) {
    let Ok(meta) = std::fs::symlink_metadata(path) else {
        return;
    };
    let _ = if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
}

/// Recursive copy preserving symlinks and permission bits. Blocking.
///
/// Extended attributes survive only where `std::fs::copy` carries them,
/// which is regular files on macOS. Directory attributes, and every
/// attribute on other platforms, are dropped; only the clone path keeps
/// them all.
fn copy_recursive(from: &Path, to: &Path) -> Result<()> {
    let mut dirs = Vec::new();

    for entry in walkdir::WalkDir::new(from) {
        let entry = entry
            .map_err(io::Error::from)
            .staging_context("reading", from)?;
        let rel_path = entry.path().strip_prefix(from)?;
        let dest_path = if rel_path.as_os_str().is_empty() {
            to.to_path_buf()
        } else {
            to.join(rel_path)
        };

        if entry.file_type().is_symlink() {
            let target = std::fs::read_link(entry.path())
                .staging_context("reading link", entry.path())?;
            let linked = if entry.path().is_dir() {
                symlink_dir(&target, &dest_path)
            } else {
                symlink_file(&target, &dest_path)
            };
            linked.staging_context("linking", &dest_path)?;
        } else if entry.file_type().is_dir() {
            std::fs::create_dir_all(&dest_path)
                .staging_context("creating directory", &dest_path)?;
            let perms = entry
                .metadata()
                .map_err(io::Error::from)
                .staging_context("reading", entry.path())?
                .permissions();
            dirs.push((dest_path, perms));
        } else {
            // std::fs::copy carries the permission bits over
            std::fs::copy(entry.path(), &dest_path)
                .staging_context("copying", entry.path())?;
        }
    }

    // Directory modes last, so read-only directories can still be filled.
    for (dir, perms) in dirs.into_iter().rev() {
        std::fs::set_permissions(&dir, perms)
            .staging_context("setting permissions of", &dir)?;
    }

    Ok(())
}
