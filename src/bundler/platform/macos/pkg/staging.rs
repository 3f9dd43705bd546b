//! Ephemeral working tree for one build.
//!
//! Layout under a uniquely named temporary directory:
//!
//! ```text
//! kodegen-pkg-XXXXXX/
//! ├── payload/      mirror of the install hierarchy (pkgbuild --root)
//! ├── scripts/      lifecycle scripts and their resources, created on demand
//! ├── resources/    distribution pages and backgrounds, created on demand
//! └── components/   component packages built from the payload
//! ```
//!
//! The directory is removed when the [`StagingArea`] is dropped; [`close`]
//! does the same but reports removal errors. Either way, directories staged
//! read-only are made writable first so their contents can be deleted.
//!
//! [`close`]: StagingArea::close

use crate::bundler::{
    error::{ErrorExt, Result},
    settings::{FileMapping, Toolchain},
    utils::fs::{CloneCache, CopyMethod, make_tree_removable},
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const PREFIX: &str = "kodegen-pkg-";

/// Staging directory owned by a single build.
#[derive(Debug)]
pub struct StagingArea {
    // Taken by `close`; `Drop` handles every other exit.
    dir: Option<TempDir>,
    root: PathBuf,
    clones: CloneCache,
}

impl StagingArea {
    /// Allocates a fresh staging directory under the toolchain's temp root
    /// (or the system temp dir) with an empty payload root.
    pub fn create(toolchain: &Toolchain) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(PREFIX);
        let dir = match &toolchain.temp_root {
            Some(root) => {
                std::fs::create_dir_all(root).staging_context("creating temp root", root)?;
                builder
                    .tempdir_in(root)
                    .staging_context("creating staging directory in", root)?
            }
            None => builder
                .tempdir()
                .staging_context("creating staging directory in", std::env::temp_dir())?,
        };

        let area = Self {
            root: dir.path().to_path_buf(),
            dir: Some(dir),
            clones: CloneCache::new(),
        };
        for sub in [area.payload_root(), area.components_dir()] {
            std::fs::create_dir(&sub).staging_context("creating directory", &sub)?;
        }

        log::debug!("Created staging area {}", area.root().display());
        Ok(area)
    }

    /// Root of the staging tree.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory mirroring the install hierarchy.
    pub fn payload_root(&self) -> PathBuf {
        self.root().join("payload")
    }

    /// Directory the lifecycle scripts are assembled into.
    pub fn scripts_dir(&self) -> PathBuf {
        self.root().join("scripts")
    }

    /// Directory holding distribution resources.
    pub fn resources_dir(&self) -> PathBuf {
        self.root().join("resources")
    }

    /// Directory component packages are written to.
    pub fn components_dir(&self) -> PathBuf {
        self.root().join("components")
    }

    /// Copies `from` to `to`, cloning when the device pair supports it.
    pub async fn copy_in(&mut self, from: &Path, to: &Path) -> Result<CopyMethod> {
        self.clones.copy_tree(from, to).await
    }

    /// Materializes the file mapping under the payload root, in order.
    ///
    /// `/Applications/MyApp.app` is staged at `payload/Applications/MyApp.app`.
    /// Directory sources are copied recursively.
    pub async fn stage(&mut self, files: &[FileMapping]) -> Result<()> {
        let root = self.payload_root();
        for mapping in files {
            let target = root.join(mapping.root_relative_destination());
            let method = self.copy_in(&mapping.source, &target).await?;
            log::debug!(
                "Staged {} -> {} ({:?})",
                mapping.source.display(),
                mapping.destination.display(),
                method
            );
        }
        Ok(())
    }

    /// Removes the staging directory, reporting failures.
    pub fn close(mut self) -> Result<()> {
        let Some(dir) = self.dir.take() else {
            return Ok(());
        };
        make_tree_removable(&self.root);
        dir.close()
            .fs_context("removing staging directory", &self.root)
    }
}

impl Drop for StagingArea {
    fn drop(&mut self) {
        if self.dir.is_some() {
            make_tree_removable(&self.root);
            log::debug!("Removing staging area {}", self.root.display());
        }
    }
}

/// Allocates a staging area and materializes `files` into it.
///
/// # Errors
///
/// Returns [`Error::Staging`](crate::bundler::Error::Staging) when a source
/// is missing or unreadable, or a copy fails. The partially filled area is
/// removed before returning.
pub async fn stage(files: &[FileMapping], toolchain: &Toolchain) -> Result<StagingArea> {
    let mut area = StagingArea::create(toolchain)?;
    area.stage(files).await?;
    Ok(area)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::bundler::ErrorKind;
    use std::os::unix::fs::PermissionsExt;

    fn toolchain(root: &Path) -> Toolchain {
        Toolchain::default().temp_root(root)
    }

    #[tokio::test]
    async fn mirrors_destinations_under_payload_root() {
        let src = tempfile::tempdir().unwrap();
        let tmp = tempfile::tempdir().unwrap();

        let app = src.path().join("App.app");
        std::fs::create_dir_all(app.join("Contents/Resources")).unwrap();
        std::fs::write(app.join("Contents/Resources/data.bin"), [0u8, 1, 2, 255]).unwrap();
        let daemon = src.path().join("com.x.daemon.plist");
        std::fs::write(&daemon, "<plist/>").unwrap();
        std::fs::set_permissions(&daemon, std::fs::Permissions::from_mode(0o600)).unwrap();

        let files = [
            FileMapping::new(&app, "/Applications/App.app"),
            FileMapping::new(&daemon, "/Library/LaunchDaemons/com.x.daemon.plist"),
        ];
        let area = stage(&files, &toolchain(tmp.path())).await.unwrap();
        let payload = area.payload_root();

        assert_eq!(
            std::fs::read(payload.join("Applications/App.app/Contents/Resources/data.bin")).unwrap(),
            [0u8, 1, 2, 255]
        );
        let staged_daemon = payload.join("Library/LaunchDaemons/com.x.daemon.plist");
        assert_eq!(
            std::fs::metadata(staged_daemon).unwrap().permissions().mode() & 0o777,
            0o600
        );
    }

    #[tokio::test]
    async fn drop_removes_the_staging_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let area = StagingArea::create(&toolchain(tmp.path())).unwrap();
        let root = area.root().to_path_buf();
        assert!(root.join("payload").is_dir());
        assert!(root.file_name().unwrap().to_string_lossy().starts_with(PREFIX));

        drop(area);
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn missing_source_fails_and_cleans_up() {
        let tmp = tempfile::tempdir().unwrap();
        let files = [FileMapping::new(tmp.path().join("gone"), "/opt/gone")];

        let err = stage(&files, &toolchain(&tmp.path().join("stage")))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Staging);
        assert_eq!(
            std::fs::read_dir(tmp.path().join("stage")).unwrap().count(),
            0
        );
    }

    #[tokio::test]
    async fn read_only_sources_do_not_block_removal() {
        let src = tempfile::tempdir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let tree = src.path().join("tree");
        std::fs::create_dir_all(tree.join("share")).unwrap();
        std::fs::write(tree.join("share/data"), "x").unwrap();
        std::fs::set_permissions(tree.join("share"), std::fs::Permissions::from_mode(0o555))
            .unwrap();

        let files = [FileMapping::new(&tree, "/opt/tree")];
        let area = stage(&files, &toolchain(tmp.path())).await.unwrap();
        let staged = area.payload_root().join("opt/tree/share");
        assert_eq!(
            std::fs::metadata(&staged).unwrap().permissions().mode() & 0o777,
            0o555
        );
        area.close().unwrap();

        let dropped = stage(&files, &toolchain(tmp.path())).await.unwrap();
        drop(dropped);
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);

        std::fs::set_permissions(tree.join("share"), std::fs::Permissions::from_mode(0o755))
            .unwrap();
    }

    #[tokio::test]
    async fn separate_builds_get_separate_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let a = StagingArea::create(&toolchain(tmp.path())).unwrap();
        let b = StagingArea::create(&toolchain(tmp.path())).unwrap();
        assert_ne!(a.root(), b.root());
        a.close().unwrap();
        b.close().unwrap();
    }
}
