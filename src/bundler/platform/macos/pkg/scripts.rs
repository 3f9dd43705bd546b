//! Lifecycle script assembly.
//!
//! `pkgbuild --scripts` discovers hooks by file name, so each declared script
//! is copied in under its conventional name. Script resources land next to
//! them so a script's working directory at install time holds its
//! dependencies.

use super::staging::StagingArea;
use crate::bundler::{
    error::{Error, ResourceKind, Result},
    settings::PackageSpec,
    utils::fs,
};
use std::path::{Path, PathBuf};

/// Assembles the scripts directory for `spec`.
///
/// Returns `None` when no lifecycle script is declared; the directory is
/// then never created, so the component build does not reference an empty
/// scripts directory. Script resources without any script are ignored.
///
/// # Errors
///
/// - [`Error::MissingResource`] when a script or resource path does not exist
/// - [`Error::Configuration`] when two entries share a target name
/// - [`Error::Staging`] when a copy fails
pub async fn assemble_scripts(
    spec: &PackageSpec,
    staging: &mut StagingArea,
) -> Result<Option<PathBuf>> {
    if spec.scripts.is_empty() {
        if !spec.script_resources.is_empty() {
            log::warn!(
                "Ignoring {} script resource(s): no lifecycle script declared",
                spec.script_resources.len()
            );
        }
        return Ok(None);
    }

    let dir = staging.scripts_dir();
    fs::create_dir_all(&dir).await?;

    for (kind, source) in spec.scripts.iter() {
        require(source, ResourceKind::Script)?;
        let target = dir.join(kind.file_name());
        claim(&target, source)?;
        staging.copy_in(source, &target).await?;
        fs::set_executable(&target).await?;
        log::debug!("Added {} script from {}", kind, source.display());
    }

    for resource in &spec.script_resources {
        require(resource, ResourceKind::ScriptResource)?;
        let name = resource.file_name().ok_or_else(|| {
            Error::Configuration(format!(
                "script resource has no file name: {}",
                resource.display()
            ))
        })?;
        let target = dir.join(name);
        claim(&target, resource)?;
        staging.copy_in(resource, &target).await?;
        fs::set_executable(&target).await?;
        log::debug!("Added script resource {}", resource.display());
    }

    Ok(Some(dir))
}

fn require(path: &Path, kind: ResourceKind) -> Result<()> {
    if std::fs::symlink_metadata(path).is_err() {
        return Err(Error::MissingResource {
            kind,
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

fn claim(target: &Path, source: &Path) -> Result<()> {
    if std::fs::symlink_metadata(target).is_ok() {
        return Err(Error::Configuration(format!(
            "{} would overwrite scripts/{}",
            source.display(),
            target
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        )));
    }
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::bundler::{ErrorKind, ScriptKind, Toolchain};
    use std::os::unix::fs::PermissionsExt;

    struct Fixture {
        src: tempfile::TempDir,
        staging: StagingArea,
        _tmp: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let staging = StagingArea::create(&Toolchain::default().temp_root(tmp.path())).unwrap();
        Fixture {
            src: tempfile::tempdir().unwrap(),
            staging,
            _tmp: tmp,
        }
    }

    fn write(dir: &Path, name: &str, mode: u32) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).unwrap();
        path
    }

    #[tokio::test]
    async fn renames_scripts_and_marks_them_executable() {
        let mut fx = fixture();
        let pre = write(fx.src.path(), "before.sh", 0o644);
        let helper = write(fx.src.path(), "desktoppr", 0o600);

        let mut spec = PackageSpec::new("A.pkg", "com.x.a");
        spec.scripts.set(ScriptKind::Preinstall, pre);
        spec.script_resources.push(helper);

        let dir = assemble_scripts(&spec, &mut fx.staging)
            .await
            .unwrap()
            .unwrap();

        for name in ["preinstall", "desktoppr"] {
            let mode = std::fs::metadata(dir.join(name)).unwrap().permissions().mode();
            assert_eq!(mode & 0o111, 0o111, "{name} not executable");
        }
        assert!(!dir.join("before.sh").exists());
    }

    #[tokio::test]
    async fn no_scripts_means_no_directory() {
        let mut fx = fixture();
        let mut spec = PackageSpec::new("A.pkg", "com.x.a");
        spec.script_resources
            .push(write(fx.src.path(), "helper", 0o644));

        assert!(assemble_scripts(&spec, &mut fx.staging).await.unwrap().is_none());
        assert!(!fx.staging.scripts_dir().exists());
    }

    #[tokio::test]
    async fn resource_colliding_with_a_script_is_rejected() {
        let mut fx = fixture();
        let mut spec = PackageSpec::new("A.pkg", "com.x.a");
        spec.scripts
            .set(ScriptKind::Postinstall, write(fx.src.path(), "post.sh", 0o755));
        let nested = fx.src.path().join("extra");
        std::fs::create_dir(&nested).unwrap();
        spec.script_resources
            .push(write(&nested, "postinstall", 0o644));

        let err = assemble_scripts(&spec, &mut fx.staging).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn missing_script_is_reported_by_role() {
        let mut fx = fixture();
        let mut spec = PackageSpec::new("A.pkg", "com.x.a");
        spec.scripts
            .set(ScriptKind::Postflight, fx.src.path().join("nope.sh"));

        match assemble_scripts(&spec, &mut fx.staging).await.unwrap_err() {
            Error::MissingResource { kind, .. } => assert_eq!(kind, ResourceKind::Script),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn resource_directories_are_copied_whole() {
        let mut fx = fixture();
        let lib = fx.src.path().join("lib");
        std::fs::create_dir(&lib).unwrap();
        write(&lib, "common.sh", 0o644);

        let mut spec = PackageSpec::new("A.pkg", "com.x.a");
        spec.scripts
            .set(ScriptKind::Postinstall, write(fx.src.path(), "post.sh", 0o755));
        spec.script_resources.push(lib);

        let dir = assemble_scripts(&spec, &mut fx.staging)
            .await
            .unwrap()
            .unwrap();
        assert!(dir.join("lib/common.sh").is_file());
    }
}
