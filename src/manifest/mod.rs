//! Package manifest loading.
//!
//! A manifest is a TOML file deserialized into a [`PackageSpec`]. Relative
//! paths resolve against the directory holding the manifest, so a manifest
//! can be used from any working directory.

use crate::bundler::{ErrorExt, Markdown, PackageSpec, Result};
use path_absolutize::Absolutize;
use std::path::{Path, PathBuf};

/// Load a package spec from the manifest at `path`.
///
/// The manifest is read and parsed once. A `[distribution]` table turns the
/// package into a distribution even without `as_distribution = true`.
///
/// # Errors
///
/// I/O errors carry the manifest path; malformed TOML, missing required
/// keys and unknown keys are
/// [`Configuration`](crate::bundler::ErrorKind::Configuration) errors.
pub fn load_manifest(path: &Path) -> Result<PackageSpec> {
    let contents = std::fs::read_to_string(path).fs_context("reading manifest", path)?;

    let absolute = path
        .absolutize()
        .fs_context("resolving manifest path", path)?;
    let base_dir = absolute.parent().unwrap_or_else(|| Path::new("/"));

    parse_manifest(&contents, base_dir)
}

/// Parse manifest `contents`, resolving relative paths against `base_dir`.
pub fn parse_manifest(contents: &str, base_dir: &Path) -> Result<PackageSpec> {
    let table: toml::Table = toml::from_str(contents)?;
    let has_distribution = table.contains_key("distribution");

    let mut spec: PackageSpec = toml::Value::Table(table).try_into()?;
    if has_distribution {
        spec.as_distribution = true;
    }

    resolve_paths(&mut spec, base_dir)?;
    log::debug!(
        "Loaded manifest for {} ({} file mapping(s))",
        spec.identifier,
        spec.files.len()
    );
    Ok(spec)
}

/// Rewrites every source-side path of `spec` to an absolute one.
///
/// Install destinations are left alone; they are paths on the target machine.
fn resolve_paths(spec: &mut PackageSpec, base_dir: &Path) -> Result<()> {
    let resolve = |path: &mut PathBuf| -> Result<()> {
        let absolute = path
            .absolutize_from(base_dir)
            .fs_context("resolving path", &*path)?
            .into_owned();
        *path = absolute;
        Ok(())
    };

    resolve(&mut spec.output)?;
    for mapping in &mut spec.files {
        resolve(&mut mapping.source)?;
    }
    for script in [
        &mut spec.scripts.preinstall,
        &mut spec.scripts.postinstall,
        &mut spec.scripts.preflight,
        &mut spec.scripts.postflight,
    ]
    .into_iter()
    .flatten()
    {
        resolve(script)?;
    }
    for resource in &mut spec.script_resources {
        resolve(resource)?;
    }

    let dist = &mut spec.distribution;
    for page in [&mut dist.welcome, &mut dist.readme, &mut dist.license]
        .into_iter()
        .flatten()
    {
        if let Markdown::File { file } = page {
            resolve(file)?;
        }
    }
    for image in [&mut dist.background, &mut dist.background_dark]
        .into_iter()
        .flatten()
    {
        resolve(image)?;
    }
    for package in &mut dist.packages {
        resolve(&mut package.path)?;
    }

    Ok(())
}
