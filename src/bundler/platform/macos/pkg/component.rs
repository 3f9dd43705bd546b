//! Component package build with `pkgbuild`.

use super::staging::StagingArea;
use crate::bundler::{
    error::Result,
    settings::{FileMapping, PackageSpec, Toolchain},
    utils::process::ToolCommand,
};
use std::path::{Path, PathBuf};

/// A flat package built from one spec, or referenced from a distribution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentPackage {
    /// Location of the `.pkg`.
    pub path: PathBuf,
    /// Package identifier.
    pub identifier: String,
    /// Package version.
    pub version: String,
    /// Install location the choice installs to.
    pub install_location: String,
}

impl ComponentPackage {
    /// File name referenced by a distribution descriptor.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Whether the payload may be retargeted to an existing copy of its bundle.
///
/// Only a payload whose single entry is a bundle is relocatable, and only
/// when the spec allows it.
pub fn is_relocatable(spec: &PackageSpec) -> bool {
    spec.allow_relocation && matches!(spec.files.as_slice(), [only] if only.is_bundle())
}

/// Writes the component property list for every bundle in the payload.
///
/// Returns `None` when the payload holds no bundle.
pub fn write_component_plist(spec: &PackageSpec, path: &Path) -> Result<Option<PathBuf>> {
    use plist::Value;

    let bundles: Vec<&FileMapping> = spec.files.iter().filter(|m| m.is_bundle()).collect();
    if bundles.is_empty() {
        return Ok(None);
    }

    let relocatable = is_relocatable(spec);
    let entries = bundles
        .into_iter()
        .map(|mapping| {
            let mut dict = plist::Dictionary::new();
            dict.insert("BundleHasStrictIdentifier".into(), true.into());
            dict.insert("BundleIsRelocatable".into(), relocatable.into());
            dict.insert("BundleIsVersionChecked".into(), true.into());
            dict.insert("BundleOverwriteAction".into(), "upgrade".into());
            dict.insert(
                "RootRelativeBundlePath".into(),
                mapping
                    .root_relative_destination()
                    .to_string_lossy()
                    .into_owned()
                    .into(),
            );
            Value::Dictionary(dict)
        })
        .collect();

    Value::Array(entries)
        .to_file_xml(path)
        .map_err(crate::bundler::error::Error::Plist)?;

    Ok(Some(path.to_path_buf()))
}

/// Assembles the `pkgbuild` command line.
///
/// `--root` is always given so script-only packages carry a (empty) payload
/// root; such packages get `--nopayload` instead of an install location.
pub fn pkgbuild_command(
    toolchain: &Toolchain,
    spec: &PackageSpec,
    payload_root: &Path,
    scripts_dir: Option<&Path>,
    component_plist: Option<&Path>,
    output: &Path,
) -> ToolCommand {
    let mut cmd = ToolCommand::new(&toolchain.pkgbuild)
        .opt("--identifier", &spec.identifier)
        .opt("--version", &spec.version)
        .opt("--root", payload_root);

    if let Some(scripts) = scripts_dir {
        cmd = cmd.opt("--scripts", scripts);
    }

    if spec.files.is_empty() {
        cmd = cmd.arg("--nopayload");
    } else {
        cmd = cmd.opt("--install-location", &spec.install_location);
        if let Some(plist) = component_plist {
            cmd = cmd.opt("--component-plist", plist);
        }
    }

    cmd.arg(output)
}

/// Builds the component package for `spec` from a staged payload.
///
/// # Errors
///
/// [`Error::BuildTool`](crate::bundler::Error::BuildTool) carrying the
/// captured `pkgbuild` diagnostic on non-zero exit.
pub async fn build_component(
    spec: &PackageSpec,
    staging: &StagingArea,
    scripts_dir: Option<&Path>,
    toolchain: &Toolchain,
) -> Result<ComponentPackage> {
    let output = staging
        .components_dir()
        .join(format!("{}.pkg", spec.identifier));

    let plist = write_component_plist(spec, &staging.root().join("component.plist"))?;
    if plist.is_some() {
        log::debug!(
            "Bundle payload, relocatable: {}",
            is_relocatable(spec)
        );
    }

    pkgbuild_command(
        toolchain,
        spec,
        &staging.payload_root(),
        scripts_dir,
        plist.as_deref(),
        &output,
    )
    .run("pkgbuild")
    .await?;

    log::info!("Built component package {}", spec.identifier);

    Ok(ComponentPackage {
        path: output,
        identifier: spec.identifier.clone(),
        version: spec.version.clone(),
        install_location: spec.install_location.clone(),
    })
}
