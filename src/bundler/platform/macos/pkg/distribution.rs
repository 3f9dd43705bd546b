//! Distribution (product archive) build with `productbuild`.

use super::{
    component::ComponentPackage,
    descriptor::DistributionDescriptor,
    staging::StagingArea,
};
use crate::bundler::{
    error::{ErrorExt, Result},
    settings::{DEFAULT_INSTALL_LOCATION, PackageSpec, Toolchain},
    utils::{fs, process::ToolCommand},
};
use std::{
    io::Write,
    path::{Path, PathBuf},
};

/// Orders the components of a distribution: the package built from the
/// payload first, then the spec's extra packages as declared.
pub fn components_for(spec: &PackageSpec, built: ComponentPackage) -> Vec<ComponentPackage> {
    let mut components = vec![built];
    components.extend(spec.distribution.packages.iter().map(|c| ComponentPackage {
        path: c.path.clone(),
        identifier: c.identifier.clone(),
        version: c.version.clone(),
        install_location: c
            .install_location
            .clone()
            .unwrap_or_else(|| DEFAULT_INSTALL_LOCATION.to_string()),
    }));
    components
}

/// Writes the rendered pages and copies the background images into
/// `resources`.
pub async fn write_resources(descriptor: &DistributionDescriptor, resources: &Path) -> Result<()> {
    fs::create_dir_all(resources).await?;

    for page in &descriptor.pages {
        let path = resources.join(page.kind.file_name());
        tokio::fs::write(&path, &page.html)
            .await
            .fs_context("writing page", &path)?;
    }

    if let Some(bg) = &descriptor.background {
        fs::copy_file(&bg.light.source, &resources.join(&bg.light.file_name)).await?;
        if !bg.shares_light() {
            fs::copy_file(&bg.dark.source, &resources.join(&bg.dark.file_name)).await?;
        }
    }

    Ok(())
}

/// Directories `productbuild` searches for the referenced packages, in
/// choice order without repeats.
pub fn package_paths(descriptor: &DistributionDescriptor) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = Vec::new();
    for choice in &descriptor.choices {
        let dir = match choice.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !dirs.contains(&dir) {
            dirs.push(dir);
        }
    }
    dirs
}

/// Assembles the `productbuild` command line.
pub fn productbuild_command(
    toolchain: &Toolchain,
    distribution: &Path,
    resources: &Path,
    package_paths: &[PathBuf],
    output: &Path,
) -> ToolCommand {
    let mut cmd = ToolCommand::new(&toolchain.productbuild)
        .opt("--distribution", distribution)
        .opt("--resources", resources);
    for dir in package_paths {
        cmd = cmd.opt("--package-path", dir);
    }
    cmd.arg(output)
}

/// Composes the distribution described by `descriptor` inside the staging
/// area and returns the artifact path.
///
/// The descriptor is written to a uniquely named temporary file that is
/// removed when this returns.
///
/// # Errors
///
/// [`Error::BuildTool`](crate::bundler::Error::BuildTool) with the captured
/// `productbuild` diagnostic on non-zero exit.
pub async fn build_distribution(
    descriptor: &DistributionDescriptor,
    staging: &StagingArea,
    toolchain: &Toolchain,
    file_name: &str,
) -> Result<PathBuf> {
    let resources = staging.resources_dir();
    write_resources(descriptor, &resources).await?;

    let xml = descriptor.to_xml()?;
    let mut distribution = tempfile::Builder::new()
        .prefix("distribution-")
        .suffix(".xml")
        .tempfile_in(staging.root())
        .fs_context("creating descriptor in", staging.root())?;
    distribution
        .write_all(xml.as_bytes())
        .fs_context("writing descriptor", distribution.path())?;
    log::debug!("Distribution descriptor:\n{xml}");

    let output = staging.root().join(file_name);
    productbuild_command(
        toolchain,
        distribution.path(),
        &resources,
        &package_paths(descriptor),
        &output,
    )
    .run("productbuild")
    .await?;

    log::info!(
        "Composed distribution with {} choice(s)",
        descriptor.choices.len()
    );
    Ok(output)
}
