//! Package build orchestration.
//!
//! This module provides the [`Packager`] that sequences staging, script
//! assembly, the component build, the optional distribution build and
//! signing, then delivers the artifact.

use crate::bundler::{
    BuildResult, BundledArtifact, PackageType, Result,
    error::{Context, ErrorExt},
    platform::macos::{
        pkg::{
            CommonMark, MarkdownRenderer, StagingArea, assemble_scripts, build_component,
            build_descriptor, build_distribution, components_for,
        },
        sign::sign_package,
    },
    settings::{PackageSpec, Toolchain},
    utils::fs::{deliver_file, remove_file},
};
use std::{fmt, path::Path};

use super::{checksum::calculate_sha256, tool_detection::check_tools};

/// Pipeline states, in the order a build passes through them.
///
/// A flat build skips the distribution states. Any failure jumps to
/// [`Cleanup`](Self::Cleanup) and ends in [`Failed`](Self::Failed).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildStage {
    Validating,
    Staging,
    ScriptAssembly,
    ComponentBuild,
    ComponentSign,
    DescriptorBuild,
    DistributionBuild,
    DistributionSign,
    Delivering,
    Cleanup,
    Done,
    Failed,
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Validating => "validating",
            Self::Staging => "staging payload",
            Self::ScriptAssembly => "assembling scripts",
            Self::ComponentBuild => "building component package",
            Self::ComponentSign => "signing component package",
            Self::DescriptorBuild => "generating distribution descriptor",
            Self::DistributionBuild => "building distribution",
            Self::DistributionSign => "signing distribution",
            Self::Delivering => "delivering",
            Self::Cleanup => "cleaning up",
            Self::Done => "done",
            Self::Failed => "failed",
        })
    }
}

/// Builds one installer package from a [`PackageSpec`].
///
/// # Examples
///
/// ```no_run
/// use kodegen_bundler_pkg::bundler::{Packager, PackageSpecBuilder, Toolchain};
///
/// # async fn example() -> kodegen_bundler_pkg::bundler::Result<()> {
/// let spec = PackageSpecBuilder::new("dist/MyApp.pkg", "com.example.myapp")
///     .file("build/MyApp.app", "/Applications/MyApp.app")
///     .build()?;
///
/// let artifact = Packager::new(spec)?
///     .with_toolchain(Toolchain::from_env())
///     .build()
///     .await?;
/// println!("{} sha256:{}", artifact.path.display(), artifact.checksum);
/// # Ok(())
/// # }
/// ```
pub struct Packager {
    spec: PackageSpec,
    toolchain: Toolchain,
    renderer: Box<dyn MarkdownRenderer + Send + Sync>,
}

impl fmt::Debug for Packager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packager")
            .field("spec", &self.spec)
            .field("toolchain", &self.toolchain)
            .field("renderer", &"<MarkdownRenderer>")
            .finish()
    }
}

impl Packager {
    /// Creates a packager for `spec` with the default toolchain.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`](crate::bundler::Error::Configuration) when the
    /// spec is invalid. No file is touched.
    pub fn new(spec: PackageSpec) -> Result<Self> {
        spec.validate()?;
        Ok(Self {
            spec,
            toolchain: Toolchain::default(),
            renderer: Box::new(CommonMark),
        })
    }

    /// Uses `toolchain` for tool locations and signing policy.
    pub fn with_toolchain(mut self, toolchain: Toolchain) -> Self {
        self.toolchain = toolchain;
        self
    }

    /// Replaces the markdown renderer used for distribution pages.
    pub fn markdown_renderer(
        mut self,
        renderer: impl MarkdownRenderer + Send + Sync + 'static,
    ) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    /// Returns the package specification.
    pub fn spec(&self) -> &PackageSpec {
        &self.spec
    }

    /// Returns the toolchain.
    pub fn toolchain(&self) -> &Toolchain {
        &self.toolchain
    }

    /// Builds the package and reports the outcome as a [`BuildResult`].
    pub async fn run(&self) -> BuildResult {
        BuildResult::from(self.build().await)
    }

    /// Builds the package and delivers it to the output path.
    ///
    /// Invalid specs and missing inputs are rejected before anything is
    /// written. Once they pass, a package left at the output path by an
    /// earlier build is removed, so a failed build leaves no artifact
    /// behind. The staging area is removed on every exit path.
    pub async fn build(&self) -> Result<BundledArtifact> {
        self.enter(BuildStage::Validating);
        if let Err(e) = self.prepare().await {
            self.enter(BuildStage::Failed);
            return Err(e);
        }

        self.enter(BuildStage::Staging);
        let mut staging = match StagingArea::create(&self.toolchain) {
            Ok(staging) => staging,
            Err(e) => {
                self.enter(BuildStage::Failed);
                return Err(e);
            }
        };

        let result = self.run_stages(&mut staging).await;

        self.enter(BuildStage::Cleanup);
        let cleanup = staging.close();

        match result {
            Ok(artifact) => {
                if let Err(e) = cleanup {
                    log::warn!("Failed to remove staging area: {e}");
                }
                self.enter(BuildStage::Done);
                log::info!(
                    "Built {} package: {}",
                    artifact.package_type,
                    artifact.path.display()
                );
                Ok(artifact)
            }
            Err(e) => {
                if let Err(cleanup_err) = cleanup {
                    log::warn!("Failed to remove staging area: {cleanup_err}");
                }
                self.enter(BuildStage::Failed);
                Err(e)
            }
        }
    }

    async fn prepare(&self) -> Result<()> {
        self.spec.validate()?;
        self.spec.check_resources()?;
        check_tools(&self.spec, &self.toolchain)?;

        if self.spec.output.is_file() {
            log::info!("Removing existing package {}", self.spec.output.display());
        }
        remove_file(&self.spec.output).await
    }

    async fn run_stages(&self, staging: &mut StagingArea) -> Result<BundledArtifact> {
        let spec = &self.spec;
        let tools = &self.toolchain;

        staging.stage(&spec.files).await?;

        self.enter(BuildStage::ScriptAssembly);
        let scripts = assemble_scripts(spec, staging).await?;

        self.enter(BuildStage::ComponentBuild);
        let component = build_component(spec, staging, scripts.as_deref(), tools).await?;

        let mut signed = false;
        if spec.signing_identity.is_some() {
            self.enter(BuildStage::ComponentSign);
            signed = self.sign(&component.path).await?;
        }

        let (package_type, artifact) = if spec.as_distribution {
            self.enter(BuildStage::DescriptorBuild);
            let components = components_for(spec, component);
            let descriptor = build_descriptor(spec, &components, self.renderer.as_ref())?;

            self.enter(BuildStage::DistributionBuild);
            let path =
                build_distribution(&descriptor, staging, tools, spec.output_file_name()?).await?;

            signed = false;
            if spec.signing_identity.is_some() {
                self.enter(BuildStage::DistributionSign);
                signed = self.sign(&path).await?;
            }
            (PackageType::Distribution, path)
        } else {
            (PackageType::Flat, component.path)
        };

        self.enter(BuildStage::Delivering);
        deliver_file(&artifact, &spec.output)
            .await
            .context("delivering package")?;

        let size = tokio::fs::metadata(&spec.output)
            .await
            .fs_context("reading artifact metadata", &spec.output)?
            .len();
        let checksum = calculate_sha256(&spec.output).await?;

        Ok(BundledArtifact {
            package_type,
            path: spec.output.clone(),
            size,
            checksum,
            signed,
        })
    }

    /// Signs `artifact`, downgrading failures to warnings when the toolchain
    /// does not require a signature.
    async fn sign(&self, artifact: &Path) -> Result<bool> {
        let identity = self.spec.signing_identity.as_deref();
        match sign_package(artifact, identity, &self.toolchain).await {
            Ok(signed) => Ok(signed),
            Err(e) if !self.toolchain.require_signature => {
                log::warn!("Continuing with unsigned package: {e}");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    fn enter(&self, stage: BuildStage) {
        match stage {
            BuildStage::Failed => log::error!("[{}] {}", self.spec.identifier, stage),
            _ => log::info!("[{}] {}", self.spec.identifier, stage),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::{ErrorKind, FileMapping};

    #[test]
    fn new_rejects_invalid_specs() {
        let err = Packager::new(PackageSpec::new("A.pkg", "com.x.a")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn missing_tool_fails_before_staging() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("file.txt");
        std::fs::write(&src, "x").unwrap();

        let mut spec = PackageSpec::new(tmp.path().join("A.pkg"), "com.x.a");
        spec.files.push(FileMapping::new(&src, "/tmp/file.txt"));

        let stage_root = tmp.path().join("stage");
        let packager = Packager::new(spec).unwrap().with_toolchain(Toolchain {
            pkgbuild: "/nonexistent/pkgbuild".into(),
            ..Toolchain::default().temp_root(&stage_root)
        });

        let result = packager.run().await;
        assert!(!result.success());
        assert_eq!(result.error().map(|e| e.kind()), Some(ErrorKind::BuildTool));
        assert!(!stage_root.exists());
        assert!(!tmp.path().join("A.pkg").exists());
    }

    #[test]
    fn stages_render_for_logs() {
        assert_eq!(BuildStage::ComponentSign.to_string(), "signing component package");
    }
}
