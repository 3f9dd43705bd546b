//! Build command: manifest in, installer package out.

use crate::bundler::{PackageType, Packager, Toolchain};
use crate::cli::{Args, RuntimeConfig};
use crate::error::{CliError, Result};
use crate::manifest::load_manifest;

/// Exit code after Ctrl-C, following the shell's 128 + SIGINT convention.
const INTERRUPTED: i32 = 130;

/// Load the manifest, build the package and report the outcome.
///
/// Returns exit code 0 only when the package was delivered. Manifest and
/// configuration errors propagate; build failures are reported here with
/// their full diagnostic. Ctrl-C abandons the build, which removes its
/// staging area and kills any running tool, and exits with 130.
pub(super) async fn execute_build(args: &Args, config: &RuntimeConfig) -> Result<i32> {
    if !args.manifest.is_file() {
        return Err(CliError::InvalidManifest {
            path: args.manifest.clone(),
            reason: "file not found".to_string(),
        }
        .into());
    }

    let mut spec = load_manifest(&args.manifest)?;
    args.apply_overrides(&mut spec);

    let kind = if spec.as_distribution {
        PackageType::Distribution
    } else {
        PackageType::Flat
    };
    config.progress(&format!(
        "Building {} package {} {}",
        kind, spec.identifier, spec.version
    ))?;
    config.verbose_println(&format!("Manifest: {}", args.manifest.display()))?;

    let toolchain = Toolchain::from_env().require_signature(!args.allow_unsigned);
    config.verbose_println(&format!("pkgbuild: {}", toolchain.pkgbuild.display()))?;

    let packager = Packager::new(spec)?.with_toolchain(toolchain);
    let result = tokio::select! {
        result = packager.run() => result,
        Ok(()) = tokio::signal::ctrl_c() => {
            config.error_println("Interrupted, build abandoned");
            return Ok(INTERRUPTED);
        }
    };

    match result.into_result() {
        Ok(artifact) => {
            if config.json() {
                println!("{}", serde_json::to_string_pretty(&artifact)?);
            } else {
                if artifact.signed {
                    config.verbose_println("Package signature applied")?;
                } else if args.sign.is_some() {
                    config.warn("Package delivered unsigned")?;
                }
                config.output().artifact(&artifact)?;
            }
            Ok(0)
        }
        Err(e) => {
            config.error_println(&format!("Build failed: {e}"));
            Ok(1)
        }
    }
}
