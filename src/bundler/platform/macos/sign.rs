//! Installer package signing with `productsign`.
//!
//! Signing is opt-in: with no identity configured nothing is invoked.

use crate::bundler::{
    error::{Error, ErrorExt, Result},
    settings::Toolchain,
    utils::process::{ToolCommand, ToolOutput, launch_diagnostic},
};
use std::path::{Path, PathBuf};

/// Signs `artifact` in place with `identity`.
///
/// This function:
/// 1. Returns `Ok(false)` without invoking anything when `identity` is `None`
/// 2. Checks that `security find-identity -v` lists the identity
/// 3. Runs `productsign` into `<artifact>.signed`
/// 4. Renames the signed file over the original
///
/// The original artifact is untouched unless signing succeeded.
///
/// # Returns
/// * `Ok(true)` - the artifact is now signed
/// * `Ok(false)` - no identity configured
/// * `Err(Error::Sign)` - identity missing or `productsign` failed
pub async fn sign_package(
    artifact: &Path,
    identity: Option<&str>,
    toolchain: &Toolchain,
) -> Result<bool> {
    let Some(identity) = identity else {
        log::debug!("No signing identity configured, skipping signing");
        return Ok(false);
    };

    log::info!("Signing {} with identity '{}'", artifact.display(), identity);

    verify_identity(identity, toolchain).await?;

    let signed = signed_path(artifact);
    let cmd = productsign_command(toolchain, identity, artifact, &signed);
    if let Err(e) = run_signing_tool(&cmd).await {
        let _ = tokio::fs::remove_file(&signed).await;
        return Err(e);
    }

    tokio::fs::rename(&signed, artifact)
        .await
        .fs_context("replacing unsigned package", artifact)?;

    log::info!("✓ Successfully signed {}", artifact.display());
    Ok(true)
}

/// Fails unless `identity` appears among the valid signing identities.
pub async fn verify_identity(identity: &str, toolchain: &Toolchain) -> Result<()> {
    let cmd = ToolCommand::new(&toolchain.security)
        .arg("find-identity")
        .arg("-v");
    let output = run_signing_tool(&cmd).await?;

    if !output.stdout.contains(identity) {
        return Err(Error::Sign(format!(
            "signing identity not found: {identity}"
        )));
    }
    Ok(())
}

/// Assembles the `productsign` command line.
pub fn productsign_command(
    toolchain: &Toolchain,
    identity: &str,
    input: &Path,
    output: &Path,
) -> ToolCommand {
    ToolCommand::new(&toolchain.productsign)
        .opt("--sign", identity)
        .arg(input)
        .arg(output)
}

fn signed_path(artifact: &Path) -> PathBuf {
    let mut name = artifact.as_os_str().to_os_string();
    name.push(".signed");
    PathBuf::from(name)
}

async fn run_signing_tool(cmd: &ToolCommand) -> Result<ToolOutput> {
    let output = cmd
        .output()
        .await
        .map_err(|e| Error::Sign(launch_diagnostic(cmd, &e)))?;

    if !output.success() {
        let diagnostic = output.diagnostic();
        log::error!("Signing failed:\n{diagnostic}");
        return Err(Error::Sign(diagnostic));
    }
    Ok(output)
}
