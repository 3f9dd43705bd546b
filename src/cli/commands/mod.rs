//! Command execution for package builds.

mod build;

use crate::cli::{Args, RuntimeConfig};
use crate::error::{CliError, Result};

use build::execute_build;

/// Execute the build described by the parsed arguments
pub async fn execute_command(args: Args) -> Result<i32> {
    args.validate()
        .map_err(|reason| CliError::InvalidArguments { reason })?;

    let config = RuntimeConfig::from(&args);
    execute_build(&args, &config).await
}
