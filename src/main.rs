//! Kodegen Bundler Pkg - macOS installer package builder.
//!
//! This binary builds a flat or distribution `.pkg` from a TOML manifest and
//! guarantees the artifact exists at the output path when it exits with 0.

use kodegen_bundler_pkg::cli::{self, Args, OutputManager};
use std::process;

#[tokio::main]
async fn main() {
    let args = Args::parse_args();

    // RUST_LOG still wins over the flag
    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let exit_code = match cli::run(args).await {
        Ok(code) => code,
        Err(e) => {
            OutputManager::new(false, false).error(&format!("Error: {}", e));
            e.exit_code()
        }
    };

    process::exit(exit_code);
}
