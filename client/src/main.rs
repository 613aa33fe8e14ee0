use std::path::PathBuf;
use std::process::ExitCode;

use eas_client_lib::{config, EngineError, HandshakeOutcome};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // In debug builds, default to debug level for our crate
    // Can be overridden with RUST_LOG environment variable
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            EnvFilter::new("eas_client_lib=debug,eas_client=debug,info")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config_path = std::env::args_os().nth(1).map(PathBuf::from);

    match eas_client_lib::run(config_path.as_deref()).await {
        Ok(HandshakeOutcome::Completed) => {
            info!("Handshake complete");
            ExitCode::SUCCESS
        }
        Ok(HandshakeOutcome::Failed(failure)) => {
            error!("Handshake failed during {:?}: {}", failure.phase, failure.result);
            ExitCode::FAILURE
        }
        Ok(HandshakeOutcome::Stopped { reason }) => {
            info!("Handshake stopped: {}", reason.unwrap_or_default());
            ExitCode::FAILURE
        }
        Err(EngineError::ConfigNotFound) => {
            eprintln!(
                "Create a config.json with the following structure:\n\n{}",
                config::SAMPLE_CONFIG
            );
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
