use std::process::ExitCode;
use std::sync::Arc;

use tollgate::config::{load_config, schema_json};
use tollgate::startup;
use tollgate::utils::logger::init_logging;
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    if std::env::args().skip(1).any(|arg| arg == "--print-schema") {
        return match schema_json() {
            Ok(schema) => {
                println!("{schema}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("failed to render config schema: {e}");
                ExitCode::FAILURE
            }
        };
    }

    let config = match load_config() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match startup::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "server stopped");
            ExitCode::FAILURE
        }
    }
}
