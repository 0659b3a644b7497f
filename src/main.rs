use clap::error::ErrorKind;
use clap::Parser;
use parqload::config::Config;
use parqload::error::IngestError;
use parqload::pipeline;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let config = match Config::try_parse() {
        Ok(config) => config,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            let err = IngestError::Config(e.to_string());
            error!(stage = err.stage(), "{err}");
            return ExitCode::from(err.exit_code());
        }
    };

    match pipeline::run(&config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(stage = err.stage(), "{err}");
            ExitCode::from(err.exit_code())
        }
    }
}
