use clap::Parser;
use krfin_ingest::{IngestArgs, run};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    dotenvy::dotenv().ok();
    krfin_core::logging::init();

    match run(IngestArgs::parse()).await {
        Ok(code) => std::process::ExitCode::from(code as u8),
        Err(err) => {
            tracing::error!(%err, "ingest run failed");
            std::process::ExitCode::from(1)
        }
    }
}
