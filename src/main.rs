use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "allocation=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = allocation::api::run_cli().await {
        error!("{e}");
        std::process::exit(1);
    }
}
