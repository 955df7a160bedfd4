mod cli;
mod progress;
mod telemetry;

#[tokio::main]
async fn main() {
    // Load environment variables from .env when present; the YAML config
    // still wins for everything but credentials.
    let _ = dotenvy::dotenv();

    let code = cli::run().await;
    std::process::exit(code);
}
