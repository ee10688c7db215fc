use clap::Parser;
use tracing_subscriber::EnvFilter;

use claimcmp::api::{AppState, analyze_to_json, run_http_server};
use claimcmp::cli::{Cli, Command, build_assumptions};
use claimcmp::config::ServerConfig;
use claimcmp::core::LookupTables;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Analyze(args) => analyze_to_json(args).map(|json| println!("{json}")),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn serve(args: claimcmp::cli::ServeArgs) -> Result<(), String> {
    let config = ServerConfig::from_env().with_overrides(&args);
    let assumptions = build_assumptions(&args.assumptions)?;
    let tables = LookupTables::load(&config.data_dir).map_err(|e| e.to_string())?;
    let state = AppState {
        assumptions,
        tables,
        output_dir: config.output_dir.clone(),
    };

    run_http_server(&config, state)
        .await
        .map_err(|e| format!("Server error: {e}"))
}
