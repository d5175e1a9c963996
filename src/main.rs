use std::env;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use buyvsrent::api::{self, CliError};

fn init_tracing() {
    let filter =
        tracing_subscriber::EnvFilter::new(env::var("RUST_LOG").unwrap_or_else(|_| "info".into()));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let raw_args: Vec<String> = env::args().collect();
    if raw_args.get(1).map(|s| s.as_str()) == Some("serve") {
        let port = raw_args
            .get(2)
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(8080);
        if let Err(e) = api::run_http_server(port).await {
            eprintln!("Server error: {e}");
            std::process::exit(1);
        }
        return;
    }

    match api::run_cli() {
        Ok(()) => {}
        Err(CliError::Validation(err)) => {
            eprintln!("Invalid inputs:");
            for violation in &err.violations {
                eprintln!("  - {}", violation.message);
            }
            std::process::exit(1);
        }
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    }
}
