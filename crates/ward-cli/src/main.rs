use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ward_cli::{Cli, EXIT_SETUP};

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ward=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match ward_cli::run(cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("ward: {err}");
            std::process::exit(EXIT_SETUP);
        }
    }
}
