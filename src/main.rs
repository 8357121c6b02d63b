//! ratecache - daily exchange rates from the command line
//!
//! Prints cached data immediately and follows up with refreshed data when a
//! mirror returns something newer.

use std::sync::Arc;

use clap::Parser;
use futures::future::join_all;
use tracing_subscriber::EnvFilter;

use ratecache::cli::{format_catalogue, format_rates, Cli, Command};
use ratecache::RateService;

/// Sets up stderr logging; `RUST_LOG` wins over `--verbose`
fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "ratecache=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let service = Arc::new(RateService::from_config(&cli.service_config())?);

    match cli.command {
        Command::Rates {
            bases,
            targets,
            refresh,
        } => {
            // Each base runs its own pipeline; output blocks print as they arrive
            let lookups = bases.into_iter().map(|base| {
                let mut rx = service.get_rates(base.clone(), refresh.force, refresh.is_online());
                let targets = &targets;
                async move {
                    while let Some(emission) = rx.recv().await {
                        print!("{}", format_rates(&base, &emission, targets));
                    }
                }
            });
            join_all(lookups).await;
        }
        Command::Currencies { refresh } => {
            let mut rx = service.get_catalogue(refresh.force, refresh.is_online());
            while let Some(emission) = rx.recv().await {
                print!("{}", format_catalogue(&emission.into_inner()));
            }
        }
        Command::Date { base } => match service.last_publication_date(&base).await {
            Some(date) => println!("{date}"),
            None => println!("unknown"),
        },
    }

    Ok(())
}
