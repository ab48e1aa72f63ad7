//! Metrika CLI - typed, retrying client for the Yandex Metrica API.
//!
//! Run `metrika --help` for usage information.

use anyhow::{Context, Result};
use console::style;
use metrika_bridge::{operations, Args, Command, Config, MetrikaClient, QueryBuilder, OPERATIONS};
use serde_json::Value;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse_args();

    // Setup logging
    setup_logging(&args);

    // Load configuration; a missing token stops here, for every subcommand
    let config = match Config::from_args(&args) {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            eprintln!("{} {}", style("Error:").red().bold(), e);
            std::process::exit(1);
        }
    };

    match &args.command {
        Command::List => print_operations(),
        Command::Url { operation, params } => {
            let params = parse_params(params)?;
            let builder = QueryBuilder::new(&config.base_url)?;
            match operations::lookup(operation).and_then(|op| op.parse(params)) {
                Ok(request) => match builder.build(&request) {
                    Ok(url) => println!("{url}"),
                    Err(e) => fail(&e),
                },
                Err(e) => fail(&e),
            }
        }
        Command::Call { operation, params } => {
            let params = parse_params(params)?;
            let client = match MetrikaClient::new(&config) {
                Ok(client) => client,
                Err(e) => fail(&e),
            };

            info!(operation = %operation, "Calling operation");

            match client.call(operation, params).await {
                Ok(body) => println!("{}", serde_json::to_string_pretty(&body)?),
                Err(e) => fail(&e),
            }
        }
    }

    Ok(())
}

fn parse_params(raw: &str) -> Result<Value> {
    serde_json::from_str(raw).context("--params must be a JSON object")
}

fn fail(e: &metrika_bridge::MetrikaError) -> ! {
    error!(error = %e, "Operation failed");
    eprintln!("{} {}", style("Error:").red().bold(), e);
    std::process::exit(1);
}

fn setup_logging(args: &Args) {
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("metrika_bridge={level},metrika={level}")));

    if args.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init();
    }
}

fn print_operations() {
    println!("{}", style("Operations:").bold());
    for op in OPERATIONS {
        println!();
        println!("  {}  {}", style(op.name).cyan().bold(), style(op.title).dim());
        println!("    {}", op.description);
        for param in op.params {
            let required = if param.required { "required" } else { "optional" };
            let default = param
                .default
                .map(|d| format!(", default {d}"))
                .unwrap_or_default();
            println!(
                "    {:<20} {:<10} ({required}{default}) {}",
                param.name,
                param.kind.label(),
                param.description
            );
        }
    }
    println!();
}
