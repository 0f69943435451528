//! sentinel Server Entry Point

use clap::Parser;
use sentinel::cli::{serve::ServeArgs, Cli, Commands};
use sentinel::logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init() {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    match cli.command {
        Some(Commands::Check(args)) => match sentinel::cli::check::execute(&args).await {
            Ok(true) => {}
            Ok(false) => std::process::exit(1),
            Err(e) => {
                eprintln!("Error: {:#}", e);
                std::process::exit(1);
            }
        },
        Some(Commands::Serve(args)) => run_server(args).await,
        None => {
            // No subcommand - default to serve (flags come from the environment)
            let args = match Cli::try_parse_from(["sentinel", "serve"]).map(|cli| cli.command) {
                Ok(Some(Commands::Serve(args))) => args,
                Ok(_) => {
                    eprintln!("Error: failed to resolve default serve arguments");
                    std::process::exit(2);
                }
                Err(e) => e.exit(),
            };
            run_server(args).await;
        }
    }
}

async fn run_server(args: ServeArgs) {
    if let Err(e) = sentinel::cli::serve::execute(&args).await {
        tracing::error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
