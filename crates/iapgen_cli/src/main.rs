//! Main entry point for the iapgen CLI.

use clap::Parser;
use iapgen_cli::Cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() {
    let cli = Cli::parse();

    // `IAPGEN_LOG` wins over the verbosity flags.
    let default_filter = if cli.verbose {
        "iapgen=debug"
    } else if cli.quiet {
        "iapgen=warn"
    } else {
        "iapgen=info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env("IAPGEN_LOG").unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match iapgen_cli::run(cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:?}", miette::Report::new(err));
            std::process::exit(1);
        }
    }
}
