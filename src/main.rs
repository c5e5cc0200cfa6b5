// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! runflow - CI Pipeline Dispatch Engine
//!
//! Run declarative pipelines of conditional, dependency-ordered steps.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use runflow::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "runflow=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            pipeline,
            input,
            dry_run,
        } => runflow::cli::run::run(pipeline, input, dry_run, cli.verbose).await,
        Commands::Validate { pipeline, format } => {
            runflow::cli::validate::run(pipeline, format, cli.verbose).await
        }
        Commands::Graph { pipeline, format } => {
            runflow::cli::graph::run(pipeline, format, cli.verbose).await
        }
    };

    // Exit 1 for validation/definition problems, 2 for execution failures
    if let Err(error) = result {
        let code = error.exit_code();
        eprintln!("{:?}", miette::Report::new(error));
        std::process::exit(code);
    }
}
