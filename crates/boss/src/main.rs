// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use tracing::error;

use boss::config::Cli;
use boss::error::exit_code;
use boss::Orchestrator;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let orchestrator = match Orchestrator::bootstrap(cli).await {
        Ok(orchestrator) => orchestrator,
        Err(err) => {
            eprintln!("fatal: {err}");
            std::process::exit(exit_code::CONFIG_OR_STARTUP_FAILURE);
        }
    };

    if let Err(err) = orchestrator.run().await {
        error!(%err, "unrecoverable runtime error");
        std::process::exit(exit_code::UNRECOVERABLE_RUNTIME_ERROR);
    }

    std::process::exit(exit_code::CLEAN);
}
