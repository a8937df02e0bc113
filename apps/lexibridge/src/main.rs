// SPDX-FileCopyrightText: © 2025 Lexibridge Contributors
//
// SPDX-License-Identifier: MPL-2.0

use clap::Parser;

mod cli;
mod config;
mod http_error;
mod language_detector;
mod logging;
mod registry_client;
mod server;
mod state;
mod telemetry;

#[tokio::main]
async fn main() {
    // Install default crypto provider for Rustls, required before any TLS
    // operations.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let cli = cli::Cli::parse();
    cli::handle_command(&cli, |log_config, telemetry_config| {
        logging::init_logging(log_config, telemetry_config)
    })
    .await;
}
