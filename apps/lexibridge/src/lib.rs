// SPDX-FileCopyrightText: © 2025 Lexibridge Contributors
//
// SPDX-License-Identifier: MPL-2.0

pub mod cli;
pub mod config;
pub mod http_error;
pub mod language_detector;
pub mod logging;
pub mod registry_client;
pub mod server;
pub mod state;
pub mod telemetry;

pub use config::Config;
