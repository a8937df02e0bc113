// SPDX-FileCopyrightText: © 2025 Lexibridge Contributors
//
// SPDX-License-Identifier: MPL-2.0

use std::sync::Arc;

use lexibridge_engine::Translator;

use crate::config::Config;
use crate::language_detector::LanguageDetector;

/// Explicit, `Arc`-wrapped application state shared across all request
/// handlers. Its lifetime is the lifetime of the server process.
#[derive(Clone)]
pub struct AppState {
    pub translator: Arc<dyn Translator>,
    pub language_detector: Arc<dyn LanguageDetector>,
    pub config: Arc<Config>,
    pub app_id: String,
}
