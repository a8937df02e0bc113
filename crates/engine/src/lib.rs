// SPDX-FileCopyrightText: © 2025 Lexibridge Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Lexibridge Engine - multilingual neural translation.
//!
//! ## Modules
//!
//! - [`asset_resolver`]: locates or downloads a model snapshot from the
//!   Hugging Face Hub cache
//! - [`tokenizer`]: subword tokenization for one side of the model
//! - [`decoder`]: the Candle-backed Marian/NLLB decoder binding
//! - [`lifecycle`]: the model lifecycle state machine
//! - [`dispatch`]: serializes concurrent callers onto the single decoder
//! - [`translator`]: the `Translator` capability trait, the real engine,
//!   and the fixed-output stub

pub mod asset_resolver;
pub mod decoder;
pub mod dispatch;
pub mod lifecycle;
pub mod tokenizer;
pub mod translator;

pub use lifecycle::{LifecycleController, LifecycleState, TransitionOutcome};
pub use translator::{BatchItem, CandleTranslator, StubTranslator, Translator};
