// SPDX-FileCopyrightText: © 2025 Lexibridge Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The `Translator` capability trait and its two implementations: the real
//! Candle-backed engine and a fixed-output stub used by tests and the
//! `stub_translator` configuration flag.

use std::path::PathBuf;

use async_trait::async_trait;
use lexibridge_core::{Error, Language, Result};
use tokio::sync::{mpsc, oneshot};

use crate::decoder::DevicePreference;
use crate::dispatch::{Dispatcher, TranslateArgs};
use crate::lifecycle::TransitionOutcome;
use crate::tokenizer::Tokenizer;
use crate::{asset_resolver, decoder};

/// One item for [`Translator::translate_batch`].
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub text: String,
    pub source: Language,
    pub target: Language,
    pub min_length_percentage: f64,
}

/// Capability trait satisfied by both the real translator and
/// [`StubTranslator`]. Mirrors the four translator-engine operations plus
/// the two lifecycle operations, so a single `Arc<dyn Translator>` is all
/// an HTTP handler needs.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn count_tokens(&self, text: &str) -> Result<usize>;

    async fn translate(
        &self,
        text: &str,
        source: &Language,
        target: &Language,
        min_length_percentage: f64,
    ) -> Result<String>;

    async fn translate_batch(&self, items: Vec<BatchItem>) -> Result<Vec<String>>;

    async fn translate_stream(
        &self,
        text: &str,
        source: &Language,
        target: &Language,
        min_length_percentage: f64,
    ) -> Result<(mpsc::Receiver<String>, oneshot::Receiver<Result<()>>)>;

    async fn load(&self, keep_cache: bool) -> Result<TransitionOutcome>;

    async fn unload(&self, to_cpu: bool) -> Result<TransitionOutcome>;
}

/// The real engine: resolves the model snapshot, loads tokenizers, and
/// serializes decoder access through a [`Dispatcher`].
pub struct CandleTranslator {
    dispatcher: Dispatcher,
}

impl CandleTranslator {
    /// Resolves `repository`, loads both tokenizers and the decoder, and
    /// starts the dispatch worker. Fails fatally (the caller should abort
    /// startup) if the model cannot be found or loaded.
    pub async fn bootstrap(
        repository: &str,
        use_cuda: bool,
        inter_threads: usize,
    ) -> Result<Self> {
        let snapshot_dir: PathBuf = asset_resolver::resolve(repository).await?;
        let source_tokenizer = Tokenizer::load_source(&snapshot_dir)?;
        let target_tokenizer = Tokenizer::load_target(&snapshot_dir)?;
        let device_pref = if use_cuda {
            DevicePreference::Cuda
        } else {
            DevicePreference::Cpu
        };

        let dispatcher = Dispatcher::start(
            snapshot_dir,
            device_pref,
            inter_threads,
            source_tokenizer,
            target_tokenizer,
        )?;

        Ok(Self { dispatcher })
    }
}

#[async_trait]
impl Translator for CandleTranslator {
    async fn count_tokens(&self, text: &str) -> Result<usize> {
        if text.is_empty() {
            return Err(Error::InvalidInput("text must not be empty".to_string()));
        }
        self.dispatcher.count_tokens(text.to_string()).await
    }

    async fn translate(
        &self,
        text: &str,
        source: &Language,
        target: &Language,
        min_length_percentage: f64,
    ) -> Result<String> {
        self.dispatcher
            .translate(TranslateArgs {
                text: text.to_string(),
                source: source.clone(),
                target: target.clone(),
                min_length_percentage,
            })
            .await
    }

    async fn translate_batch(&self, items: Vec<BatchItem>) -> Result<Vec<String>> {
        if items.is_empty() {
            return Err(Error::InvalidInput(
                "batch must contain at least one item".to_string(),
            ));
        }
        let args = items
            .into_iter()
            .map(|item| TranslateArgs {
                text: item.text,
                source: item.source,
                target: item.target,
                min_length_percentage: item.min_length_percentage,
            })
            .collect();
        self.dispatcher.translate_batch(args).await
    }

    async fn translate_stream(
        &self,
        text: &str,
        source: &Language,
        target: &Language,
        min_length_percentage: f64,
    ) -> Result<(mpsc::Receiver<String>, oneshot::Receiver<Result<()>>)> {
        self.dispatcher
            .translate_stream(TranslateArgs {
                text: text.to_string(),
                source: source.clone(),
                target: target.clone(),
                min_length_percentage,
            })
            .await
    }

    async fn load(&self, keep_cache: bool) -> Result<TransitionOutcome> {
        self.dispatcher.load(keep_cache).await
    }

    async fn unload(&self, to_cpu: bool) -> Result<TransitionOutcome> {
        self.dispatcher.unload(to_cpu).await
    }
}

/// Fixed-output translator used by tests and the `stub_translator`
/// configuration flag. Never touches the filesystem or a real model.
pub struct StubTranslator {
    state: std::sync::Mutex<TransitionOutcomeState>,
}

struct TransitionOutcomeState {
    loaded: bool,
}

impl Default for StubTranslator {
    fn default() -> Self {
        Self {
            state: std::sync::Mutex::new(TransitionOutcomeState { loaded: true }),
        }
    }
}

impl StubTranslator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn is_loaded(&self) -> bool {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner).loaded
    }
}

#[async_trait]
impl Translator for StubTranslator {
    async fn count_tokens(&self, text: &str) -> Result<usize> {
        if text.is_empty() {
            return Err(Error::InvalidInput("text must not be empty".to_string()));
        }
        Ok(text.split_whitespace().count().max(1) + 1)
    }

    async fn translate(
        &self,
        text: &str,
        _source: &Language,
        target: &Language,
        _min_length_percentage: f64,
    ) -> Result<String> {
        if !self.is_loaded() {
            return Err(Error::ModelUnavailable);
        }
        if text.is_empty() {
            return Err(Error::InvalidInput("text must not be empty".to_string()));
        }
        Ok(format!("[{target}] {text}"))
    }

    async fn translate_batch(&self, items: Vec<BatchItem>) -> Result<Vec<String>> {
        if items.is_empty() {
            return Err(Error::InvalidInput(
                "batch must contain at least one item".to_string(),
            ));
        }
        let mut results = Vec::with_capacity(items.len());
        for item in items {
            results.push(
                self.translate(&item.text, &item.source, &item.target, item.min_length_percentage)
                    .await?,
            );
        }
        Ok(results)
    }

    async fn translate_stream(
        &self,
        text: &str,
        source: &Language,
        target: &Language,
        min_length_percentage: f64,
    ) -> Result<(mpsc::Receiver<String>, oneshot::Receiver<Result<()>>)> {
        let full = self.translate(text, source, target, min_length_percentage).await?;
        let (chunks_tx, chunks_rx) = mpsc::channel(full.split(' ').count().max(1));
        let (reply_tx, reply_rx) = oneshot::channel();

        for word in full.split_inclusive(' ') {
            let _ = chunks_tx.send(word.to_string()).await;
        }
        drop(chunks_tx);
        let _ = reply_tx.send(Ok(()));

        Ok((chunks_rx, reply_rx))
    }

    async fn load(&self, _keep_cache: bool) -> Result<TransitionOutcome> {
        let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if state.loaded {
            return Ok(TransitionOutcome::Unchanged);
        }
        state.loaded = true;
        Ok(TransitionOutcome::Changed)
    }

    async fn unload(&self, _to_cpu: bool) -> Result<TransitionOutcome> {
        let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if !state.loaded {
            return Ok(TransitionOutcome::Unchanged);
        }
        state.loaded = false;
        Ok(TransitionOutcome::Changed)
    }
}

// Keeps the `decoder` module's constrained-decoding types reachable from
// downstream crates that want to reason about decode parameters directly
// (e.g. a benchmarking tool), without re-exporting the whole module tree.
pub use decoder::DecodeParams;

#[cfg(test)]
mod tests {
    use super::*;

    fn lang(code: &str) -> Language {
        Language::parse(code).unwrap()
    }

    #[tokio::test]
    async fn test_stub_translate_roundtrip() {
        let stub = StubTranslator::new();
        let out = stub
            .translate("hello", &lang("eng_Latn"), &lang("spa_Latn"), 0.8)
            .await
            .unwrap();
        assert_eq!(out, "[spa_Latn] hello");
    }

    #[tokio::test]
    async fn test_stub_rejects_empty_text() {
        let stub = StubTranslator::new();
        let err = stub
            .translate("", &lang("eng_Latn"), &lang("spa_Latn"), 0.8)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_stub_batch_preserves_order() {
        let stub = StubTranslator::new();
        let items = vec![
            BatchItem {
                text: "one".to_string(),
                source: lang("eng_Latn"),
                target: lang("spa_Latn"),
                min_length_percentage: 0.8,
            },
            BatchItem {
                text: "two".to_string(),
                source: lang("fra_Latn"),
                target: lang("eng_Latn"),
                min_length_percentage: 0.8,
            },
        ];
        let results = stub.translate_batch(items).await.unwrap();
        assert_eq!(results, vec!["[spa_Latn] one", "[eng_Latn] two"]);
    }

    #[tokio::test]
    async fn test_stub_unload_then_load_lifecycle() {
        let stub = StubTranslator::new();
        assert_eq!(stub.unload(false).await.unwrap(), TransitionOutcome::Changed);
        assert_eq!(stub.unload(false).await.unwrap(), TransitionOutcome::Unchanged);
        assert!(matches!(
            stub.translate("hi", &lang("eng_Latn"), &lang("spa_Latn"), 0.8).await,
            Err(Error::ModelUnavailable)
        ));
        assert_eq!(stub.load(false).await.unwrap(), TransitionOutcome::Changed);
        assert_eq!(stub.load(false).await.unwrap(), TransitionOutcome::Unchanged);
    }

    #[tokio::test]
    async fn test_stub_stream_concatenates_to_unary_result() {
        let stub = StubTranslator::new();
        let (mut chunks, done) = stub
            .translate_stream("hello there", &lang("eng_Latn"), &lang("spa_Latn"), 0.8)
            .await
            .unwrap();
        let mut collected = String::new();
        while let Some(chunk) = chunks.recv().await {
            collected.push_str(&chunk);
        }
        done.await.unwrap().unwrap();
        assert_eq!(collected, "[spa_Latn] hello there");
    }
}
