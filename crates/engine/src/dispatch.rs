// SPDX-FileCopyrightText: © 2025 Lexibridge Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Serializes concurrent HTTP handler calls onto the single decoder.
//!
//! A dedicated OS thread owns the decoder, tokenizers, and lifecycle
//! state, and drains a bounded job channel one job at a time. This gives
//! FIFO admission order and at-most-one in-flight decoder invocation for
//! free from the channel's own ordering guarantee, without needing a
//! separate lock around the decoder.

use std::path::PathBuf;
use std::time::Duration;

use lexibridge_core::{Error, Language, Result};
use tokio::sync::{mpsc, oneshot};

use crate::decoder::{CandleDecoder, DecodeParams, DevicePreference};
use crate::lifecycle::{LifecycleController, TransitionOutcome};
use crate::tokenizer::Tokenizer;

/// The channel's send-side capacity. A burst larger than this applies
/// backpressure to callers rather than growing memory without bound.
const JOB_QUEUE_CAPACITY: usize = 256;

/// Per-request deadline matching the benchmark harness's default client
/// timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// One translation unit, fully resolved and validated by the caller.
#[derive(Debug, Clone)]
pub struct TranslateArgs {
    pub text: String,
    pub source: Language,
    pub target: Language,
    pub min_length_percentage: f64,
}

enum Job {
    CountTokens {
        text: String,
        reply: oneshot::Sender<Result<usize>>,
    },
    Translate {
        args: TranslateArgs,
        reply: oneshot::Sender<Result<String>>,
    },
    Batch {
        items: Vec<TranslateArgs>,
        reply: oneshot::Sender<Result<Vec<String>>>,
    },
    Stream {
        args: TranslateArgs,
        chunks: mpsc::Sender<String>,
        reply: oneshot::Sender<Result<()>>,
    },
    Load {
        keep_cache: bool,
        reply: oneshot::Sender<Result<TransitionOutcome>>,
    },
    Unload {
        to_cpu: bool,
        reply: oneshot::Sender<Result<TransitionOutcome>>,
    },
}

struct WorkerState {
    decoder: Option<CandleDecoder>,
    lifecycle: LifecycleController,
    snapshot_dir: PathBuf,
    device_pref: DevicePreference,
    inter_threads: usize,
    source_tokenizer: Tokenizer,
    target_tokenizer: Tokenizer,
}

fn build_params(
    worker: &WorkerState,
    input_len: usize,
    min_length_percentage: f64,
    target_tag_id: u32,
) -> Result<DecodeParams> {
    let decoder = worker.decoder.as_ref().ok_or(Error::ModelUnavailable)?;
    let min_decoding_length = ((input_len as f64 * min_length_percentage).floor() as usize).max(1);
    Ok(DecodeParams {
        max_decoding_length: 4096,
        min_decoding_length,
        no_repeat_ngram_size: 3,
        suppressed_sequences: vec![vec![target_tag_id]],
        decoder_start_token_id: target_tag_id,
        eos_token_id: decoder.eos_token_id(),
    })
}

fn tag_id(tokenizer: &Tokenizer, language: &Language) -> Result<u32> {
    tokenizer.token_to_id(&language.tag_token()).ok_or_else(|| {
        Error::InvalidInput(format!(
            "language tag {} is not present in the tokenizer vocabulary",
            language.tag_token()
        ))
    })
}

fn translate_one(
    worker: &mut WorkerState,
    args: &TranslateArgs,
    on_token: impl FnMut(u32) -> bool,
) -> Result<String> {
    let source_tag_id = tag_id(&worker.source_tokenizer, &args.source)?;
    let target_tag_id = tag_id(&worker.target_tokenizer, &args.target)?;

    let encoding = worker.source_tokenizer.encode(&args.text)?;
    let mut input_ids = vec![source_tag_id];
    input_ids.extend(encoding.token_ids.iter().copied());

    let params = build_params(
        worker,
        encoding.token_ids.len(),
        args.min_length_percentage,
        target_tag_id,
    )?;

    let decoder = worker.decoder.as_mut().ok_or(Error::ModelUnavailable)?;
    let ids = decoder.generate(&input_ids, &params, on_token)?;
    worker.target_tokenizer.decode(&ids, true)
}

fn handle_job(worker: &mut WorkerState, job: Job) {
    match job {
        Job::CountTokens { text, reply } => {
            let result = worker.source_tokenizer.count(&text);
            let _ = reply.send(result);
        }
        Job::Translate { args, reply } => {
            let result = translate_one(worker, &args, |_| true);
            let _ = reply.send(result);
        }
        Job::Batch { items, reply } => {
            let mut results = Vec::with_capacity(items.len());
            let mut failure = None;
            for item in &items {
                match translate_one(worker, item, |_| true) {
                    Ok(text) => results.push(text),
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                }
            }
            let _ = reply.send(match failure {
                Some(e) => Err(e),
                None => Ok(results),
            });
        }
        Job::Stream {
            args,
            chunks,
            reply,
        } => {
            let target_tokenizer = worker.target_tokenizer.clone();
            let result = translate_one(worker, &args, move |id| {
                let chunk = match target_tokenizer.decode(&[id], true) {
                    Ok(chunk) => chunk,
                    Err(_) => return false,
                };
                chunks.blocking_send(chunk).is_ok()
            });
            let _ = reply.send(result.map(|_| ()));
        }
        Job::Load { keep_cache, reply } => {
            let result = do_load(worker, keep_cache);
            let _ = reply.send(result);
        }
        Job::Unload { to_cpu, reply } => {
            let result = do_unload(worker, to_cpu);
            let _ = reply.send(result);
        }
    }
}

fn do_load(worker: &mut WorkerState, keep_cache: bool) -> Result<TransitionOutcome> {
    let _ = keep_cache;
    let outcome = worker.lifecycle.request_load();
    if outcome == TransitionOutcome::Changed {
        worker.decoder = Some(CandleDecoder::load(
            &worker.snapshot_dir,
            worker.device_pref,
            worker.inter_threads,
        )?);
    }
    Ok(outcome)
}

fn do_unload(worker: &mut WorkerState, to_cpu: bool) -> Result<TransitionOutcome> {
    let outcome = worker.lifecycle.request_unload(to_cpu);
    if outcome == TransitionOutcome::Changed {
        worker.decoder = None;
    }
    Ok(outcome)
}

/// Handle to the single decoder worker, cloneable and shared across HTTP
/// handlers.
#[derive(Clone)]
pub struct Dispatcher {
    tx: mpsc::Sender<Job>,
}

impl Dispatcher {
    /// Spawns the worker thread and loads the decoder synchronously before
    /// returning, so startup fails fast if the model cannot be loaded.
    pub fn start(
        snapshot_dir: PathBuf,
        device_pref: DevicePreference,
        inter_threads: usize,
        source_tokenizer: Tokenizer,
        target_tokenizer: Tokenizer,
    ) -> Result<Self> {
        let decoder = CandleDecoder::load(&snapshot_dir, device_pref, inter_threads)?;
        let is_cuda = decoder.device_label() == "cuda";

        let mut worker = WorkerState {
            decoder: Some(decoder),
            lifecycle: LifecycleController::new(is_cuda),
            snapshot_dir,
            device_pref,
            inter_threads,
            source_tokenizer,
            target_tokenizer,
        };

        let (tx, mut rx) = mpsc::channel::<Job>(JOB_QUEUE_CAPACITY);

        std::thread::Builder::new()
            .name("lexibridge-decoder-worker".to_string())
            .spawn(move || {
                while let Some(job) = rx.blocking_recv() {
                    handle_job(&mut worker, job);
                }
            })
            .map_err(|e| Error::Internal(format!("failed to spawn decoder worker: {e}")))?;

        Ok(Self { tx })
    }

    async fn send_and_await<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T>>) -> Job,
    ) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .await
            .map_err(|_| Error::Internal("decoder worker is no longer running".to_string()))?;

        tokio::time::timeout(REQUEST_TIMEOUT, reply_rx)
            .await
            .map_err(|_| Error::Timeout)?
            .map_err(|_| Error::Internal("decoder worker dropped the reply channel".to_string()))?
    }

    pub async fn count_tokens(&self, text: String) -> Result<usize> {
        self.send_and_await(|reply| Job::CountTokens { text, reply })
            .await
    }

    pub async fn translate(&self, args: TranslateArgs) -> Result<String> {
        self.send_and_await(|reply| Job::Translate { args, reply })
            .await
    }

    pub async fn translate_batch(&self, items: Vec<TranslateArgs>) -> Result<Vec<String>> {
        self.send_and_await(|reply| Job::Batch { items, reply })
            .await
    }

    /// Starts a streaming translation, returning a receiver of detokenized
    /// chunks plus a one-shot that resolves once decoding finishes (with
    /// the terminal success/error). Dropping the chunk receiver signals
    /// cancellation to the worker at the next token boundary.
    pub async fn translate_stream(
        &self,
        args: TranslateArgs,
    ) -> Result<(mpsc::Receiver<String>, oneshot::Receiver<Result<()>>)> {
        let (chunks_tx, chunks_rx) = mpsc::channel(16);
        let (reply_tx, reply_rx) = oneshot::channel();

        self.tx
            .send(Job::Stream {
                args,
                chunks: chunks_tx,
                reply: reply_tx,
            })
            .await
            .map_err(|_| Error::Internal("decoder worker is no longer running".to_string()))?;

        Ok((chunks_rx, reply_rx))
    }

    pub async fn load(&self, keep_cache: bool) -> Result<TransitionOutcome> {
        self.send_and_await(|reply| Job::Load { keep_cache, reply })
            .await
    }

    pub async fn unload(&self, to_cpu: bool) -> Result<TransitionOutcome> {
        self.send_and_await(|reply| Job::Unload { to_cpu, reply })
            .await
    }
}
