// SPDX-FileCopyrightText: © 2025 Lexibridge Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Candle-backed sequence-to-sequence decoder binding.
//!
//! Wraps a Marian/NLLB-family encoder-decoder model and exposes a single
//! `generate` entry point implementing the constrained-decoding policy from
//! the translator engine (max/min length, no-repeat-ngram, suppressed
//! sequences, deterministic argmax).

use std::path::Path;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::marian::{Config as MarianConfig, MTModel};
use lexibridge_core::{Error, Result};

/// Constrained-decoding parameters for one generation call. Mirrors the
/// table in the translator engine's `translate` contract.
#[derive(Debug, Clone)]
pub struct DecodeParams {
    pub max_decoding_length: usize,
    pub min_decoding_length: usize,
    pub no_repeat_ngram_size: usize,
    pub suppressed_sequences: Vec<Vec<u32>>,
    pub decoder_start_token_id: u32,
    pub eos_token_id: u32,
}

/// Preferred compute device. `Cuda` silently falls back to `Cpu` at
/// construction time if no CUDA device is available — see
/// [`CandleDecoder::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevicePreference {
    Cpu,
    Cuda,
}

fn ngram_is_blocked(generated: &[u32], candidate: u32, n: usize) -> bool {
    if n == 0 || generated.len() + 1 < n {
        return false;
    }
    let mut window: Vec<u32> = generated[generated.len() - (n - 1)..].to_vec();
    window.push(candidate);
    for start in 0..generated.len().saturating_sub(n - 1) {
        if generated[start..start + n] == window[..] {
            return true;
        }
    }
    false
}

fn sequence_is_suppressed(generated: &[u32], candidate: u32, suppressed: &[Vec<u32>]) -> bool {
    suppressed.iter().any(|seq| {
        if seq.is_empty() {
            return false;
        }
        let tail_len = seq.len() - 1;
        if generated.len() < tail_len {
            return false;
        }
        generated[generated.len() - tail_len..] == seq[..tail_len] && *seq.last().unwrap() == candidate
    })
}

/// A loaded Marian-family encoder-decoder model, ready to greedily decode
/// one sequence at a time. Not safe for overlapping calls — the dispatch
/// layer is responsible for serializing access.
pub struct CandleDecoder {
    model: MTModel,
    device: Device,
    inter_threads: usize,
    eos_token_id: u32,
}

// `MTModel` holds `Tensor`s backed by either a CPU `Vec` or a CUDA device
// pointer; neither carries thread-affine state, but candle does not derive
// `Send` for the enum wrapper itself. The dispatch layer guarantees this
// type is only ever touched by its single owning worker task at a time.
#[allow(unsafe_code)]
unsafe impl Send for CandleDecoder {}

impl CandleDecoder {
    /// Loads weights from `snapshot_dir/model.safetensors` (or
    /// `pytorch_model.safetensors` as a fallback name) plus a `config.json`
    /// describing the Marian architecture.
    pub fn load(
        snapshot_dir: &Path,
        device_preference: DevicePreference,
        inter_threads: usize,
    ) -> Result<Self> {
        let device = match device_preference {
            DevicePreference::Cpu => Device::Cpu,
            DevicePreference::Cuda => match Device::cuda_if_available(0) {
                Ok(Device::Cpu) | Err(_) => {
                    tracing::warn!("CUDA requested but unavailable, falling back to CPU");
                    Device::Cpu
                }
                Ok(cuda) => cuda,
            },
        };

        let config_path = snapshot_dir.join("config.json");
        let config_bytes = std::fs::read(&config_path)?;
        let config: MarianConfig = serde_json::from_slice(&config_bytes)
            .map_err(|e| Error::Internal(format!("invalid model config.json: {e}")))?;

        let weights_path = [
            snapshot_dir.join("model.safetensors"),
            snapshot_dir.join("pytorch_model.safetensors"),
        ]
        .into_iter()
        .find(|p| p.is_file())
        .ok_or_else(|| {
            Error::ModelNotFound(format!(
                "no safetensors weights found under {}",
                snapshot_dir.display()
            ))
        })?;

        // SAFETY: the file is a trusted local model snapshot resolved by
        // the asset resolver, not arbitrary user input, and is not mutated
        // for the lifetime of the mapping.
        #[allow(unsafe_code)]
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device)
                .map_err(|e| Error::Internal(format!("failed to map model weights: {e}")))?
        };

        let eos_token_id = config.eos_token_id;

        let model = MTModel::new(&config, vb)
            .map_err(|e| Error::Internal(format!("failed to construct decoder model: {e}")))?;

        Ok(Self {
            model,
            device,
            inter_threads,
            eos_token_id,
        })
    }

    #[must_use]
    pub fn eos_token_id(&self) -> u32 {
        self.eos_token_id
    }

    #[must_use]
    pub fn device_label(&self) -> &'static str {
        match self.device {
            Device::Cpu => "cpu",
            _ => "cuda",
        }
    }

    #[must_use]
    pub fn inter_threads(&self) -> usize {
        self.inter_threads
    }

    /// Greedily decodes `input_ids` to completion, returning the full token
    /// id sequence including the terminal EOS id. `on_token` is invoked
    /// once per newly produced id (including the final one) and may return
    /// `false` to request early cancellation at the next safe boundary.
    ///
    /// Resets the decoder's per-step KV cache before decoding so that each
    /// call starts from a clean state regardless of what was decoded
    /// before it.
    pub fn generate(
        &mut self,
        input_ids: &[u32],
        params: &DecodeParams,
        mut on_token: impl FnMut(u32) -> bool,
    ) -> Result<Vec<u32>> {
        self.model.reset_kv_cache();

        let input = Tensor::new(input_ids, &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(|e| Error::Internal(format!("failed to build input tensor: {e}")))?;

        let encoder_output = self
            .model
            .encoder()
            .forward(&input, 0)
            .map_err(|e| Error::Internal(format!("encoder forward pass failed: {e}")))?;

        let mut generated = vec![params.decoder_start_token_id];
        let mut emitted = Vec::new();

        for step in 0..params.max_decoding_length {
            let context = if step == 0 {
                generated.clone()
            } else {
                vec![*generated.last().unwrap()]
            };
            let start_pos = generated.len() - context.len();

            let decoder_input = Tensor::new(context.as_slice(), &self.device)
                .and_then(|t| t.unsqueeze(0))
                .map_err(|e| Error::Internal(format!("failed to build decoder tensor: {e}")))?;

            let logits = self
                .model
                .decode(&decoder_input, &encoder_output, start_pos)
                .map_err(|e| Error::Internal(format!("decoder forward pass failed: {e}")))?;

            let last_logits = logits
                .squeeze(0)
                .and_then(|t| t.get(t.dim(0).unwrap_or(1) - 1))
                .and_then(|t| t.to_dtype(DType::F32))
                .map_err(|e| Error::Internal(format!("failed to extract step logits: {e}")))?;

            let mut scores = last_logits
                .to_vec1::<f32>()
                .map_err(|e| Error::Internal(format!("failed to read logits: {e}")))?;

            let below_min_length = generated.len() - 1 < params.min_decoding_length;
            if below_min_length {
                if let Some(eos) = scores.get_mut(params.eos_token_id as usize) {
                    *eos = f32::NEG_INFINITY;
                }
            }

            let mut next_token = 0u32;
            let mut best_score = f32::NEG_INFINITY;
            for (id, &score) in scores.iter().enumerate() {
                let id = id as u32;
                if ngram_is_blocked(&generated, id, params.no_repeat_ngram_size) {
                    continue;
                }
                if sequence_is_suppressed(&generated, id, &params.suppressed_sequences) {
                    continue;
                }
                if score > best_score {
                    best_score = score;
                    next_token = id;
                }
            }

            generated.push(next_token);
            emitted.push(next_token);
            let keep_going = on_token(next_token);

            if next_token == params.eos_token_id || !keep_going {
                break;
            }
        }

        if emitted.is_empty() {
            return Err(Error::DecodeEmpty);
        }

        Ok(emitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ngram_blocking_detects_repeat() {
        let generated = vec![1, 2, 3, 1, 2];
        assert!(ngram_is_blocked(&generated, 3, 3));
    }

    #[test]
    fn test_ngram_blocking_allows_novel_continuation() {
        let generated = vec![1, 2, 3, 1, 2];
        assert!(!ngram_is_blocked(&generated, 9, 3));
    }

    #[test]
    fn test_ngram_blocking_disabled_at_zero() {
        let generated = vec![1, 2, 3, 1, 2];
        assert!(!ngram_is_blocked(&generated, 3, 0));
    }

    #[test]
    fn test_suppressed_sequence_blocks_target_tag_reemission() {
        let generated = vec![10, 20, 30];
        let suppressed = vec![vec![99]];
        assert!(sequence_is_suppressed(&generated, 99, &suppressed));
        assert!(!sequence_is_suppressed(&generated, 100, &suppressed));
    }
}
