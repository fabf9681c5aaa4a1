//! Pretrained sentence encoder run locally through candle.
//!
//! Weights, config and tokenizer are fetched from the Hugging Face hub on
//! first use and cached under `HF_HOME`. Token embeddings are mean-pooled over
//! the attention mask and L2-normalized, matching sentence-transformers.

use super::Embedder;
use crate::error::{Error, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config};
use hf_hub::api::sync::Api;
use std::fs;
use std::path::PathBuf;
use tokenizers::TruncationParams;

pub use crate::config::DEFAULT_EMBEDDING_MODEL as DEFAULT_MODEL;
/// Used when the model repo carries no `sentence_bert_config.json`.
pub const DEFAULT_MAX_SEQUENCE_LENGTH: usize = 256;

fn candle_err(e: candle_core::Error) -> Error { Error::Embedding(e.to_string()) }

pub struct CandleEmbedder {
    model: BertModel,
    tokenizer: tokenizers::Tokenizer,
    device: Device,
    dimension: usize,
    max_sequence_length: usize,
    model_name: String,
}

impl CandleEmbedder {
    /// Load `model_name` (a hub id such as [`DEFAULT_MODEL`]), downloading it if needed.
    pub fn new(model_name: &str) -> Result<Self> {
        let device = Device::cuda_if_available(0).map_err(candle_err)?;
        let api = Api::new().map_err(|e| Error::Embedding(format!("hub unavailable: {e}")))?;
        let repo = api.model(model_name.to_string());
        let fetch = |file: &str| -> Result<PathBuf> {
            repo.get(file)
                .map_err(|e| Error::Embedding(format!("{model_name}: cannot fetch {file}: {e}")))
        };

        let config: Config = serde_json::from_str(&fs::read_to_string(fetch("config.json")?)?)?;
        let max_sequence_length = fetch("sentence_bert_config.json")
            .ok()
            .and_then(|path| fs::read_to_string(path).ok())
            .and_then(|raw| serde_json::from_str::<serde_json::Value>(&raw).ok())
            .and_then(|v| v["max_seq_length"].as_u64())
            .map_or(DEFAULT_MAX_SEQUENCE_LENGTH, |n| n as usize);

        let mut tokenizer = tokenizers::Tokenizer::from_file(fetch("tokenizer.json")?)
            .map_err(|e| Error::Embedding(format!("tokenizer load failed: {e}")))?;
        let truncation = TruncationParams { max_length: max_sequence_length, ..Default::default() };
        tokenizer
            .with_padding(None)
            .with_truncation(Some(truncation))
            .map_err(|e| Error::Embedding(format!("tokenizer setup failed: {e}")))?;

        let weights = fetch("model.safetensors")?;
        // Safety: the mapped file is owned by the hub cache and not modified while loaded.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights], DType::F32, &device) }
            .map_err(candle_err)?;
        let model = BertModel::load(vb, &config).map_err(candle_err)?;

        tracing::info!(model = model_name, dimension = config.hidden_size, "model loaded");
        Ok(Self {
            model,
            tokenizer,
            device,
            dimension: config.hidden_size,
            max_sequence_length,
            model_name: model_name.to_string(),
        })
    }

    fn forward(&self, ids: &[u32], mask: &[u32]) -> candle_core::Result<Vec<f32>> {
        let ids = Tensor::new(ids, &self.device)?.unsqueeze(0)?;
        let mask = Tensor::new(mask, &self.device)?.unsqueeze(0)?;
        let token_types = ids.zeros_like()?;
        let hidden = self.model.forward(&ids, &token_types, Some(&mask))?;

        // Mean over real tokens only.
        let weights = mask.to_dtype(DType::F32)?.unsqueeze(2)?;
        let summed = hidden.broadcast_mul(&weights)?.sum(1)?;
        let pooled = summed.broadcast_div(&weights.sum(1)?)?;

        let norm = pooled.sqr()?.sum_keepdim(1)?.sqrt()?;
        pooled.broadcast_div(&norm)?.squeeze(0)?.to_vec1::<f32>()
    }
}

impl Embedder for CandleEmbedder {
    fn name(&self) -> &str { &self.model_name }

    fn dimension(&self) -> usize { self.dimension }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(Error::EmptyText);
        }
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| Error::Embedding(format!("tokenization failed: {e}")))?;
        self.forward(encoding.get_ids(), encoding.get_attention_mask()).map_err(candle_err)
    }

    fn max_sequence_length(&self) -> Option<usize> { Some(self.max_sequence_length) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::cosine_similarity;

    // Downloads the model; run with `cargo test --features embeddings-candle -- --ignored`.
    #[test]
    #[ignore]
    fn related_sentences_score_higher() {
        let e = CandleEmbedder::new(DEFAULT_MODEL).unwrap();
        assert_eq!(e.dimension(), 384);
        assert_eq!(e.max_sequence_length(), Some(256));
        let shark = e.embed("a shark attacks swimmers at the beach").unwrap();
        let ocean = e.embed("a predator in the ocean hunts people").unwrap();
        let space = e.embed("astronauts repair a space station").unwrap();
        let norm: f32 = shark.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
        assert!(cosine_similarity(&shark, &ocean) > cosine_similarity(&shark, &space));
    }

    #[test]
    #[ignore]
    fn blank_text_is_rejected_before_the_model() {
        let e = CandleEmbedder::new(DEFAULT_MODEL).unwrap();
        assert!(matches!(e.embed(" "), Err(Error::EmptyText)));
    }
}
