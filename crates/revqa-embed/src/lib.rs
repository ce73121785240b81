//! revqa-embed
//!
//! Sentence embeddings for reviews and queries. [`EmbeddingModel`] runs a
//! BERT-family encoder (BGE by default) through candle with mean pooling;
//! [`HashEmbedder`] is a deterministic character-trigram hashing embedder for
//! tests and offline development (`APP_USE_FAKE_EMBEDDINGS=1`).

pub mod device;
pub mod pool;
pub mod tokenize;

use anyhow::{Result, anyhow};
use std::hash::Hasher;
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use tokenizers::Tokenizer;
use twox_hash::XxHash64;

use revqa_core::config::EmbeddingSettings;
use revqa_core::timing::PhaseTimer;
use revqa_core::traits::Embedder;

pub use device::select_device;
pub use pool::masked_mean_l2;
pub use tokenize::tokenize_on_device;

pub struct EmbeddingModel {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    max_len: usize,
    id: String,
}

impl EmbeddingModel {
    pub fn load(model_dir: &Path, model_name: &str, max_len: usize) -> Result<Self> {
        let _timer = PhaseTimer::start("embedding model loading");
        let device = select_device();
        tracing::info!("Loading {} from {}", model_name, model_dir.display());
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let config_path = model_dir.join("config.json");
        let config: BertConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;
        let dim = config.hidden_size;
        let max_len = max_len.min(config.max_position_embeddings);
        let vb = load_weights(model_dir, &device)?;
        let model = BertModel::load(vb, &config)?;
        let id = format!("bert:{}:d{}", model_name, dim);
        tracing::info!("Embedding model ready ({})", id);
        Ok(Self { model, tokenizer, device, dim, max_len, id })
    }

    pub fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize_on_device(&self.tokenizer, text, self.max_len, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let emb = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1::<f32>()?;
        anyhow::ensure!(emb.len() == self.dim, "expected {} dims, got {}", self.dim, emb.len());
        if start.elapsed().as_millis() > 500 { tracing::debug!("Slow embedding: {} ms", start.elapsed().as_millis()); }
        Ok(emb)
    }
}

impl Embedder for EmbeddingModel {
    fn id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_text(t)).collect()
    }
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        // SAFETY: the weights file is not modified while mapped.
        return Ok(unsafe { VarBuilder::from_mmaped_safetensors(&[safetensors], DTYPE, device)? });
    }
    let weights_path = model_dir.join("pytorch_model.bin");
    let weights = candle_core::pickle::read_all(&weights_path)?;
    let weights_map: std::collections::HashMap<String, Tensor> = weights.into_iter().collect();
    Ok(VarBuilder::from_tensors(weights_map, DTYPE, device))
}

/// Feature-hashing embedder over lower-cased character trigrams of each word.
///
/// Words sharing a stem ("team"/"teams") share most trigrams, so related texts
/// land close together without any model files.
pub struct HashEmbedder { dim: usize, id: String }

impl HashEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim, id: format!("hash:trigram:d{}", dim) } }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        let lowered = text.to_lowercase();
        for word in lowered.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let padded: Vec<char> = format!("^{word}$").chars().collect();
            for gram in padded.windows(3) {
                let mut hasher = XxHash64::with_seed(0);
                for c in gram { hasher.write_u32(*c as u32); }
                let h = hasher.finish();
                let idx = (h % self.dim as u64) as usize;
                let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
                v[idx] += sign;
            }
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v { *x /= norm; }
        v
    }
}

impl Embedder for HashEmbedder {
    fn id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { usize::MAX }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Box<dyn Embedder>> {
    let use_fake = settings.use_fake
        || std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
    if use_fake {
        tracing::info!("Using HashEmbedder (d={})", settings.fake_dim);
        return Ok(Box::new(HashEmbedder::new(settings.fake_dim)));
    }
    let model_dir = resolve_model_dir(settings)?;
    Ok(Box::new(EmbeddingModel::load(&model_dir, &settings.model, settings.max_len)?))
}

fn resolve_model_dir(settings: &EmbeddingSettings) -> Result<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(dir) = &settings.model_dir { candidates.push(PathBuf::from(dir)); }
    for var in ["APP_MODEL_DIR", "MODEL_DIR"] {
        if let Ok(dir) = std::env::var(var) { candidates.push(PathBuf::from(dir)); }
    }
    let short_name = settings.model.rsplit('/').next().unwrap_or(&settings.model);
    candidates.push(Path::new("models").join(short_name));
    for p in candidates {
        if p.join("config.json").exists() { tracing::info!("Using model dir: {}", p.display()); return Ok(p); }
    }
    Err(anyhow!("Could not locate a model directory for {} (set embedding.model_dir or APP_MODEL_DIR)", settings.model))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 { a.iter().zip(b).map(|(x, y)| x * y).sum() }

    #[test]
    fn hash_embedder_related_words_are_closer() {
        let e = HashEmbedder::new(256);
        let q = e.embed("team collaboration").unwrap();
        let a = e.embed("Jira helps teams collaborate").unwrap();
        let b = e.embed("Pricing is confusing").unwrap();
        assert!(cosine(&q, &a) > cosine(&q, &b));
    }

    #[test]
    fn hash_embedder_handles_empty_text() {
        let e = HashEmbedder::new(32);
        let v = e.embed("").unwrap();
        assert_eq!(v.len(), 32);
        assert!(v.iter().all(|x| *x == 0.0));
    }
}
