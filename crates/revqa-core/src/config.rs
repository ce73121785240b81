//! Configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`__` separates nesting, e.g. `APP_RETRIEVAL__DENSE_K=5`). Provides helpers
//! to expand `~` and `${VAR}` and to resolve relative paths against a known
//! base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{RagError, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?.validate()?;
        Ok(config)
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    pub fn settings(&self) -> anyhow::Result<Settings> {
        self.figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to extract settings: {}", e))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub embedding: EmbeddingSettings,
    pub retrieval: RetrievalSettings,
    pub llm: LlmSettings,
    pub chat: ChatSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        self.retrieval.validate()?;
        if self.chat.history_turns > self.chat.max_turns {
            return Err(RagError::InvalidConfig(format!(
                "chat.history_turns ({}) exceeds chat.max_turns ({})",
                self.chat.history_turns, self.chat.max_turns
            )));
        }
        Ok(())
    }

    /// Expand and anchor every configured path at `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        self.data.corpus_path = resolve_with_base(base, &self.data.corpus_path).to_string_lossy().into_owned();
        self.data.lancedb_dir = resolve_with_base(base, &self.data.lancedb_dir).to_string_lossy().into_owned();
        if let Some(dir) = self.embedding.model_dir.take() {
            self.embedding.model_dir = Some(resolve_with_base(base, dir).to_string_lossy().into_owned());
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    /// A JSON array file, or a directory of them.
    pub corpus_path: String,
    pub lancedb_dir: String,
    pub lancedb_table: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            corpus_path: "data/all_reviews.json".to_string(),
            lancedb_dir: "indexes/lancedb".to_string(),
            lancedb_table: "reviews".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub model: String,
    pub model_dir: Option<String>,
    pub max_len: usize,
    pub use_fake: bool,
    pub fake_dim: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "BAAI/bge-base-en-v1.5".to_string(),
            model_dir: None,
            max_len: 512,
            use_fake: false,
            fake_dim: 384,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub dense_k: usize,
    pub sparse_k: usize,
    pub dense_weight: f32,
    pub sparse_weight: f32,
    pub rrf_constant: f32,
    /// Documents forwarded downstream; defaults to `dense_k + sparse_k`.
    pub fused_k: Option<usize>,
    pub search_timeout_ms: u64,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            dense_k: 3,
            sparse_k: 3,
            dense_weight: 0.5,
            sparse_weight: 0.5,
            rrf_constant: 60.0,
            fused_k: None,
            search_timeout_ms: 5_000,
        }
    }
}

impl RetrievalSettings {
    pub fn fused_k(&self) -> usize {
        self.fused_k.unwrap_or(self.dense_k + self.sparse_k)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, w) in [("dense_weight", self.dense_weight), ("sparse_weight", self.sparse_weight)] {
            if !w.is_finite() || w < 0.0 {
                return Err(RagError::InvalidConfig(format!("retrieval.{name} must be a non-negative number, got {w}")));
            }
        }
        if !self.rrf_constant.is_finite() || self.rrf_constant < 0.0 {
            return Err(RagError::InvalidConfig(format!(
                "retrieval.rrf_constant must be non-negative, got {}",
                self.rrf_constant
            )));
        }
        if self.search_timeout_ms == 0 {
            return Err(RagError::InvalidConfig("retrieval.search_timeout_ms must be positive".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Base URL of an OpenAI-compatible API (the `/chat/completions` suffix is appended).
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Environment variable consulted when `api_key` is unset.
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub temperature: f32,
    pub max_tokens: usize,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_key: None,
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_secs: 60,
            temperature: 0.0,
            max_tokens: 1024,
        }
    }
}

impl LlmSettings {
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| env::var(&self.api_key_env).ok())
            .filter(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    pub history_turns: usize,
    pub max_turns: usize,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self { history_turns: 5, max_turns: 10 }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_deployment() {
        let s = Settings::default();
        assert_eq!(s.retrieval.dense_k, 3);
        assert_eq!(s.retrieval.sparse_k, 3);
        assert_eq!(s.retrieval.fused_k(), 6);
        assert!((s.retrieval.dense_weight - 0.5).abs() < f32::EPSILON);
        assert_eq!(s.chat.history_turns, 5);
        assert_eq!(s.chat.max_turns, 10);
        s.validate().expect("defaults are valid");
    }

    #[test]
    fn figment_layers_override_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[retrieval]\ndense_k = 4\nfused_k = 5\n")?;
            jail.set_env("APP_RETRIEVAL__SPARSE_WEIGHT", "0.25");
            let figment = Figment::from(Serialized::defaults(Settings::default()))
                .merge(Toml::file("config.toml"))
                .merge(Env::prefixed("APP_").split("__"));
            let settings = Config::from_figment(figment).settings().expect("settings");
            assert_eq!(settings.retrieval.dense_k, 4);
            assert_eq!(settings.retrieval.sparse_k, 3);
            assert_eq!(settings.retrieval.fused_k(), 5);
            assert!((settings.retrieval.sparse_weight - 0.25).abs() < f32::EPSILON);
            Ok(())
        });
    }

    #[test]
    fn negative_weight_is_rejected() {
        let mut s = Settings::default();
        s.retrieval.dense_weight = -1.0;
        assert!(matches!(s.validate(), Err(RagError::InvalidConfig(_))));
    }

    #[test]
    fn relative_paths_resolve_against_base() {
        let base = Path::new("/srv/revqa");
        assert_eq!(resolve_with_base(base, "data/x.json"), PathBuf::from("/srv/revqa/data/x.json"));
        assert_eq!(resolve_with_base(base, "/abs/x.json"), PathBuf::from("/abs/x.json"));
    }
}
