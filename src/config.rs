use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub embedding: EmbeddingConfig,
    pub index: IndexConfig,
    pub search: SearchTuning,
    pub store: StoreConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub host: String,
    pub model: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Directory holding the segment log and metadata files.
    pub dir: String,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub chunk_size_chars: usize,
    pub chunk_overlap_chars: usize,
    /// File extensions treated as indexable text.
    pub extensions: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SearchTuning {
    pub mmr_lambda: f32,
    pub min_chunk_chars: usize,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// `log` or `qdrant` (the latter requires the `qdrant` build feature).
    pub backend: String,
    pub qdrant_url: String,
    pub qdrant_collection: String,
}

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("SEMVAULT_EMBED_HOST") {
            self.embedding.host = v;
        }
        if let Ok(v) = std::env::var("SEMVAULT_EMBED_MODEL") {
            self.embedding.model = v;
        }
        if let Ok(v) = std::env::var("SEMVAULT_INDEX_DIR") {
            self.index.dir = v;
        }
        if let Ok(v) = std::env::var("SEMVAULT_STORE_BACKEND") {
            self.store.backend = v;
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            embedding: EmbeddingConfig::default(),
            index: IndexConfig::default(),
            search: SearchTuning::default(),
            store: StoreConfig::default(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            host: "http://127.0.0.1:11434".into(),
            model: "embeddinggemma:300m".into(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dir: ".semvault".into(),
            include: Vec::new(),
            exclude: Vec::new(),
            chunk_size_chars: 2800,
            chunk_overlap_chars: 400,
            extensions: vec!["md".into(), "txt".into()],
        }
    }
}

impl Default for SearchTuning {
    fn default() -> Self {
        Self {
            mmr_lambda: 0.5,
            min_chunk_chars: 160,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: "log".into(),
            qdrant_url: "http://127.0.0.1:6334".into(),
            qdrant_collection: "semvault".into(),
        }
    }
}
