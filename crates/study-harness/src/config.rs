use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use study_harness_core::segment::WindowPolicy;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub images: ImagesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./data/study.sqlite")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_words")]
    pub max_words: usize,
    #[serde(default = "default_overlap_words")]
    pub overlap_words: usize,
    #[serde(default = "default_min_chunk_words")]
    pub min_chunk_words: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_words: default_max_words(),
            overlap_words: default_overlap_words(),
            min_chunk_words: default_min_chunk_words(),
        }
    }
}

fn default_max_words() -> usize {
    250
}
fn default_overlap_words() -> usize {
    30
}
fn default_min_chunk_words() -> usize {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContextConfig {
    #[serde(default = "default_max_history")]
    pub max_history: usize,
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
            max_context_tokens: default_max_context_tokens(),
        }
    }
}

fn default_max_history() -> usize {
    10
}
fn default_max_context_tokens() -> usize {
    4000
}

#[derive(Debug, Deserialize, Clone)]
pub struct ImagesConfig {
    /// Embedded images below this width × height product are ignored
    /// (decorative icons, bullets, logos).
    #[serde(default = "default_min_pixel_area")]
    pub min_pixel_area: u32,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            min_pixel_area: default_min_pixel_area(),
        }
    }
}

fn default_min_pixel_area() -> u32 {
    40_000
}

impl Config {
    /// Where the whole-file chunk corpus is persisted.
    pub fn chunks_path(&self) -> PathBuf {
        self.storage.data_dir.join("chunks.json")
    }

    /// Where extracted side images land.
    pub fn images_dir(&self) -> PathBuf {
        self.storage.data_dir.join("images")
    }

    /// Windowing parameters for the segmenter.
    pub fn window_policy(&self) -> WindowPolicy {
        WindowPolicy {
            max_words: self.chunking.max_words,
            overlap_words: self.chunking.overlap_words,
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.chunking.max_words == 0 {
        anyhow::bail!("chunking.max_words must be > 0");
    }
    if config.chunking.overlap_words >= config.chunking.max_words {
        anyhow::bail!("chunking.overlap_words must be smaller than chunking.max_words");
    }
    if config.retrieval.top_k == 0 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    if config.context.max_context_tokens == 0 {
        anyhow::bail!("context.max_context_tokens must be > 0");
    }

    Ok(config)
}
