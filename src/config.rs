//! Configuration module for the document QA service.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//! - CLI argument overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `DOCQA_` and use double
//! underscores to separate nested levels:
//! - `DOCQA_GENERATION__MODEL=llama3` sets `generation.model`
//! - `DOCQA_SERVER__BIND=0.0.0.0:8000` sets `server.bind`
//! - `DOCQA_CHUNKING__CHUNK_SIZE=1000` sets `chunking.chunk_size`

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::documents::ChunkingConfig;

/// Directory holding the settings file and, by default, the index.
pub const CONFIG_DIR: &str = ".docqa";
const CONFIG_FILE: &str = "settings.toml";
const ENV_PREFIX: &str = "DOCQA_";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Directory holding the persisted collection
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    /// Workspace root directory (where .docqa is located)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,

    /// Name of the single collection
    #[serde(default = "default_collection")]
    pub collection: String,

    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub extract: ExtractConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RetrievalConfig {
    /// Default `k` for search
    #[serde(default = "default_search_k")]
    pub search_k: usize,

    /// Default `k` for ask
    #[serde(default = "default_ask_k")]
    pub ask_k: usize,

    /// Default sampling temperature for ask
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Display length of search snippets
    #[serde(default = "default_snippet_chars")]
    pub snippet_chars: usize,

    /// Display length of snippets returned with answers
    #[serde(default = "default_answer_snippet_chars")]
    pub answer_snippet_chars: usize,

    /// Default cap on the document listing
    #[serde(default = "default_documents_limit")]
    pub documents_limit: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EmbeddingConfig {
    /// fastembed model name, or "hashing" for the offline embedder
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Model download cache (defaults to the user cache directory)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct GenerationConfig {
    /// Ollama-compatible generate endpoint
    #[serde(default = "default_generation_url")]
    pub url: String,

    #[serde(default = "default_generation_model")]
    pub model: String,

    /// Per-call timeout; there are no retries
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ExtractConfig {
    /// OCR executable invoked as `<cmd> stdin stdout`
    #[serde(default = "default_ocr_command")]
    pub ocr_command: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Directory with the browser UI, served under /app
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Allowed CORS origins; "*" allows any
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

/// Log levels: `default` applies everywhere, `modules` overrides per target.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub default: String,

    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_index_path() -> PathBuf {
    PathBuf::from(CONFIG_DIR).join("index")
}
fn default_collection() -> String {
    "docs".to_string()
}
fn default_search_k() -> usize {
    5
}
fn default_ask_k() -> usize {
    4
}
fn default_temperature() -> f32 {
    0.1
}
fn default_snippet_chars() -> usize {
    400
}
fn default_answer_snippet_chars() -> usize {
    120
}
fn default_documents_limit() -> usize {
    100
}
fn default_embedding_model() -> String {
    "AllMiniLML6V2".to_string()
}
fn default_generation_url() -> String {
    "http://localhost:11434/api/generate".to_string()
}
fn default_generation_model() -> String {
    "gpt-oss:20b-cloud".to_string()
}
fn default_generation_timeout() -> u64 {
    100
}
fn default_ocr_command() -> String {
    "tesseract".to_string()
}
fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}
fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}
fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}
fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            index_path: default_index_path(),
            workspace_root: None,
            collection: default_collection(),
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            embedding: EmbeddingConfig::default(),
            generation: GenerationConfig::default(),
            extract: ExtractConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            search_k: default_search_k(),
            ask_k: default_ask_k(),
            temperature: default_temperature(),
            snippet_chars: default_snippet_chars(),
            answer_snippet_chars: default_answer_snippet_chars(),
            documents_limit: default_documents_limit(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            cache_dir: None,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            url: default_generation_url(),
            model: default_generation_model(),
            timeout_secs: default_generation_timeout(),
        }
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            ocr_command: default_ocr_command(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            static_dir: default_static_dir(),
            max_upload_bytes: default_max_upload_bytes(),
            cors_origins: default_cors_origins(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        // Try to find the workspace root by looking for .docqa directory
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));

        Self::figment(&config_path)
            .extract()
            .map_err(Box::new)
            .map(|mut settings: Settings| {
                // If workspace_root is not set in config, detect it
                if settings.workspace_root.is_none() {
                    settings.workspace_root = Self::workspace_root();
                }
                settings
            })
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Self::figment(path.as_ref()).extract().map_err(Box::new)
    }

    fn figment(config_path: &Path) -> Figment {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(config_path))
            // Double underscore separates nested levels, single underscore
            // stays within field names
            .merge(Env::prefixed(ENV_PREFIX).map(|key| {
                key.as_str()
                    .to_lowercase()
                    .replace("__", ".")
                    .into()
            }))
    }

    /// Find the workspace settings file by looking for a .docqa directory
    /// from the current directory up to the root
    fn find_workspace_config() -> Option<PathBuf> {
        Self::workspace_root().map(|root| root.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Get the workspace root directory (where .docqa is located)
    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .find(|ancestor| ancestor.join(CONFIG_DIR).is_dir())
            .map(Path::to_path_buf)
    }

    /// Index directory, resolved against the workspace root when relative.
    pub fn index_dir(&self) -> PathBuf {
        match &self.workspace_root {
            Some(root) if self.index_path.is_relative() => root.join(&self.index_path),
            _ => self.index_path.clone(),
        }
    }

    /// Static UI directory, resolved against the workspace root when relative.
    pub fn static_dir(&self) -> PathBuf {
        match &self.workspace_root {
            Some(root) if self.server.static_dir.is_relative() => {
                root.join(&self.server.static_dir)
            }
            _ => self.server.static_dir.clone(),
        }
    }

    /// Check values figment cannot validate by type alone.
    pub fn validate(&self) -> Result<(), String> {
        self.chunking.validate()?;
        if self.collection.trim().is_empty() {
            return Err("collection name must not be empty".to_string());
        }
        if self.retrieval.search_k == 0 || self.retrieval.ask_k == 0 {
            return Err("retrieval.search_k and retrieval.ask_k must be at least 1".to_string());
        }
        if self.generation.timeout_secs == 0 {
            return Err("generation.timeout_secs must be at least 1".to_string());
        }
        Ok(())
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file in the current directory
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let current_dir = std::env::current_dir()?;
        Self::init_config_file_in(&current_dir, force)
    }

    /// Create a default settings file under `root`
    pub fn init_config_file_in(
        root: &Path,
        force: bool,
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = root.join(CONFIG_DIR).join(CONFIG_FILE);

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        // The workspace root is rediscovered on load, keep the file portable
        Settings::default().save(&config_path)?;
        Ok(config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.version, 1);
        assert_eq!(settings.index_path, PathBuf::from(".docqa/index"));
        assert_eq!(settings.collection, "docs");
        assert_eq!(settings.chunking.chunk_size, 1800);
        assert_eq!(settings.chunking.overlap, 200);
        assert_eq!(settings.retrieval.search_k, 5);
        assert_eq!(settings.retrieval.ask_k, 4);
        assert_eq!(settings.generation.timeout_secs, 100);
        assert_eq!(settings.generation.model, "gpt-oss:20b-cloud");
        assert_eq!(settings.server.max_upload_bytes, 50 * 1024 * 1024);
        assert_eq!(settings.logging.default, "warn");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        let toml_content = r#"
collection = "manuals"

[chunking]
chunk_size = 500
overlap = 50

[generation]
model = "llama3"
timeout_secs = 30

[server]
cors_origins = ["http://localhost:3000"]

[logging.modules]
rag = "debug"
"#;

        fs::write(&config_path, toml_content).unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.collection, "manuals");
        assert_eq!(settings.chunking.chunk_size, 500);
        assert_eq!(settings.chunking.overlap, 50);
        assert_eq!(settings.generation.model, "llama3");
        assert_eq!(settings.generation.timeout_secs, 30);
        // Untouched keys keep their defaults
        assert_eq!(settings.generation.url, "http://localhost:11434/api/generate");
        assert_eq!(settings.server.cors_origins, vec!["http://localhost:3000"]);
        assert_eq!(settings.logging.modules["rag"], "debug");
        assert_eq!(settings.retrieval.ask_k, 4);
    }

    #[test]
    fn test_save_settings() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("settings.toml");

        let mut settings = Settings::default();
        settings.retrieval.search_k = 9;
        settings.embedding.model = "hashing".to_string();

        settings.save(&config_path).unwrap();

        let loaded = Settings::load_from(&config_path).unwrap();
        assert_eq!(loaded.retrieval.search_k, 9);
        assert_eq!(loaded.embedding.model, "hashing");
    }

    #[test]
    fn test_init_refuses_overwrite_without_force() {
        let temp_dir = TempDir::new().unwrap();

        let path = Settings::init_config_file_in(temp_dir.path(), false).unwrap();
        assert!(path.ends_with(".docqa/settings.toml"));
        assert!(Settings::init_config_file_in(temp_dir.path(), false).is_err());
        assert!(Settings::init_config_file_in(temp_dir.path(), true).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_chunking() {
        let mut settings = Settings::default();
        settings.chunking.overlap = settings.chunking.chunk_size;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.retrieval.ask_k = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_index_dir_resolution() {
        let mut settings = Settings {
            workspace_root: Some(PathBuf::from("/work")),
            ..Default::default()
        };
        assert_eq!(settings.index_dir(), PathBuf::from("/work/.docqa/index"));

        settings.index_path = PathBuf::from("/var/lib/docqa");
        assert_eq!(settings.index_dir(), PathBuf::from("/var/lib/docqa"));
    }
}
