use crate::constants::*;
use crate::error::GroupingError;
use crate::organizer::{CollisionPolicy, KPolicy};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration loaded from settings.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub clustering: ClusteringConfig,
    #[serde(default)]
    pub organizer: OrganizerConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// `openai` or `ollama`
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_max_input_chars() -> usize {
    DEFAULT_MAX_INPUT_CHARS
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            url: None,
            model: None,
            api_key: None,
            dims: None,
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusteringConfig {
    #[serde(default = "default_clusters")]
    pub default_clusters: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default = "default_n_init")]
    pub n_init: usize,
    #[serde(default = "default_tolerance")]
    pub tolerance: f32,
    /// What to do when more clusters are requested than there are files
    #[serde(default)]
    pub k_policy: KPolicy,
}

fn default_clusters() -> usize {
    DEFAULT_CLUSTER_COUNT
}

fn default_seed() -> u64 {
    DEFAULT_KMEANS_SEED
}

fn default_max_iterations() -> usize {
    DEFAULT_KMEANS_MAX_ITERATIONS
}

fn default_n_init() -> usize {
    DEFAULT_KMEANS_N_INIT
}

fn default_tolerance() -> f32 {
    DEFAULT_KMEANS_TOLERANCE
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            default_clusters: DEFAULT_CLUSTER_COUNT,
            seed: DEFAULT_KMEANS_SEED,
            max_iterations: DEFAULT_KMEANS_MAX_ITERATIONS,
            n_init: DEFAULT_KMEANS_N_INIT,
            tolerance: DEFAULT_KMEANS_TOLERANCE,
            k_policy: KPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizerConfig {
    #[serde(default = "default_folder_prefix")]
    pub folder_prefix: String,
    #[serde(default)]
    pub collision: CollisionPolicy,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default = "default_min_files")]
    pub min_files: usize,
    #[serde(default)]
    pub skip_confirmation: bool,
    #[serde(default)]
    pub dry_run_default: bool,
}

fn default_folder_prefix() -> String {
    DEFAULT_FOLDER_PREFIX.to_string()
}

fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect()
}

fn default_min_files() -> usize {
    MIN_FILES_TO_CLUSTER
}

impl Default for OrganizerConfig {
    fn default() -> Self {
        Self {
            folder_prefix: default_folder_prefix(),
            collision: CollisionPolicy::default(),
            extensions: default_extensions(),
            min_files: MIN_FILES_TO_CLUSTER,
            skip_confirmation: false,
            dry_run_default: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    DEFAULT_SERVER_BIND.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// `pretty` or `json`; the environment variable wins when set
    #[serde(default)]
    pub format: Option<String>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default location or return defaults
    pub fn load() -> Result<Self> {
        let default_paths = [
            "config/settings.toml",
            "./config/settings.toml",
            "~/.config/cognigroup/settings.toml",
        ];

        for raw in default_paths {
            let path = PathBuf::from(shellexpand::tilde(raw).as_ref());
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load from an explicit path when given, otherwise from the default locations
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => {
                let expanded = PathBuf::from(shellexpand::tilde(&p.to_string_lossy()).as_ref());
                Self::from_file(expanded)
            }
            None => Self::load(),
        }
    }

    /// Get the embedding API key from config or environment variable
    pub fn embedding_api_key(&self) -> Option<String> {
        self.embedding
            .api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
    }

    fn validate(&self) -> Result<(), GroupingError> {
        let invalid = |msg: &str| Err(GroupingError::Config(msg.to_string()));

        if self.clustering.default_clusters == 0 {
            return invalid("clustering.default_clusters must be at least 1");
        }
        if self.clustering.n_init == 0 {
            return invalid("clustering.n_init must be at least 1");
        }
        if self.organizer.min_files < 2 {
            return invalid("organizer.min_files must be at least 2");
        }
        if self.embedding.max_input_chars == 0 {
            return invalid("embedding.max_input_chars must be greater than 0");
        }
        if self.organizer.folder_prefix.contains(['/', '\\']) {
            return invalid("organizer.folder_prefix must not contain path separators");
        }
        Ok(())
    }
}
