/// Constants used throughout cognigroup
/// This module centralizes default values so config, CLI and server agree

/// File extensions discovered by default (lower-case, without the dot)
pub const DEFAULT_EXTENSIONS: &[&str] = &["pdf", "docx", "txt"];

/// Default number of clusters requested when the caller gives none
pub const DEFAULT_CLUSTER_COUNT: usize = 5;

/// Fewer valid files than this aborts the run before clustering
pub const MIN_FILES_TO_CLUSTER: usize = 2;

/// Prefix of the directories files are moved into (`cluster_0`, `cluster_1`, ...)
pub const DEFAULT_FOLDER_PREFIX: &str = "cluster_";

/// Input is cut to this many characters before it is sent for embedding
pub const DEFAULT_MAX_INPUT_CHARS: usize = 8192;

/// Seed of the k-means random number generator
pub const DEFAULT_KMEANS_SEED: u64 = 42;

/// Upper bound of Lloyd iterations per k-means run
pub const DEFAULT_KMEANS_MAX_ITERATIONS: usize = 300;

/// Number of k-means restarts; the lowest-inertia run wins
pub const DEFAULT_KMEANS_N_INIT: usize = 10;

/// Centroid shift under which a k-means run is considered converged
pub const DEFAULT_KMEANS_TOLERANCE: f32 = 1e-4;

/// OpenAI-compatible embeddings endpoint
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_OPENAI_DIMS: usize = 1536;

/// Ollama endpoint for local embeddings
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "nomic-embed-text";
pub const DEFAULT_OLLAMA_DIMS: usize = 768;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Address the HTTP server binds to
pub const DEFAULT_SERVER_BIND: &str = "127.0.0.1:8000";

/// Maximum decompressed bytes read from `word/document.xml` (zip-bomb guard)
pub const MAX_DOCX_XML_BYTES: u64 = 50 * 1024 * 1024;

/// Environment variable holding the embedding API key
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Environment variable selecting the log format (`json` or `pretty`)
pub const LOG_FORMAT_ENV: &str = "COGNIGROUP_LOG_FORMAT";
