use crate::storage::{self, StorageManager};
use anyhow::{anyhow, bail, Context};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const CONFIG_FILE: &str = "config.yaml";

/// Environment variable that overrides `embedding.api_key`.
pub const API_KEY_ENV: &str = "BOOKSTORE_EMBEDDING_API_KEY";

const DEFAULT_LISTEN: &str = "0.0.0.0:8080";

/// BAAI/bge-small-en-v1.5 produces 384-dimensional vectors
const DEFAULT_HF_MODEL: &str = "BAAI/bge-small-en-v1.5";
const DEFAULT_HF_ENDPOINT: &str = "https://api-inference.huggingface.co/models/";
const DEFAULT_OPENAI_MODEL: &str = "text-embedding-3-small";
const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/embeddings";

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_INITIAL_BACKOFF_MS: u64 = 3000;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    HuggingFace,
    OpenAi,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogBackendKind {
    #[default]
    Csv,
    Json,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

fn default_listen() -> String {
    DEFAULT_LISTEN.to_string()
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub backend: CatalogBackendKind,
}

/// Configuration for the external embedding provider
#[derive(Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: ProviderKind,

    /// Bearer token. Left empty in the file when supplied through the environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model name; defaults depend on the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Endpoint override; defaults depend on the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Total attempts per embed call, counting the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry; doubles on each further retry
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl std::fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EmbeddingConfig {{ provider: {:?}, api_key: {}, model: {:?}, endpoint: {:?}, max_attempts: {}, initial_backoff_ms: {}, connect_timeout_secs: {}, request_timeout_secs: {} }}",
            self.provider,
            if self.api_key.is_some() { "[REDUCTED]" } else { "None" },
            self.model,
            self.endpoint,
            self.max_attempts,
            self.initial_backoff_ms,
            self.connect_timeout_secs,
            self.request_timeout_secs)
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            api_key: None,
            model: None,
            endpoint: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff_ms: DEFAULT_INITIAL_BACKOFF_MS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_initial_backoff_ms() -> u64 {
    DEFAULT_INITIAL_BACKOFF_MS
}

fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl EmbeddingConfig {
    pub fn model(&self) -> String {
        match (&self.model, self.provider) {
            (Some(model), _) => model.clone(),
            (None, ProviderKind::HuggingFace) => DEFAULT_HF_MODEL.to_string(),
            (None, ProviderKind::OpenAi) => DEFAULT_OPENAI_MODEL.to_string(),
        }
    }

    /// Hugging Face addresses the model through the url path, OpenAI through the body.
    pub fn endpoint(&self) -> String {
        match (&self.endpoint, self.provider) {
            (Some(endpoint), _) => endpoint.clone(),
            (None, ProviderKind::HuggingFace) => format!("{DEFAULT_HF_ENDPOINT}{}", self.model()),
            (None, ProviderKind::OpenAi) => DEFAULT_OPENAI_ENDPOINT.to_string(),
        }
    }

    /// Non-blank credential, if any.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default = "seed_on_startup")]
    pub seed_on_startup: bool,
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            catalog: CatalogConfig::default(),
            seed_on_startup: seed_on_startup(),
            embedding: EmbeddingConfig::default(),
            base_path: PathBuf::new(),
        }
    }
}

fn seed_on_startup() -> bool {
    true
}

/// Data directory: `BOOKSTORE_BASE_PATH` or `~/.local/share/bookstore`.
pub fn base_path() -> anyhow::Result<PathBuf> {
    if let Ok(path) = std::env::var("BOOKSTORE_BASE_PATH") {
        return Ok(PathBuf::from(path));
    }

    let home = homedir::my_home()?.ok_or_else(|| anyhow!("couldnt find home dir"))?;
    Ok(home.join(".local/share/bookstore"))
}

impl Config {
    fn validate(&self) -> anyhow::Result<()> {
        self.server
            .listen
            .parse::<std::net::SocketAddr>()
            .with_context(|| format!("server.listen is not a socket address: {}", self.server.listen))?;

        let emb = &self.embedding;
        if emb.max_attempts == 0 {
            bail!("embedding.max_attempts must be greater than 0");
        }
        if emb.connect_timeout_secs == 0 || emb.request_timeout_secs == 0 {
            bail!("embedding timeouts must be greater than 0");
        }

        let endpoint = emb.endpoint();
        url::Url::parse(&endpoint)
            .with_context(|| format!("embedding endpoint is not a valid url: {endpoint}"))?;

        Ok(())
    }

    pub fn load_with(base_path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let base_path = base_path.into();
        let store = storage::BackendLocal::new(&base_path)?;

        // create new if does not exist
        if !store.exists(CONFIG_FILE) {
            store.write(CONFIG_FILE, serde_yml::to_string(&Self::default())?.as_bytes())?;
        }

        let config_str =
            String::from_utf8(store.read(CONFIG_FILE)?).context("config file is not valid utf8")?;
        let mut config: Self = serde_yml::from_str(&config_str).context("config is malformed")?;

        config.base_path = base_path;

        config.validate()?;

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config)? {
            config.save()?;
        }

        if let Ok(key) = std::env::var(API_KEY_ENV) {
            config.embedding.api_key = Some(key);
        }

        Ok(config)
    }

    pub fn load() -> anyhow::Result<Self> {
        Self::load_with(base_path()?)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let store = storage::BackendLocal::new(&self.base_path)?;

        let config_str = serde_yml::to_string(&self)?;
        store.write(CONFIG_FILE, config_str.as_bytes())?;
        Ok(())
    }

    pub fn base_path(&self) -> &PathBuf {
        &self.base_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_written_on_first_load() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_with(dir.path()).unwrap();

        assert!(dir.path().join(CONFIG_FILE).exists());
        assert_eq!(config.server.listen, DEFAULT_LISTEN);
        assert_eq!(config.catalog.backend, CatalogBackendKind::Csv);
        assert_eq!(config.embedding.provider, ProviderKind::HuggingFace);
        assert_eq!(config.embedding.max_attempts, 3);
        assert_eq!(config.embedding.initial_backoff_ms, 3000);
        assert_eq!(config.embedding.connect_timeout_secs, 10);
        assert_eq!(config.embedding.request_timeout_secs, 30);
        assert!(config.seed_on_startup);
    }

    #[test]
    fn test_partial_config_is_filled_and_resaved() {
        let dir = tempfile::tempdir().unwrap();
        let store = storage::BackendLocal::new(dir.path()).unwrap();
        store
            .write(CONFIG_FILE, b"catalog:\n  backend: json\nembedding:\n  provider: openai\n")
            .unwrap();

        let config = Config::load_with(dir.path()).unwrap();
        assert_eq!(config.catalog.backend, CatalogBackendKind::Json);
        assert_eq!(config.embedding.provider, ProviderKind::OpenAi);
        assert_eq!(config.embedding.model(), DEFAULT_OPENAI_MODEL);
        assert_eq!(config.embedding.endpoint(), DEFAULT_OPENAI_ENDPOINT);

        let saved = String::from_utf8(store.read(CONFIG_FILE).unwrap()).unwrap();
        assert!(saved.contains("max_attempts"));
    }

    #[test]
    fn test_invalid_listen_address_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = storage::BackendLocal::new(dir.path()).unwrap();
        store
            .write(CONFIG_FILE, b"server:\n  listen: not-an-address\n")
            .unwrap();

        assert!(Config::load_with(dir.path()).is_err());
    }

    #[test]
    fn test_zero_attempts_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = storage::BackendLocal::new(dir.path()).unwrap();
        store
            .write(CONFIG_FILE, b"embedding:\n  max_attempts: 0\n")
            .unwrap();

        assert!(Config::load_with(dir.path()).is_err());
    }

    #[test]
    fn test_huggingface_endpoint_includes_model() {
        let emb = EmbeddingConfig::default();
        assert_eq!(
            emb.endpoint(),
            "https://api-inference.huggingface.co/models/BAAI/bge-small-en-v1.5"
        );
    }

    #[test]
    fn test_blank_api_key_counts_as_missing() {
        let emb = EmbeddingConfig {
            api_key: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(emb.api_key(), None);

        let emb = EmbeddingConfig {
            api_key: Some("hf_abc".to_string()),
            ..Default::default()
        };
        assert_eq!(emb.api_key(), Some("hf_abc"));
        assert!(!format!("{emb:?}").contains("hf_abc"));
    }
}
