//! Configuration management for govbrief.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Built-in defaults
//! - Config files (.govbrief/config.yaml)
//! - Environment variables
//! - Command-line flags
//!
//! Later sources win. Every YAML section is optional and falls back to the
//! defaults defined here.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Providers the factory knows how to build.
pub const KNOWN_PROVIDERS: [&str; 3] = ["ollama", "openai", "scripted"];

/// Main application configuration.
///
/// Holds the global options plus one settings block per pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .govbrief/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Active generation provider ("ollama", "openai", "scripted")
    pub provider: String,

    /// Default model identifier
    pub model: String,

    /// API key for the generation provider
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Emit logs as JSON lines
    pub log_json: bool,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Generation provider configurations
    pub llm: Option<LlmConfig>,

    pub retrieval: RetrievalSettings,
    pub context: ContextSettings,
    pub generation: GenerationSettings,
    pub classifier: ClassifierSettings,
    pub news: NewsSettings,
    pub server: ServerSettings,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    /// Any OpenAI-compatible chat completions endpoint (OpenAI, Groq, ...)
    OpenAiCompat {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        endpoint: Option<String>,
        #[serde(rename = "organizationEnv")]
        organization_env: Option<String>,
    },
    /// Deterministic replay of canned responses
    Scripted {
        responses: Vec<String>,
        #[serde(rename = "chunkChars")]
        chunk_chars: Option<usize>,
    },
    Ollama {
        endpoint: String,
        model: String,
        timeout: Option<u64>,
    },
}

impl ProviderConfig {
    /// Model configured for this provider.
    pub fn model(&self) -> &str {
        match self {
            ProviderConfig::OpenAiCompat { model, .. } => model,
            ProviderConfig::Ollama { model, .. } => model,
            ProviderConfig::Scripted { .. } => "scripted",
        }
    }

    /// Custom endpoint, if the provider has one.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            ProviderConfig::OpenAiCompat { endpoint, .. } => endpoint.as_deref(),
            ProviderConfig::Ollama { endpoint, .. } => Some(endpoint.as_str()),
            ProviderConfig::Scripted { .. } => None,
        }
    }
}

/// Where passages come from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreSettings {
    /// JSONL passage file embedded in memory at startup
    Memory { path: Option<PathBuf> },
    /// Qdrant collection queried over REST
    Qdrant {
        url: String,
        collection: String,
        #[serde(rename = "apiKeyEnv")]
        api_key_env: Option<String>,
    },
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings::Memory { path: None }
    }
}

/// Embedding provider used to vectorise queries (and memory-store passages).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EmbeddingSettings {
    /// "trigram" or "ollama"
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
    pub endpoint: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            endpoint: None,
        }
    }
}

/// Retrieval adapter policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub timeout_secs: u64,
    pub retries: u32,
    pub max_concurrency: usize,
    pub store: StoreSettings,
    pub embedding: EmbeddingSettings,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            timeout_secs: 5,
            retries: 1,
            max_concurrency: 8,
            store: StoreSettings::default(),
            embedding: EmbeddingSettings::default(),
        }
    }
}

/// Context window budgets, in characters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ContextSettings {
    pub budget_chars: usize,
    pub passage_chars: usize,
    pub enrichment_chars: usize,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            budget_chars: 6000,
            passage_chars: 500,
            enrichment_chars: 1500,
        }
    }
}

/// Generation call policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationSettings {
    /// Bound on opening a completion stream
    pub timeout_secs: u64,
    /// Bound on the gap between two chunks
    pub chunk_timeout_secs: u64,
    /// Extra attempts after a report fails to parse
    pub report_retries: u32,
    pub max_concurrency: usize,
    pub temperature: f32,
    pub report_temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            chunk_timeout_secs: 30,
            report_retries: 2,
            max_concurrency: 4,
            temperature: 0.3,
            report_temperature: 0.2,
            max_tokens: 2000,
        }
    }
}

/// Query classifier policy.
///
/// The decision boundary is a heuristic, so the phrase lists and threshold
/// live in configuration rather than code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ClassifierSettings {
    /// Minimum confidence for a decision label to stand
    pub decision_threshold: f32,
    pub strong_decision: Vec<String>,
    pub moderate_decision: Vec<String>,
    pub exploratory: Vec<String>,
}

fn phrases(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            decision_threshold: 0.70,
            strong_decision: phrases(&[
                "should we",
                "should i",
                "should kenya",
                "should the",
                "recommend",
                "approval",
                "approve",
                "decide",
                "allocate",
                "reallocate",
                "fund",
                "defund",
                "implement",
                "adopt",
                "reject",
                "accept",
                "expand",
                "reduce",
                "increase",
                "decrease",
                "prioritize",
                "choose between",
                "select",
                "go ahead",
                "proceed with",
                "move forward",
            ]),
            moderate_decision: phrases(&[
                "policy",
                "budget",
                "funding",
                "investment",
                "program",
                "initiative",
                "project",
                "benefits",
                "costs",
                "trade-offs",
                "tradeoffs",
                "impact",
                "consequences",
                "effects",
                "options",
                "alternatives",
                "choices",
            ]),
            exploratory: phrases(&[
                "what is",
                "what are",
                "who is",
                "who are",
                "when did",
                "when was",
                "where is",
                "where are",
                "how does",
                "how do",
                "how did",
                "explain",
                "describe",
                "define",
                "tell me about",
                "history of",
                "background on",
                "overview of",
                "summarize",
                "summary of",
                "list",
                "show me",
            ]),
        }
    }
}

/// News enrichment source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct NewsSettings {
    pub enabled: bool,
    pub endpoint: String,
    /// Term appended to every news query to keep results on-topic
    pub region: Option<String>,
    pub lookback_days: u32,
    pub max_articles: usize,
    pub timeout_secs: u64,
}

impl Default for NewsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://api.gdeltproject.org/api/v2/doc/doc".to_string(),
            region: Some("kenya".to_string()),
            lookback_days: 7,
            max_articles: 10,
            timeout_secs: 5,
        }
    }
}

/// HTTP server binding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_origins: phrases(&["http://localhost:5173", "http://localhost:3000"]),
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    retrieval: Option<RetrievalSettings>,
    context: Option<ContextSettings>,
    generation: Option<GenerationSettings>,
    classifier: Option<ClassifierSettings>,
    news: Option<NewsSettings>,
    server: Option<ServerSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    json: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(), // Local-first default
            model: "llama3.2".to_string(),
            api_key: None,
            log_level: None,
            log_json: false,
            verbose: false,
            no_color: false,
            llm: None,
            retrieval: RetrievalSettings::default(),
            context: ContextSettings::default(),
            generation: GenerationSettings::default(),
            classifier: ClassifierSettings::default(),
            news: NewsSettings::default(),
            server: ServerSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML file and environment variables.
    ///
    /// Environment variables:
    /// - `GOVBRIEF_WORKSPACE`: Override workspace path
    /// - `GOVBRIEF_CONFIG`: Path to config file
    /// - `GOVBRIEF_PROVIDER`: Generation provider
    /// - `GOVBRIEF_MODEL`: Model identifier
    /// - `GOVBRIEF_API_KEY`: API key
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use govbrief_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_with(None, None)
    }

    /// Load configuration with an explicit workspace and config file.
    ///
    /// Both take precedence over `GOVBRIEF_WORKSPACE`/`GOVBRIEF_CONFIG` and
    /// are applied before the YAML file is located and read. An explicit
    /// config file must exist.
    pub fn load_with(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        let workspace = workspace.or_else(|| std::env::var_os("GOVBRIEF_WORKSPACE").map(PathBuf::from));
        if let Some(ref workspace) = workspace {
            config.workspace = workspace.clone();
        }

        config.config_file =
            config_file.or_else(|| std::env::var_os("GOVBRIEF_CONFIG").map(PathBuf::from));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.govbrief_dir().join("config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file does not exist: {:?}",
                config_path
            )));
        }

        // An explicit workspace wins over `workspace.path` in the file
        if let Some(workspace) = workspace {
            config.workspace = workspace;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("GOVBRIEF_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("GOVBRIEF_MODEL") {
            config.model = model;
        }

        config.api_key = std::env::var("GOVBRIEF_API_KEY").ok();
        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        self.merge_yaml_str(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config file {:?}: {}", path, e)))
    }

    fn merge_yaml_str(&self, contents: &str) -> AppResult<Self> {
        let config_file: ConfigFile = serde_yaml::from_str(contents)?;

        let mut result = self.clone();

        if let Some(ws) = config_file.workspace {
            if let Some(path) = ws.path {
                result.workspace = PathBuf::from(path);
            }
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(json) = logging.json {
                result.log_json = json;
            }
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();

            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = provider_config.model().to_string();
            }

            result.llm = Some(llm);
        }

        if let Some(retrieval) = config_file.retrieval {
            result.retrieval = retrieval;
        }
        if let Some(context) = config_file.context {
            result.context = context;
        }
        if let Some(generation) = config_file.generation {
            result.generation = generation;
        }
        if let Some(classifier) = config_file.classifier {
            result.classifier = classifier;
        }
        if let Some(news) = config_file.news {
            result.news = news;
        }
        if let Some(server) = config_file.server {
            result.server = server;
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over environment variables.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        log_json: bool,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if log_json {
            self.log_json = true;
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .govbrief directory.
    pub fn govbrief_dir(&self) -> PathBuf {
        self.workspace.join(".govbrief")
    }

    /// Passage file used by the memory store when none is configured.
    pub fn default_passages_path(&self) -> PathBuf {
        self.govbrief_dir().join("passages.jsonl")
    }

    /// Get the configuration block of a provider, if present.
    pub fn get_provider_config(&self, provider: &str) -> Option<ProviderConfig> {
        self.llm
            .as_ref()
            .and_then(|llm| llm.providers.get(provider).cloned())
    }

    /// Resolve API key from the explicit override or the provider's env var.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        match self.get_provider_config(provider) {
            Some(ProviderConfig::OpenAiCompat { api_key_env, .. }) => {
                std::env::var(&api_key_env).ok()
            }
            _ => None,
        }
    }

    /// Validate configuration for the active provider and pipeline budgets.
    pub fn validate(&self) -> AppResult<()> {
        let provider = &self.provider;

        // Named entries under llm.providers are resolved by their shape
        if self.get_provider_config(provider).is_none()
            && !KNOWN_PROVIDERS.contains(&provider.as_str())
        {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if let Some(ProviderConfig::OpenAiCompat { api_key_env, .. }) =
            self.get_provider_config(provider)
        {
            if self.api_key.is_none() && std::env::var(&api_key_env).is_err() {
                return Err(AppError::Config(format!(
                    "API key not found in environment variable: {}",
                    api_key_env
                )));
            }
        }

        if self.retrieval.top_k == 0 {
            return Err(AppError::Config("retrieval.topK must be at least 1".to_string()));
        }

        if self.retrieval.max_concurrency == 0 || self.generation.max_concurrency == 0 {
            return Err(AppError::Config(
                "maxConcurrency must be at least 1".to_string(),
            ));
        }

        if self.context.budget_chars == 0 || self.context.passage_chars == 0 {
            return Err(AppError::Config(
                "context budgets must be greater than zero".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.classifier.decision_threshold) {
            return Err(AppError::Config(format!(
                "classifier.decisionThreshold must be within [0, 1], got {}",
                self.classifier.decision_threshold
            )));
        }

        Ok(())
    }
}
