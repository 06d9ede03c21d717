use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
///
/// Endpoints and secrets come from the environment (optionally a `.env`
/// file); tuning knobs come from an optional TOML file.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub context: ContextConfig,
    pub timeouts: TimeoutConfig,
    pub graph: GraphConfig,
    pub assistant: AssistantConfig,
    pub logging: LoggingConfig,
    pub search_tuning: SearchTuning,
    pub openai: OpenAiConfig,
    pub cosmos: CosmosConfig,
    /// `None` when any search variable is missing; search context is skipped.
    pub search: Option<SearchServiceConfig>,
}

/// Tuning file layout. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    server: ServerConfig,
    context: ContextConfig,
    timeouts: TimeoutConfig,
    graph: GraphConfig,
    assistant: AssistantConfig,
    logging: LoggingConfig,
    search: SearchTuning,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: Vec::new(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

/// Context assembly limits
#[derive(Debug, Clone, Deserialize)]
pub struct ContextConfig {
    /// Ceiling for the combined graph + search block, in characters.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    /// Prefix of each search document's content that is kept.
    #[serde(default = "default_search_content_chars")]
    pub search_content_chars: usize,
    #[serde(default = "default_search_top_n")]
    pub search_top_n: usize,
    /// How many recipes the generic "recipes" fallback lists.
    #[serde(default = "default_suggestion_limit")]
    pub suggestion_limit: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            search_content_chars: default_search_content_chars(),
            search_top_n: default_search_top_n(),
            suggestion_limit: default_suggestion_limit(),
        }
    }
}

fn default_max_chars() -> usize {
    2500
}

fn default_search_content_chars() -> usize {
    500
}

fn default_search_top_n() -> usize {
    5
}

fn default_suggestion_limit() -> usize {
    5
}

/// Per-call deadlines for outbound requests
#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_graph_secs")]
    pub graph_secs: u64,
    #[serde(default = "default_search_secs")]
    pub search_secs: u64,
    #[serde(default = "default_completion_secs")]
    pub completion_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            graph_secs: default_graph_secs(),
            search_secs: default_search_secs(),
            completion_secs: default_completion_secs(),
        }
    }
}

impl TimeoutConfig {
    pub fn graph(&self) -> Duration {
        Duration::from_secs(self.graph_secs)
    }

    pub fn search(&self) -> Duration {
        Duration::from_secs(self.search_secs)
    }

    pub fn completion(&self) -> Duration {
        Duration::from_secs(self.completion_secs)
    }
}

fn default_graph_secs() -> u64 {
    30
}

fn default_search_secs() -> u64 {
    15
}

fn default_completion_secs() -> u64 {
    60
}

/// Graph layout settings
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    /// Partition-key property name of the graph container (e.g. `/pk` -> `pk`).
    #[serde(default = "default_partition_key")]
    pub partition_key: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            partition_key: default_partition_key(),
        }
    }
}

fn default_partition_key() -> String {
    "pk".to_string()
}

/// Prompt and sampling settings
#[derive(Debug, Clone, Deserialize)]
pub struct AssistantConfig {
    #[serde(default = "default_site_name")]
    pub site_name: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_extraction_temperature")]
    pub extraction_temperature: f32,
    #[serde(default = "default_extraction_max_tokens")]
    pub extraction_max_tokens: u32,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            site_name: default_site_name(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            extraction_temperature: default_extraction_temperature(),
            extraction_max_tokens: default_extraction_max_tokens(),
        }
    }
}

fn default_site_name() -> String {
    "MadeWithNestle.ca".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    800
}

fn default_extraction_temperature() -> f32 {
    0.1
}

fn default_extraction_max_tokens() -> u32 {
    400
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Query options for the search index
#[derive(Debug, Clone, Deserialize)]
pub struct SearchTuning {
    #[serde(default = "default_search_api_version")]
    pub api_version: String,
    #[serde(default = "default_semantic_configuration")]
    pub semantic_configuration: String,
    #[serde(default = "default_query_language")]
    pub query_language: String,
}

impl Default for SearchTuning {
    fn default() -> Self {
        Self {
            api_version: default_search_api_version(),
            semantic_configuration: default_semantic_configuration(),
            query_language: default_query_language(),
        }
    }
}

fn default_search_api_version() -> String {
    "2023-07-01-Preview".to_string()
}

fn default_semantic_configuration() -> String {
    "default".to_string()
}

fn default_query_language() -> String {
    "en-us".to_string()
}

/// Azure OpenAI connection settings
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub endpoint: String,
    pub api_key: String,
    pub deployment: String,
    pub api_version: String,
}

/// Cosmos DB Gremlin connection settings
#[derive(Debug, Clone)]
pub struct CosmosConfig {
    pub endpoint: String,
    pub database: String,
    pub graph: String,
    pub key: String,
}

impl CosmosConfig {
    /// SASL username expected by the Gremlin endpoint.
    pub fn username(&self) -> String {
        format!("/dbs/{}/colls/{}", self.database, self.graph)
    }
}

/// Azure Cognitive Search connection settings
#[derive(Debug, Clone)]
pub struct SearchServiceConfig {
    pub endpoint: String,
    pub api_key: String,
    pub index: String,
}

const DEFAULT_OPENAI_API_VERSION: &str = "2024-02-01";

impl Config {
    /// Load configuration
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for the tuning file in this order:
    /// 1. Path specified in RECIPEBOT_CONFIG environment variable (must exist)
    /// 2. ./recipebot.toml in current directory (optional)
    pub fn load() -> Result<Self> {
        // Load .env file if it exists (ignore errors - file is optional)
        let _ = dotenv::dotenv();

        let file_text = match std::env::var("RECIPEBOT_CONFIG") {
            Ok(path) => Some(read_config_file(Path::new(&path))?),
            Err(_) => {
                let default_path = PathBuf::from("recipebot.toml");
                if default_path.exists() {
                    Some(read_config_file(&default_path)?)
                } else {
                    None
                }
            }
        };

        Self::from_sources(file_text.as_deref(), |key| std::env::var(key).ok())
    }

    /// Build configuration from tuning-file text and an environment lookup.
    pub fn from_sources<F>(file_text: Option<&str>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file: FileConfig = match file_text {
            Some(text) => toml::from_str(text).context("Failed to parse recipebot.toml")?,
            None => FileConfig::default(),
        };

        // Empty values count as unset, same as a missing variable.
        let var = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let openai = OpenAiConfig {
            endpoint: require(&var, "AZURE_OPENAI_ENDPOINT")?,
            api_key: require(&var, "AZURE_OPENAI_API_KEY")?,
            deployment: require(&var, "AZURE_OPENAI_DEPLOYMENT")?,
            api_version: var("AZURE_OPENAI_API_VERSION")
                .unwrap_or_else(|| DEFAULT_OPENAI_API_VERSION.to_string()),
        };

        let cosmos = CosmosConfig {
            endpoint: require(&var, "COSMOSDB_ENDPOINT")?,
            database: require(&var, "COSMOSDB_DATABASE")?,
            graph: require(&var, "COSMOSDB_GRAPH")?,
            key: require(&var, "COSMOSDB_KEY")?,
        };

        let search = match (
            var("AZURE_SEARCH_ENDPOINT"),
            var("AZURE_SEARCH_KEY"),
            var("AZURE_SEARCH_INDEX"),
        ) {
            (Some(endpoint), Some(api_key), Some(index)) => Some(SearchServiceConfig {
                endpoint,
                api_key,
                index,
            }),
            _ => None,
        };

        let mut server = file.server;
        if let Some(port) = var("PORT") {
            server.port = port
                .trim()
                .parse()
                .with_context(|| format!("PORT must be a valid port number, got '{}'", port))?;
        }

        let config = Config {
            server,
            context: file.context,
            timeouts: file.timeouts,
            graph: file.graph,
            assistant: file.assistant,
            logging: file.logging,
            search_tuning: file.search,
            openai,
            cosmos,
            search,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.context.max_chars == 0 {
            anyhow::bail!("context.max_chars must be greater than 0");
        }

        if self.context.search_top_n == 0 {
            anyhow::bail!("context.search_top_n must be greater than 0");
        }

        if self.graph.partition_key.trim().is_empty() {
            anyhow::bail!("graph.partition_key must not be empty");
        }

        for (name, value) in [
            ("assistant.temperature", self.assistant.temperature),
            ("assistant.extraction_temperature", self.assistant.extraction_temperature),
        ] {
            if !(0.0..=2.0).contains(&value) {
                anyhow::bail!("{} must be between 0.0 and 2.0", name);
            }
        }

        if self.timeouts.graph_secs == 0
            || self.timeouts.search_secs == 0
            || self.timeouts.completion_secs == 0
        {
            anyhow::bail!("timeouts must be greater than 0 seconds");
        }

        Ok(())
    }

    /// Whether the search index is configured.
    pub fn search_enabled(&self) -> bool {
        self.search.is_some()
    }
}

fn read_config_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))
}

fn require<F>(var: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    var(key).with_context(|| {
        format!(
            "Environment variable {} not set. Set it in your .env file or as an environment variable.",
            key
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serialize tests that mutate process-wide env so they don't race.
    static CONFIG_TEST_LOCK: Mutex<()> = Mutex::new(());

    fn required_env() -> HashMap<&'static str, String> {
        let mut env = HashMap::new();
        env.insert("AZURE_OPENAI_ENDPOINT", "https://example.openai.azure.com".to_string());
        env.insert("AZURE_OPENAI_API_KEY", "openai-key".to_string());
        env.insert("AZURE_OPENAI_DEPLOYMENT", "gpt-4o".to_string());
        env.insert("COSMOSDB_ENDPOINT", "wss://example.gremlin.cosmos.azure.com:443/".to_string());
        env.insert("COSMOSDB_DATABASE", "recipes-db".to_string());
        env.insert("COSMOSDB_GRAPH", "recipes".to_string());
        env.insert("COSMOSDB_KEY", "cosmos-key".to_string());
        env
    }

    fn load_with(file: Option<&str>, env: &HashMap<&'static str, String>) -> Result<Config> {
        Config::from_sources(file, |key| env.get(key).cloned())
    }

    #[test]
    fn test_config_defaults_without_file() {
        let config = load_with(None, &required_env()).unwrap();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.context.max_chars, 2500);
        assert_eq!(config.context.search_content_chars, 500);
        assert_eq!(config.context.search_top_n, 5);
        assert_eq!(config.graph.partition_key, "pk");
        assert_eq!(config.openai.api_version, "2024-02-01");
        assert_eq!(config.assistant.max_tokens, 800);
        assert!(!config.search_enabled());
    }

    #[test]
    fn test_config_missing_openai_variable() {
        let mut env = required_env();
        env.remove("AZURE_OPENAI_DEPLOYMENT");
        let err = load_with(None, &env).unwrap_err();
        assert!(err.to_string().contains("AZURE_OPENAI_DEPLOYMENT"));
    }

    #[test]
    fn test_config_missing_cosmos_variable() {
        let mut env = required_env();
        env.insert("COSMOSDB_KEY", "   ".to_string());
        let err = load_with(None, &env).unwrap_err();
        assert!(err.to_string().contains("COSMOSDB_KEY"));
    }

    #[test]
    fn test_config_search_requires_all_variables() {
        let mut env = required_env();
        env.insert("AZURE_SEARCH_ENDPOINT", "https://search.example.net".to_string());
        env.insert("AZURE_SEARCH_KEY", "search-key".to_string());
        let config = load_with(None, &env).unwrap();
        assert!(config.search.is_none());

        env.insert("AZURE_SEARCH_INDEX", "site-pages".to_string());
        let config = load_with(None, &env).unwrap();
        let search = config.search.unwrap();
        assert_eq!(search.index, "site-pages");
    }

    #[test]
    fn test_config_port_from_env() {
        let mut env = required_env();
        env.insert("PORT", "8088".to_string());
        let config = load_with(None, &env).unwrap();
        assert_eq!(config.server.port, 8088);

        env.insert("PORT", "not-a-port".to_string());
        assert!(load_with(None, &env).is_err());
    }

    #[test]
    fn test_config_file_overrides() {
        let file = r#"
[server]
port = 7000
allowed_origins = ["http://localhost:3000"]

[context]
max_chars = 1200

[graph]
partition_key = "category"

[assistant]
site_name = "Example Kitchen"
temperature = 0.5
"#;
        let config = load_with(Some(file), &required_env()).unwrap();
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.server.allowed_origins, vec!["http://localhost:3000"]);
        assert_eq!(config.context.max_chars, 1200);
        assert_eq!(config.context.search_top_n, 5);
        assert_eq!(config.graph.partition_key, "category");
        assert_eq!(config.assistant.site_name, "Example Kitchen");
        assert_eq!(config.timeouts.completion_secs, 60);
    }

    #[test]
    fn test_config_rejects_invalid_values() {
        let env = required_env();
        assert!(load_with(Some("[context]\nmax_chars = 0\n"), &env).is_err());
        assert!(load_with(Some("[assistant]\ntemperature = 3.5\n"), &env).is_err());
        assert!(load_with(Some("[timeouts]\ngraph_secs = 0\n"), &env).is_err());
        assert!(load_with(Some("[graph]\npartition_key = \"\"\n"), &env).is_err());
    }

    #[test]
    fn test_cosmos_username() {
        let config = load_with(None, &required_env()).unwrap();
        assert_eq!(config.cosmos.username(), "/dbs/recipes-db/colls/recipes");
    }

    #[test]
    fn test_config_load_from_file_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("recipebot.toml");
        fs::write(&config_path, "[context]\nsuggestion_limit = 3\n").unwrap();

        let originals: Vec<(String, Option<String>)> = required_env()
            .keys()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .chain(std::iter::once((
                "RECIPEBOT_CONFIG".to_string(),
                std::env::var("RECIPEBOT_CONFIG").ok(),
            )))
            .collect();

        for (key, value) in required_env() {
            std::env::set_var(key, value);
        }
        std::env::set_var("RECIPEBOT_CONFIG", config_path.to_str().unwrap());

        let config = Config::load();

        for (key, value) in originals {
            match value {
                Some(v) => std::env::set_var(&key, v),
                None => std::env::remove_var(&key),
            }
        }

        let config = config.expect("config should load from RECIPEBOT_CONFIG");
        assert_eq!(config.context.suggestion_limit, 3);
    }

    #[test]
    fn test_config_invalid_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let original = std::env::var("RECIPEBOT_CONFIG").ok();
        std::env::set_var("RECIPEBOT_CONFIG", "nonexistent.toml");
        let config = Config::load();
        assert!(config.is_err());
        std::env::remove_var("RECIPEBOT_CONFIG");
        if let Some(v) = original {
            std::env::set_var("RECIPEBOT_CONFIG", v);
        }
    }
}
