//! Configuration - one explicit value built at startup
//!
//! Defaults are overlaid with environment variables (a `.env` file is loaded
//! by the binary through `dotenv`) and finally with command-line flags. The
//! resulting [`AppConfig`] is passed by reference to every component that
//! needs it; nothing reads process-wide state after startup.

use crate::error::{AskDbError, Result};
use sqlx::postgres::PgConnectOptions;
use std::str::FromStr;

/// Tables the prompt is scoped to when nothing else is configured.
pub const DEFAULT_TABLES: &[&str] = &["users", "visit", "conveyance"];

/// Connection parameters shared by schema introspection and query execution.
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: Option<String>,
    /// Full connection URL; takes precedence over the individual fields.
    pub url: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "postgres".to_string(),
            user: "postgres".to_string(),
            password: None,
            url: None,
        }
    }
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        if let Some(url) = &self.url {
            return PgConnectOptions::from_str(url)
                .map_err(|e| AskDbError::Config(format!("Invalid DATABASE_URL: {}", e)));
        }

        let mut options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.dbname)
            .username(&self.user);
        if let Some(password) = &self.password {
            options = options.password(password);
        }
        Ok(options)
    }

    /// Connection target without credentials, safe to log.
    pub fn display_target(&self) -> String {
        match &self.url {
            Some(url) => url.split('@').nth(1).unwrap_or("database").to_string(),
            None => format!("{}:{}/{}", self.host, self.port, self.dbname),
        }
    }
}

/// Sampling and runtime parameters of the completion model, fixed at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub model_path: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub n_ctx: u32,
    pub n_gpu_layers: u32,
    pub n_threads: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_path: "models/sqlcoder-7b.Q4_K_M.gguf".to_string(),
            temperature: 0.2,
            max_tokens: 512,
            top_p: 0.95,
            n_ctx: 10048,
            n_gpu_layers: 10,
            n_threads: 4,
        }
    }
}

impl ModelConfig {
    /// Launch arguments for a llama.cpp server hosting this model.
    ///
    /// Context size, GPU offload and thread count are load-time settings of
    /// the model, so they live on the server command line rather than in
    /// each completion request.
    pub fn server_args(&self) -> Vec<String> {
        vec![
            "-m".to_string(),
            self.model_path.clone(),
            "-c".to_string(),
            self.n_ctx.to_string(),
            "-ngl".to_string(),
            self.n_gpu_layers.to_string(),
            "-t".to_string(),
            self.n_threads.to_string(),
            "-n".to_string(),
            self.max_tokens.to_string(),
        ]
    }
}

/// Which completion backend to talk to.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderConfig {
    /// A llama.cpp server hosting the local GGUF model.
    LlamaCpp { base_url: String },
    /// Any OpenAI-compatible chat completions endpoint.
    OpenAi {
        api_key: String,
        model: String,
        base_url: String,
    },
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig::LlamaCpp {
            base_url: "http://localhost:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub model: ModelConfig,
    pub provider: ProviderConfig,
    /// Tables the schema description is restricted to; empty means all of `public`.
    pub tables: Vec<String>,
    /// Enables the parser-backed gate on top of the SELECT prefix check.
    pub strict: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            model: ModelConfig::default(),
            provider: ProviderConfig::default(),
            tables: DEFAULT_TABLES.iter().map(|t| t.to_string()).collect(),
            strict: false,
        }
    }
}

impl AppConfig {
    /// Build from defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from defaults overlaid with whatever `lookup` returns.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        let db = &mut config.database;
        if let Some(host) = lookup("PGHOST") {
            db.host = host;
        }
        db.port = parse_var(&lookup, "PGPORT", db.port)?;
        if let Some(dbname) = lookup("PGDATABASE") {
            db.dbname = dbname;
        }
        if let Some(user) = lookup("PGUSER") {
            db.user = user;
        }
        db.password = lookup("PGPASSWORD").or(db.password.take());
        db.url = lookup("DATABASE_URL").filter(|u| !u.trim().is_empty());

        let model = &mut config.model;
        if let Some(path) = lookup("ASKDB_MODEL_PATH") {
            model.model_path = path;
        }
        model.temperature = parse_var(&lookup, "ASKDB_TEMPERATURE", model.temperature)?;
        model.max_tokens = parse_var(&lookup, "ASKDB_MAX_TOKENS", model.max_tokens)?;
        model.top_p = parse_var(&lookup, "ASKDB_TOP_P", model.top_p)?;
        model.n_ctx = parse_var(&lookup, "ASKDB_N_CTX", model.n_ctx)?;
        model.n_gpu_layers = parse_var(&lookup, "ASKDB_GPU_LAYERS", model.n_gpu_layers)?;
        model.n_threads = parse_var(&lookup, "ASKDB_THREADS", model.n_threads)?;

        config.provider = match lookup("ASKDB_PROVIDER").as_deref().map(str::trim) {
            Some("openai") => ProviderConfig::OpenAi {
                api_key: lookup("OPENAI_API_KEY")
                    .filter(|k| !k.trim().is_empty())
                    .ok_or_else(|| {
                        AskDbError::Config(
                            "OpenAI provider needs --api-key or OPENAI_API_KEY".to_string(),
                        )
                    })?,
                model: lookup("OPENAI_MODEL").unwrap_or_else(|| "gpt-4".to_string()),
                base_url: lookup("OPENAI_BASE_URL")
                    .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            },
            None | Some("") | Some("llama") => match lookup("ASKDB_LLM_URL") {
                Some(base_url) => ProviderConfig::LlamaCpp { base_url },
                None => ProviderConfig::default(),
            },
            Some(other) => {
                return Err(AskDbError::Config(format!(
                    "Unknown ASKDB_PROVIDER '{}' (expected llama or openai)",
                    other
                )))
            }
        };

        if let Some(tables) = lookup("ASKDB_TABLES") {
            config.tables = split_tables(&tables);
        }
        if let Some(strict) = lookup("ASKDB_STRICT") {
            config.strict = matches!(strict.to_lowercase().as_str(), "1" | "true" | "yes");
        }

        Ok(config)
    }
}

/// Split a comma separated table list, dropping blanks.
pub fn split_tables(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AskDbError::Config(format!("Invalid {} '{}': {}", key, raw, e))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = AppConfig::from_lookup(|_| None).unwrap();

        assert_eq!(config, AppConfig::default());
        assert_eq!(config.tables, vec!["users", "visit", "conveyance"]);
        assert_eq!(config.model.max_tokens, 512);
        assert!(!config.strict);
    }

    #[test]
    fn test_environment_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("PGHOST", "db.internal"),
            ("PGPORT", "6543"),
            ("PGDATABASE", "crm"),
            ("PGUSER", "reader"),
            ("PGPASSWORD", "secret"),
            ("ASKDB_TABLES", "users, orders,,"),
            ("ASKDB_TEMPERATURE", "0.5"),
            ("ASKDB_LLM_URL", "http://gpu-box:8081"),
            ("ASKDB_STRICT", "true"),
        ]))
        .unwrap();

        assert_eq!(config.database.host, "db.internal");
        assert_eq!(config.database.port, 6543);
        assert_eq!(config.database.dbname, "crm");
        assert_eq!(config.database.password.as_deref(), Some("secret"));
        assert_eq!(config.tables, vec!["users", "orders"]);
        assert_eq!(config.model.temperature, 0.5);
        assert_eq!(
            config.provider,
            ProviderConfig::LlamaCpp {
                base_url: "http://gpu-box:8081".to_string()
            }
        );
        assert!(config.strict);
    }

    #[test]
    fn test_openai_provider_selection() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("ASKDB_PROVIDER", "openai"),
            ("OPENAI_API_KEY", "sk-test"),
        ]))
        .unwrap();

        match config.provider {
            ProviderConfig::OpenAi { api_key, model, base_url } => {
                assert_eq!(api_key, "sk-test");
                assert_eq!(model, "gpt-4");
                assert_eq!(base_url, "https://api.openai.com/v1");
            }
            other => panic!("expected OpenAI provider, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[("PGPORT", "not-a-port")])).unwrap_err();
        assert!(err.to_string().contains("PGPORT"));
    }

    #[test]
    fn test_openai_without_key_is_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[("ASKDB_PROVIDER", "openai")])).unwrap_err();
        assert!(matches!(err, AskDbError::Config(_)));
        assert!(err.to_string().contains("OPENAI_API_KEY"));

        let blank = AppConfig::from_lookup(lookup_from(&[
            ("ASKDB_PROVIDER", "openai"),
            ("OPENAI_API_KEY", "  "),
        ]));
        assert!(blank.is_err());
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[("ASKDB_PROVIDER", "bard")])).unwrap_err();
        assert!(err.to_string().contains("bard"));
    }

    #[test]
    fn test_key_alone_keeps_llama_provider() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("ASKDB_PROVIDER", "llama"),
        ]))
        .unwrap();
        assert_eq!(config.provider, ProviderConfig::default());
    }

    #[test]
    fn test_display_target_hides_credentials() {
        let db = DatabaseConfig {
            url: Some("postgres://reader:hunter2@db:5432/crm".to_string()),
            ..DatabaseConfig::default()
        };
        assert_eq!(db.display_target(), "db:5432/crm");
        assert!(db.connect_options().is_ok());

        let db = DatabaseConfig::default();
        assert_eq!(db.display_target(), "localhost:5432/postgres");
    }

    #[test]
    fn test_server_args() {
        let args = ModelConfig::default().server_args();
        assert_eq!(
            args,
            vec![
                "-m",
                "models/sqlcoder-7b.Q4_K_M.gguf",
                "-c",
                "10048",
                "-ngl",
                "10",
                "-t",
                "4",
                "-n",
                "512"
            ]
        );
    }
}
