use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Memory,
    Postgres,
    Hosted,
}

impl BackendKind {
    pub fn as_str(&self) -> &str {
        match self {
            BackendKind::Memory => "memory",
            BackendKind::Postgres => "postgres",
            BackendKind::Hosted => "hosted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Some(BackendKind::Memory),
            "postgres" => Some(BackendKind::Postgres),
            "hosted" | "supabase" => Some(BackendKind::Hosted),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendKind,
    pub backend_url: Option<String>,
    pub backend_key: Option<String>,
    pub database_url: Option<String>,
    pub port: u16,
    pub locales_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::Memory,
            backend_url: None,
            backend_key: None,
            database_url: None,
            port: DEFAULT_PORT,
            locales_dir: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Reads a TOML file; environment variables still take precedence.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let mut config: Config = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.apply_env();
        Ok(config)
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::from_env()),
        }
    }

    fn apply_env(&mut self) {
        if let Some(kind) = std::env::var("SOLE_BACKEND")
            .ok()
            .and_then(|v| BackendKind::parse(&v))
        {
            self.backend = kind;
        }
        if let Ok(url) = std::env::var("SUPABASE_URL") {
            self.backend_url = Some(url);
        }
        if let Ok(key) = std::env::var("SUPABASE_ANON_KEY") {
            self.backend_key = Some(key);
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database_url = Some(url);
        }
        if let Some(port) = std::env::var("SOLE_PORT").ok().and_then(|p| p.parse().ok()) {
            self.port = port;
        }
        if let Ok(dir) = std::env::var("SOLE_LOCALES_DIR") {
            self.locales_dir = Some(PathBuf::from(dir));
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self.backend {
            BackendKind::Memory => Ok(()),
            BackendKind::Postgres => {
                if self.database_url.is_none() {
                    return Err(anyhow!("postgres backend requires DATABASE_URL"));
                }
                Ok(())
            }
            BackendKind::Hosted => {
                if self.backend_url.is_none() || self.backend_key.is_none() {
                    return Err(anyhow!(
                        "hosted backend requires SUPABASE_URL and SUPABASE_ANON_KEY"
                    ));
                }
                Ok(())
            }
        }
    }

    /// Backend URL with everything but the scheme and the last host label hidden.
    pub fn masked_backend_url(&self) -> Option<String> {
        self.backend_url.as_deref().map(|raw| match reqwest::Url::parse(raw) {
            Ok(url) => {
                let host = url.host_str().unwrap_or_default();
                let suffix = host.split_once('.').map(|(_, rest)| rest).unwrap_or(host);
                format!("{}://********.{}", url.scheme(), suffix)
            }
            Err(_) => "********".to_string(),
        })
    }

    pub fn masked_backend_key(&self) -> Option<String> {
        self.backend_key.as_deref().map(|key| {
            let prefix: String = key.chars().take(8).collect();
            format!("{}...", prefix)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!(BackendKind::parse("Postgres"), Some(BackendKind::Postgres));
        assert_eq!(BackendKind::parse("supabase"), Some(BackendKind::Hosted));
        assert_eq!(BackendKind::parse("sqlite"), None);
    }

    #[test]
    fn test_validate_hosted_requires_credentials() {
        let config = Config {
            backend: BackendKind::Hosted,
            backend_url: Some("https://abc.supabase.co".to_string()),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            backend_key: Some("anon".to_string()),
            ..config
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sole.toml");
        std::fs::write(
            &path,
            "backend = \"postgres\"\ndatabase_url = \"postgres://localhost/sole\"\nport = 8081\n",
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert!(config.database_url.is_some());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_masking() {
        let config = Config {
            backend_url: Some("https://abcdef.supabase.co".to_string()),
            backend_key: Some("eyJhbGciOiJIUzI1NiIs".to_string()),
            ..Config::default()
        };
        assert_eq!(
            config.masked_backend_url().unwrap(),
            "https://********.supabase.co"
        );
        assert_eq!(config.masked_backend_key().unwrap(), "eyJhbGci...");
    }
}
