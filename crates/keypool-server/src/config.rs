use keypool_core::Provider;
use keypool_core::http::HttpConfig;
use keypool_core::paths;
use keypool_core::providers::ProviderEndpoints;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: Option<PathBuf>,
    pub admin_token: Option<String>,
    pub cors_origins: Vec<String>,
    pub endpoints: ProviderEndpoints,
}

#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    server: ServerSection,
    #[serde(default)]
    storage: StorageSection,
    #[serde(default)]
    auth: AuthSection,
    #[serde(default)]
    cors: CorsSection,
    #[serde(default)]
    providers: ProvidersSection,
}

#[derive(Debug, Deserialize)]
struct ServerSection {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct StorageSection {
    #[serde(default)]
    db_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct AuthSection {
    #[serde(default)]
    admin_token: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct CorsSection {
    #[serde(default)]
    origins: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ProvidersSection {
    deepseek_base_url: Option<String>,
    openai_base_url: Option<String>,
    volcengine_base_url: Option<String>,
    qwen_base_url: Option<String>,
    siliconflow_base_url: Option<String>,
}

impl ProvidersSection {
    fn base_url(&self, provider: Provider) -> Option<&String> {
        match provider {
            Provider::DeepSeek => self.deepseek_base_url.as_ref(),
            Provider::OpenAI => self.openai_base_url.as_ref(),
            Provider::Volcengine => self.volcengine_base_url.as_ref(),
            Provider::Qwen => self.qwen_base_url.as_ref(),
            Provider::SiliconFlow => self.siliconflow_base_url.as_ref(),
        }
    }

    fn endpoints(&self) -> ProviderEndpoints {
        Provider::ALL
            .into_iter()
            .fold(ProviderEndpoints::default(), |endpoints, provider| {
                match self.base_url(provider) {
                    Some(url) => endpoints.with_base_url(provider, url.as_str()),
                    None => endpoints,
                }
            })
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl ServerConfig {
    /// Read `KEYPOOL_SERVER_CONFIG` or `./server.toml` when present, else the environment.
    pub fn load() -> anyhow::Result<Self> {
        if let Some(file_config) = load_from_file()? {
            return Ok(Self::from_file(file_config));
        }

        Ok(Self::from_lookup(|name| env::var(name).ok()))
    }

    fn from_file(file_config: FileConfig) -> Self {
        Self {
            host: file_config.server.host,
            port: file_config.server.port,
            db_path: file_config.storage.db_path,
            admin_token: non_empty(file_config.auth.admin_token),
            cors_origins: file_config.cors.origins,
            endpoints: file_config.providers.endpoints(),
        }
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let host = non_empty(lookup("KEYPOOL_SERVER_HOST")).unwrap_or_else(default_host);
        let port = lookup("KEYPOOL_SERVER_PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or_else(default_port);
        let db_path = non_empty(lookup("KEYPOOL_DB_PATH")).map(PathBuf::from);
        let admin_token = non_empty(lookup("KEYPOOL_ADMIN_TOKEN"));
        let cors_origins = lookup("KEYPOOL_CORS_ORIGINS")
            .map(|value| {
                value
                    .split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let endpoints = Provider::ALL
            .into_iter()
            .fold(ProviderEndpoints::default(), |endpoints, provider| {
                let name = format!("KEYPOOL_{}_BASE_URL", provider.as_str().to_uppercase());
                match non_empty(lookup(&name)) {
                    Some(url) => endpoints.with_base_url(provider, url),
                    None => endpoints,
                }
            });

        Self {
            host,
            port,
            db_path,
            admin_token,
            cors_origins,
            endpoints,
        }
    }

    /// Configured database path, or `<data dir>/keypool.db`.
    pub fn database_path(&self) -> anyhow::Result<PathBuf> {
        match &self.db_path {
            Some(path) => Ok(path.clone()),
            None => paths::ensure_database_path(),
        }
    }

    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            host: self.host.clone(),
            port: self.port,
            cors_origins: self.cors_origins.clone(),
            admin_token: self.admin_token.clone(),
        }
    }
}

fn load_from_file() -> anyhow::Result<Option<FileConfig>> {
    let config_path = env::var("KEYPOOL_SERVER_CONFIG").ok();
    let path = if let Some(path) = config_path {
        Some(path)
    } else if Path::new("server.toml").exists() {
        Some("server.toml".to_string())
    } else {
        None
    };

    let Some(path) = path else {
        return Ok(None);
    };

    let contents = fs::read_to_string(&path)
        .map_err(|err| anyhow::anyhow!("Failed to read config {}: {}", path, err))?;
    parse_file_config(&contents)
        .map(Some)
        .map_err(|err| anyhow::anyhow!("Failed to parse config {}: {}", path, err))
}

fn parse_file_config(contents: &str) -> Result<FileConfig, toml::de::Error> {
    toml::from_str(contents)
}
