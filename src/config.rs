use std::env;

/// Which [`crate::database::Store`] implementation backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Local directory for stored objects.
    pub dir: String,
    /// Remote bucket endpoint; takes precedence over `dir` when set.
    pub remote_url: Option<String>,
    pub remote_token: Option<String>,
    /// Base used when building signed file URLs.
    pub public_base_url: String,
    pub signed_url_ttl_secs: i64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
    pub application_ttl_days: i64,
    pub production: bool,
}

const DEFAULT_SIGNED_URL_TTL_SECS: i64 = 900;
const DEFAULT_APPLICATION_TTL_DAYS: i64 = 10;

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> Result<T, String> {
    match optional(name) {
        Some(raw) => raw
            .parse()
            .map_err(|_| format!("{} must be a number, got '{}'", name, raw)),
        None => Ok(default),
    }
}

impl AppConfig {
    /// Reads the configuration from the environment (after `dotenv`).
    pub fn from_env() -> Result<Self, String> {
        let host = optional("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or("PORT", 3002u16)?;

        let store_backend = match optional("STORE_BACKEND").as_deref() {
            None | Some("mongo") | Some("mongodb") => StoreBackend::Mongo,
            Some("memory") => StoreBackend::Memory,
            Some(other) => return Err(format!("Unknown STORE_BACKEND '{}'", other)),
        };

        let database_url = optional("DATABASE_URL");
        if store_backend == StoreBackend::Mongo && database_url.is_none() {
            return Err("DATABASE_URL must be set".to_string());
        }

        let jwt = JwtConfig {
            secret: optional("JWT_SECRET").ok_or("JWT_SECRET must be set")?,
            issuer: optional("JWT_ISSUER"),
            audience: optional("JWT_AUDIENCE"),
        };

        let public_base_url = optional("PUBLIC_BASE_URL")
            .unwrap_or_else(|| format!("http://localhost:{}", port));

        let storage = StorageConfig {
            dir: optional("STORAGE_DIR").unwrap_or_else(|| "./uploads".to_string()),
            remote_url: optional("STORAGE_REMOTE_URL"),
            remote_token: optional("STORAGE_REMOTE_TOKEN"),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            signed_url_ttl_secs: parse_or("SIGNED_URL_TTL_SECS", DEFAULT_SIGNED_URL_TTL_SECS)?,
        };

        Ok(AppConfig {
            host,
            port,
            store_backend,
            database_url,
            jwt,
            storage,
            application_ttl_days: parse_or("APPLICATION_TTL_DAYS", DEFAULT_APPLICATION_TTL_DAYS)?,
            production: optional("APP_ENV").as_deref() == Some("production"),
        })
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        AppConfig {
            host: "127.0.0.1".into(),
            port: 3002,
            store_backend: StoreBackend::Memory,
            database_url: None,
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: Some("venture-auth".into()),
                audience: Some("venture-registry".into()),
            },
            storage: StorageConfig {
                dir: std::env::temp_dir().to_string_lossy().into_owned(),
                remote_url: None,
                remote_token: None,
                public_base_url: "http://localhost:3002".into(),
                signed_url_ttl_secs: DEFAULT_SIGNED_URL_TTL_SECS,
            },
            application_ttl_days: DEFAULT_APPLICATION_TTL_DAYS,
            production: false,
        }
    }
}
