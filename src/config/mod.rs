use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub managed: ManagedConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

/// Connection settings for the managed backend (tables, object storage, auth).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagedConfig {
    pub url: Option<String>,
    #[serde(skip_serializing)]
    pub service_role_key: Option<String>,
    pub image_bucket: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
    pub static_images_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

const DEFAULT_IMAGE_BUCKET: &str = "patient_images";
const DEFAULT_PORT: u16 = 4000;

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Managed service
        if let Ok(v) = env::var("SUPABASE_URL") {
            self.managed.url = non_empty(v);
        }
        if let Some(key) = env::var("SUPABASE_SERVICE_ROLE_KEY")
            .ok()
            .and_then(non_empty)
            .or_else(|| env::var("SUPABASE_KEY").ok().and_then(non_empty))
        {
            self.managed.service_role_key = Some(key);
        }
        if let Ok(v) = env::var("PATIENT_IMAGE_BUCKET") {
            if !v.trim().is_empty() {
                self.managed.image_bucket = v.trim().to_string();
            }
        }
        if let Ok(v) = env::var("MANAGED_REQUEST_TIMEOUT_SECS") {
            self.managed.request_timeout_secs = v.parse().unwrap_or(self.managed.request_timeout_secs);
        }

        // API overrides
        if let Ok(v) = env::var("PORT") {
            self.api.port = v.parse().unwrap_or(self.api.port);
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }
        if let Ok(v) = env::var("STATIC_IMAGES_DIR") {
            self.api.static_images_dir = v;
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("ALLOWED_ORIGINS") {
            self.security.cors_origins = parse_origins(&v);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            managed: ManagedConfig::unconfigured(30),
            api: ApiConfig {
                port: DEFAULT_PORT,
                enable_request_logging: true,
                max_request_size_bytes: 16 * 1024 * 1024, // 16MB
                static_images_dir: "static_images".to_string(),
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: parse_origins("http://localhost:3000,http://localhost:3001,http://localhost:5173"),
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            managed: ManagedConfig::unconfigured(15),
            api: ApiConfig {
                port: DEFAULT_PORT,
                enable_request_logging: true,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
                static_images_dir: "static_images".to_string(),
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec![],
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            managed: ManagedConfig::unconfigured(10),
            api: ApiConfig {
                port: DEFAULT_PORT,
                enable_request_logging: false,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
                static_images_dir: "static_images".to_string(),
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec![],
            },
        }
    }

    /// Development defaults pointed at an explicit managed service endpoint.
    pub fn for_managed(url: impl Into<String>, service_role_key: impl Into<String>) -> Self {
        let mut config = Self::development();
        config.managed.url = Some(url.into());
        config.managed.service_role_key = Some(service_role_key.into());
        config
    }
}

impl ManagedConfig {
    fn unconfigured(request_timeout_secs: u64) -> Self {
        Self {
            url: None,
            service_role_key: None,
            image_bucket: DEFAULT_IMAGE_BUCKET.to_string(),
            request_timeout_secs,
        }
    }
}

fn non_empty(v: String) -> Option<String> {
    let trimmed = v.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}
