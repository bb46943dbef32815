use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub access: AccessConfig,
    pub security: SecurityConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub enable_query_logging: bool,
}

/// Query-shaping toggles for the accessible-set layer. These are presentation
/// concerns kept out of the authorization core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Treat every caller as area-breadth (unrestricted geographic sets).
    /// Used by trusted internal tooling, never the public API.
    pub force_area_breadth: bool,
    /// Hard cap on rows returned by accessible-set list endpoints.
    pub max_list_size: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
}

/// Outbound contact-list synchronization (Brevo / Sendinblue style API).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub enabled: bool,
    pub api_key: String,
    pub base_url: String,
    pub list_name: String,
    pub request_timeout_secs: u64,
}

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
        // Database overrides
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_ENABLE_QUERY_LOGGING") {
            self.database.enable_query_logging = v.parse().unwrap_or(self.database.enable_query_logging);
        }

        // Access overrides
        if let Ok(v) = env::var("ACCESS_FORCE_AREA_BREADTH") {
            self.access.force_area_breadth = v.parse().unwrap_or(self.access.force_area_breadth);
        }
        if let Ok(v) = env::var("ACCESS_MAX_LIST_SIZE") {
            self.access.max_list_size = v.parse().unwrap_or(self.access.max_list_size);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }

        // Contact-sync overrides
        if let Ok(v) = env::var("SYNC_ENABLED") {
            self.sync.enabled = v.parse().unwrap_or(self.sync.enabled);
        }
        if let Ok(v) = env::var("SYNC_API_KEY") {
            self.sync.api_key = v;
        }
        if let Ok(v) = env::var("SYNC_BASE_URL") {
            self.sync.base_url = v;
        }
        if let Ok(v) = env::var("SYNC_LIST_NAME") {
            self.sync.list_name = v;
        }
        if let Ok(v) = env::var("SYNC_REQUEST_TIMEOUT_SECS") {
            self.sync.request_timeout_secs = v.parse().unwrap_or(self.sync.request_timeout_secs);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                max_connections: 10,
                connection_timeout: 30,
                enable_query_logging: true,
            },
            access: AccessConfig {
                force_area_breadth: false,
                max_list_size: 1000,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:5173".to_string(),
                ],
                jwt_secret: "atlas-dev-secret".to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
            },
            sync: SyncConfig {
                enabled: false,
                api_key: String::new(),
                base_url: "https://api.brevo.com/v3".to_string(),
                list_name: "managers".to_string(),
                request_timeout_secs: 10,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                max_connections: 20,
                connection_timeout: 10,
                enable_query_logging: true,
            },
            access: AccessConfig {
                force_area_breadth: false,
                max_list_size: 500,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
                jwt_secret: String::new(), // must come from JWT_SECRET
                jwt_expiry_hours: 24,
            },
            sync: SyncConfig {
                enabled: false,
                api_key: String::new(),
                base_url: "https://api.brevo.com/v3".to_string(),
                list_name: "managers-staging".to_string(),
                request_timeout_secs: 10,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                max_connections: 50,
                connection_timeout: 5,
                enable_query_logging: false,
            },
            access: AccessConfig {
                force_area_breadth: false,
                max_list_size: 200,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
                jwt_secret: String::new(), // must come from JWT_SECRET
                jwt_expiry_hours: 4,
            },
            sync: SyncConfig {
                enabled: true,
                api_key: String::new(), // must come from SYNC_API_KEY
                base_url: "https://api.brevo.com/v3".to_string(),
                list_name: "managers".to_string(),
                request_timeout_secs: 10,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert!(!config.sync.enabled);
        assert_eq!(config.access.max_list_size, 1000);
        assert!(!config.security.jwt_secret.is_empty());
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(config.sync.enabled);
        assert_eq!(config.access.max_list_size, 200);
        // production never ships a baked-in secret
        assert!(config.security.jwt_secret.is_empty());
    }
}
