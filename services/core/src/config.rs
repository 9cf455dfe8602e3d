//! Startup configuration.
//!
//! Per spec §9's redesign flag ("Global mutable state... becomes a
//! `Config` value constructed at startup and passed explicitly"), every
//! crate that needs deployment-specific knobs takes a `&Config` rather
//! than reading the environment itself.

use std::env;
use std::time::Duration;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    Disable,
    Prefer,
    Require,
}

impl TlsMode {
    fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "require" => TlsMode::Require,
            "disable" => TlsMode::Disable,
            _ => TlsMode::Prefer,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub tls_mode: TlsMode,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub algorithm: String,
    pub expiry_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub global_per_minute: u32,
    pub hot_calculation_per_minute: u32,
    pub csv_upload_per_hour: u32,
    pub wizard_submit_per_minute: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            global_per_minute: 200,
            hot_calculation_per_minute: 30,
            csv_upload_per_hour: 10,
            wizard_submit_per_minute: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CalculationProviderConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub credentials_path: Option<String>,
    pub dpi: u32,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub provider_api_key: Option<String>,
    pub from_address: String,
    pub smtp_host: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub url: Option<String>,
}

/// The full set of deployment switches, assembled once at process startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub broker: BrokerConfig,
    pub jwt: JwtConfig,
    pub rate_limits: RateLimitConfig,
    pub calculation_provider: CalculationProviderConfig,
    pub ocr: OcrConfig,
    pub email: EmailConfig,
    pub report_ttl_days: i64,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> AppResult<Self> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| AppError::Internal("DATABASE_URL is not set".into()))?;

        Ok(Self {
            database: DatabaseConfig {
                url: database_url,
                tls_mode: TlsMode::parse(&env_or("DATABASE_SSL_MODE", "prefer")),
                max_connections: env_or("DATABASE_MAX_CONNECTIONS", "30")
                    .parse()
                    .unwrap_or(30),
                min_connections: env_or("DATABASE_MIN_CONNECTIONS", "10")
                    .parse()
                    .unwrap_or(10),
                acquire_timeout: Duration::from_secs(
                    env_or("DATABASE_ACQUIRE_TIMEOUT_SECS", "10")
                        .parse()
                        .unwrap_or(10),
                ),
                idle_timeout: Duration::from_secs(3600),
            },
            broker: BrokerConfig {
                url: env_opt("BROKER_URL"),
            },
            jwt: JwtConfig {
                secret: env_or("JWT_SECRET", "dev-secret-change-me"),
                algorithm: env_or("JWT_ALGORITHM", "HS256"),
                expiry_minutes: env_or("JWT_EXPIRY_MINUTES", "30").parse().unwrap_or(30),
            },
            rate_limits: RateLimitConfig::default(),
            calculation_provider: CalculationProviderConfig {
                api_key: env_opt("CALCULATION_PROVIDER_API_KEY"),
                base_url: env_or(
                    "CALCULATION_PROVIDER_BASE_URL",
                    "https://api.emission-factors.example/v1",
                ),
                timeout: Duration::from_secs(10),
            },
            ocr: OcrConfig {
                credentials_path: env_opt("OCR_CREDENTIALS_PATH"),
                dpi: 200,
            },
            email: EmailConfig {
                provider_api_key: env_opt("EMAIL_PROVIDER_API_KEY"),
                from_address: env_or("EMAIL_FROM_ADDRESS", "no-reply@carbonledger.example"),
                smtp_host: env_opt("SMTP_HOST"),
            },
            report_ttl_days: env_or("REPORT_TTL_DAYS", "7").parse().unwrap_or(7),
        })
    }
}
