// Centralized configuration management for the scholarship portal
// Load ALL env vars ONCE at startup

use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub cors_allowed_origins: Vec<String>,

    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub email: EmailConfig,
    pub payment: PaymentConfig,
    pub features: FeatureConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub rust_log: String,
}

/// Environment type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Environment {
    Development,
    Test,
    Staging,
    Production,
}

impl From<String> for Environment {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Environment::Development,
            "test" => Environment::Test,
            "staging" | "stage" => Environment::Staging,
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Staging => write!(f, "staging"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Which storage backend the service runs against
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl From<String> for StoreBackend {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "memory" | "in-memory" => StoreBackend::Memory,
            _ => StoreBackend::Postgres,
        }
    }
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Postgres => "postgres",
            StoreBackend::Memory => "memory",
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: u64,
    pub idle_timeout: u64,
    pub max_lifetime: u64,
}

/// Email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub resend_api_key: String,
    pub resend_api_url: String,
    pub from_email: String,
    pub from_name: String,
    pub support_email: String,
    pub portal_url: String, // Payment portal URL used in email links
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub request_timeout_ms: u64,
}

/// Payment gateway and pricing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfig {
    pub paystack_public_key: String,
    pub paystack_secret_key: Option<String>,
    pub currency: String,
    /// Price of one month in whole currency units (naira)
    pub monthly_amount: i64,
    pub total_months: i32,
    /// Minor units per whole unit (kobo per naira)
    pub minor_unit_factor: i64,
    pub require_webhook_signature: bool,
}

/// Feature flags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub enable_api_docs: bool,
    pub disable_embedded_migrations: bool,
    pub redeliver_outbox_on_startup: bool,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let get_or_default = |key: &str, default: &str| -> String {
            env::var(key).unwrap_or_else(|_| default.to_string())
        };

        let parse_u32_or_default = |key: &str, default: &str| -> Result<u32, ConfigError> {
            get_or_default(key, default).parse().map_err(|_| {
                ConfigError::InvalidValue(key.to_string(), "not a valid u32".to_string())
            })
        };

        let parse_u64_or_default = |key: &str, default: &str| -> Result<u64, ConfigError> {
            get_or_default(key, default).parse().map_err(|_| {
                ConfigError::InvalidValue(key.to_string(), "not a valid u64".to_string())
            })
        };

        let parse_i64_or_default = |key: &str, default: &str| -> Result<i64, ConfigError> {
            get_or_default(key, default).parse().map_err(|_| {
                ConfigError::InvalidValue(key.to_string(), "not a valid integer".to_string())
            })
        };

        let parse_bool_or_default = |key: &str, default: &str| -> bool {
            get_or_default(key, default).to_lowercase() == "true"
        };

        let environment = Environment::from(get_or_default("ENVIRONMENT", "development"));

        // Parse bind address to extract port
        let bind_address = get_or_default("BIND_ADDRESS", "0.0.0.0:8080");
        let port = bind_address
            .rsplit(':')
            .next()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let server = ServerConfig {
            bind_address,
            port,
            rust_log: get_or_default("RUST_LOG", "info"),
        };

        let backend = StoreBackend::from(get_or_default("STORE_BACKEND", "postgres"));
        let database_url = match backend {
            StoreBackend::Postgres => env::var("DATABASE_URL")
                .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?,
            StoreBackend::Memory => get_or_default("DATABASE_URL", ""),
        };

        let database = DatabaseConfig {
            backend,
            url: database_url,
            max_connections: parse_u32_or_default("DATABASE_MAX_CONNECTIONS", "20")?,
            min_connections: parse_u32_or_default("DATABASE_MIN_CONNECTIONS", "2")?,
            connect_timeout: parse_u64_or_default("DATABASE_CONNECT_TIMEOUT", "30")?,
            idle_timeout: parse_u64_or_default("DATABASE_IDLE_TIMEOUT", "600")?,
            max_lifetime: parse_u64_or_default("DATABASE_MAX_LIFETIME", "1800")?,
        };

        if database.max_connections < database.min_connections {
            return Err(ConfigError::InvalidValue(
                "DATABASE_MAX_CONNECTIONS".to_string(),
                "must be >= DATABASE_MIN_CONNECTIONS".to_string(),
            ));
        }

        let cors_allowed_origins: Vec<String> = get_or_default("CORS_ALLOWED_ORIGINS", "*")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let portal_url = env::var("PORTAL_URL").unwrap_or_else(|_| match environment {
            Environment::Production => "https://pay.blactechafrica.com".to_string(),
            _ => "http://localhost:5173".to_string(),
        });

        let email = EmailConfig {
            resend_api_key: get_or_default("RESEND_API_KEY", ""),
            resend_api_url: get_or_default("RESEND_API_URL", "https://api.resend.com/emails"),
            from_email: get_or_default("EMAIL_FROM_ADDRESS", "support@blactechafrica.com"),
            from_name: get_or_default("EMAIL_FROM_NAME", "BlacTech Scholarship Portal"),
            support_email: get_or_default("SUPPORT_EMAIL", "support@blactechafrica.com"),
            portal_url,
            max_retries: parse_u32_or_default("EMAIL_MAX_RETRIES", "3")?,
            retry_delay_ms: parse_u64_or_default("EMAIL_RETRY_DELAY_MS", "1000")?,
            request_timeout_ms: parse_u64_or_default("EMAIL_REQUEST_TIMEOUT_MS", "10000")?,
        };

        let paystack_secret_key = env::var("PAYSTACK_SECRET_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());
        let require_webhook_signature = parse_bool_or_default("REQUIRE_WEBHOOK_SIGNATURE", "true");

        // An unsigned webhook could credit payments that never happened
        if environment == Environment::Production {
            if paystack_secret_key.is_none() {
                return Err(ConfigError::MissingVar("PAYSTACK_SECRET_KEY".to_string()));
            }
            if !require_webhook_signature {
                return Err(ConfigError::InvalidValue(
                    "REQUIRE_WEBHOOK_SIGNATURE".to_string(),
                    "signature verification cannot be disabled in production".to_string(),
                ));
            }
            if email.resend_api_key.is_empty() {
                return Err(ConfigError::MissingVar("RESEND_API_KEY".to_string()));
            }
        }

        let monthly_amount = parse_i64_or_default("PAYMENT_MONTHLY_AMOUNT", "10000")?;
        if monthly_amount <= 0 {
            return Err(ConfigError::InvalidValue(
                "PAYMENT_MONTHLY_AMOUNT".to_string(),
                "must be positive".to_string(),
            ));
        }

        let total_months = parse_u32_or_default("PAYMENT_TOTAL_MONTHS", "4")?;
        if total_months == 0 || total_months > 24 {
            return Err(ConfigError::InvalidValue(
                "PAYMENT_TOTAL_MONTHS".to_string(),
                "must be between 1 and 24".to_string(),
            ));
        }

        let payment = PaymentConfig {
            paystack_public_key: get_or_default("PAYSTACK_PUBLIC_KEY", ""),
            paystack_secret_key,
            currency: get_or_default("PAYMENT_CURRENCY", "NGN").to_uppercase(),
            monthly_amount,
            total_months: total_months as i32,
            minor_unit_factor: parse_i64_or_default("PAYMENT_MINOR_UNIT_FACTOR", "100")?,
            require_webhook_signature,
        };

        let features = FeatureConfig {
            enable_api_docs: parse_bool_or_default("ENABLE_API_DOCS", "true"),
            disable_embedded_migrations: parse_bool_or_default(
                "DISABLE_EMBEDDED_MIGRATIONS",
                "false",
            ),
            redeliver_outbox_on_startup: parse_bool_or_default(
                "REDELIVER_OUTBOX_ON_STARTUP",
                "true",
            ),
        };

        Ok(Self {
            environment,
            cors_allowed_origins,
            server,
            database,
            email,
            payment,
            features,
        })
    }

    /// Development defaults over the in-memory store, independent of the environment
    pub fn in_memory() -> Self {
        Self {
            environment: Environment::Development,
            cors_allowed_origins: vec!["*".to_string()],
            server: ServerConfig {
                bind_address: "127.0.0.1:8080".to_string(),
                port: 8080,
                rust_log: "info".to_string(),
            },
            database: DatabaseConfig {
                backend: StoreBackend::Memory,
                url: String::new(),
                max_connections: 5,
                min_connections: 1,
                connect_timeout: 30,
                idle_timeout: 600,
                max_lifetime: 1800,
            },
            email: EmailConfig {
                resend_api_key: String::new(),
                resend_api_url: "https://api.resend.com/emails".to_string(),
                from_email: "support@blactechafrica.com".to_string(),
                from_name: "BlacTech Scholarship Portal".to_string(),
                support_email: "support@blactechafrica.com".to_string(),
                portal_url: "http://localhost:5173".to_string(),
                max_retries: 1,
                retry_delay_ms: 10,
                request_timeout_ms: 2_000,
            },
            payment: PaymentConfig {
                paystack_public_key: "pk_test_local".to_string(),
                paystack_secret_key: None,
                currency: "NGN".to_string(),
                monthly_amount: 10_000,
                total_months: 4,
                minor_unit_factor: 100,
                require_webhook_signature: false,
            },
            features: FeatureConfig {
                enable_api_docs: true,
                disable_embedded_migrations: true,
                redeliver_outbox_on_startup: false,
            },
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Check if running in development
    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }
}
