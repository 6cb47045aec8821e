// ============================
// crates/backend-lib/src/config.rs
// ============================
//! Configuration management.
use crate::auth::LockoutPolicy;
use crate::validation::PasswordPolicy;
use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Environment variable prefix; nested keys are separated by `__`
pub const ENV_PREFIX: &str = "IDENTITY_";

const MIN_SECRET_BYTES: usize = 32;
/// Longest token lifetime accepted
const MAX_TOKEN_TTL_SECS: u64 = 366 * 24 * 60 * 60;
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub logging: LoggingSettings,
    pub password_policy: PasswordPolicy,
    pub hashing: HashingSettings,
    pub lockout: LockoutPolicy,
    pub token: TokenSettings,
    /// Administrator ensured at startup; absent by default
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl ServerSettings {
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

/// Which identity store backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Memory,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    /// Directory holding the snapshot when `backend = "file"`
    pub path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            path: PathBuf::from("data"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter level; `RUST_LOG` takes precedence
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Password hashing algorithm used for new hashes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    Argon2id,
    Scrypt,
}

/// Cost parameters for password hashing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashingSettings {
    pub algorithm: HashAlgorithm,
    pub argon2_memory_kib: u32,
    pub argon2_iterations: u32,
    pub argon2_parallelism: u32,
    pub scrypt_log_n: u8,
}

impl Default for HashingSettings {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::Argon2id,
            argon2_memory_kib: 19 * 1024,
            argon2_iterations: 2,
            argon2_parallelism: 1,
            scrypt_log_n: 17,
        }
    }
}

/// HMAC algorithm used to sign tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenAlgorithm {
    HS256,
    HS384,
    HS512,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenSettings {
    /// Shared HMAC secret; must be supplied by the deployment
    pub secret: String,
    /// Token lifetime in seconds
    pub ttl_secs: u64,
    /// Value of the `iss` claim; checked on verification when set
    pub issuer: Option<String>,
    pub algorithm: TokenAlgorithm,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            secret: String::new(),
            ttl_secs: 60 * 60, // 1 hour
            issuer: None,
            algorithm: TokenAlgorithm::HS256,
        }
    }
}

/// First administrator account, created at startup when its username is free
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapAdmin {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Settings {
    /// Load settings: defaults, then `config.toml` (or `path`), then environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = path.unwrap_or_else(|| Path::new("config.toml"));
        let settings: Settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the service cannot safely run with
    pub fn validate(&self) -> Result<()> {
        if self.token.secret.len() < MIN_SECRET_BYTES {
            bail!("token.secret must be at least {MIN_SECRET_BYTES} bytes");
        }
        if self.token.ttl_secs == 0 || self.token.ttl_secs > MAX_TOKEN_TTL_SECS {
            bail!("token.ttl_secs must be between 1 and {MAX_TOKEN_TTL_SECS}");
        }
        if self.lockout.threshold == 0 {
            bail!("lockout.threshold must be greater than zero");
        }
        if self.password_policy.min_length == 0 {
            bail!("password_policy.min_length must be greater than zero");
        }
        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            bail!("logging.level must be one of {}", LOG_LEVELS.join(", "));
        }

        let hashing = &self.hashing;
        if hashing.argon2_parallelism == 0 || hashing.argon2_iterations == 0 {
            bail!("hashing.argon2_parallelism and hashing.argon2_iterations must be at least 1");
        }
        if hashing.argon2_memory_kib < hashing.argon2_parallelism.saturating_mul(8) {
            bail!("hashing.argon2_memory_kib must be at least 8 * argon2_parallelism");
        }
        if !(1..=20).contains(&hashing.scrypt_log_n) {
            bail!("hashing.scrypt_log_n must be between 1 and 20");
        }

        if let Some(admin) = &self.bootstrap_admin {
            if admin.username.trim().is_empty()
                || admin.email.trim().is_empty()
                || admin.password.is_empty()
            {
                bail!("bootstrap_admin needs a username, email and password");
            }
        }

        Ok(())
    }
}
