use std::path::{Path, PathBuf};
use std::{env, fs};

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::cfg;

/// Every setting of the server. Sources, lowest priority first:
/// built-in defaults, `configs.default.toml`, `configs.{APP_RUN_ENV}.toml`,
/// `configs.local.toml`, then `APP_*` environment variables.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct AppSettings {
    #[serde(default)]
    pub server: cfg::ServerSettings,

    #[serde(default)]
    pub database: cfg::DatabaseSettings,

    #[serde(default)]
    pub jwt: cfg::JwtSettings,

    #[serde(default)]
    pub mpesa: cfg::MpesaSettings,

    #[serde(default)]
    pub sms: cfg::SmsSettings,
}

impl AppSettings {
    pub fn new() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let app_run_env = Self::get_app_run_env();
        let config_path = Self::get_config_path();

        let defaults = toml::to_string(&Self::default())
            .map_err(|e| ConfigError::Message(format!("Failed to serialize defaults: {e}")))?;
        let mut builder = Config::builder().add_source(File::from_str(&defaults, FileFormat::Toml));
        for path in Self::config_files(config_path, &app_run_env) {
            if path.exists() {
                builder = builder.add_source(File::from(path));
            }
        }
        // Sections are split on a double underscore since keys contain single ones:
        // APP_SERVER__PORT, APP_MPESA__CONSUMER_KEY, APP_SMS__PROVIDER
        builder = builder.add_source(Environment::with_prefix("APP").prefix_separator("_").separator("__"));

        let settings = builder.build()?.try_deserialize::<Self>()?;
        settings.validate()?;

        // Production deployments get an editable copy of the effective settings, minus secrets
        let env_config_path = Self::env_config_file(config_path, &app_run_env);
        if app_run_env == "production" && !env_config_path.exists() {
            settings.write_to(&env_config_path)?;
            println!("Created default config file at {}", env_config_path.to_string_lossy());
        }

        Ok(settings)
    }

    /// Optional TOML files in the order they are layered.
    #[must_use]
    pub fn config_files(config_path: &Path, app_run_env: &str) -> [PathBuf; 3] {
        [
            config_path.join("configs.default.toml"),
            Self::env_config_file(config_path, app_run_env),
            config_path.join("configs.local.toml"),
        ]
    }

    fn env_config_file(config_path: &Path, app_run_env: &str) -> PathBuf {
        config_path.join(format!("configs.{app_run_env}.toml"))
    }

    /// Rejects settings the server cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Message("database.url must not be empty".to_string()));
        }
        if self.jwt.access_token_expiry <= 0 {
            return Err(ConfigError::Message("jwt.access_token_expiry must be positive".to_string()));
        }
        if self.server.utc_offset_minutes.abs() >= 24 * 60 {
            return Err(ConfigError::Message("server.utc_offset_minutes must be within a day".to_string()));
        }
        Ok(())
    }

    fn write_to(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string(&self.redacted())
            .map_err(|e| ConfigError::Message(format!("Failed to serialize config: {e}")))?;
        fs::write(path, contents).map_err(|e| ConfigError::Message(format!("Failed to write config file: {e}")))
    }

    /// Copy of the settings with provider credentials blanked out, safe to write to disk or log.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut settings = self.clone();
        settings.mpesa.consumer_secret = String::new();
        settings.mpesa.passkey = String::new();
        settings.sms.twilio_auth_token = String::new();
        settings
    }

    #[must_use]
    pub fn get_server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    #[must_use]
    pub fn get_app_run_env() -> String {
        env::var("APP_RUN_ENV").unwrap_or_else(|_| "production".to_string())
    }

    #[must_use]
    pub fn get_config_path() -> &'static Path {
        Path::new(".")
    }

    #[must_use]
    pub fn get_config_full_path() -> String {
        let config_path = Self::get_config_path();
        config_path
            .canonicalize()
            .unwrap_or_else(|_| config_path.to_path_buf())
            .to_string_lossy()
            .to_string()
    }
}
