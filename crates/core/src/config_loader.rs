use crate::config::AppConfig;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration by layering defaults, TOML, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load() -> Result<AppConfig> {
        let config: AppConfig = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file("config/Strike.toml"))
            .merge(Env::prefixed("STRIKE_").split("__"))
            .extract()?;

        Ok(config)
    }

    /// Loads configuration with a profile-specific TOML overlay.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load_with_profile(profile: &str) -> Result<AppConfig> {
        let config: AppConfig = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file("config/Strike.toml"))
            .merge(Toml::file(format!("config/Strike.{profile}.toml")))
            .merge(Env::prefixed("STRIKE_").split("__"))
            .extract()?;

        Ok(config)
    }
}
