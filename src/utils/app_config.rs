use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;
use std::sync::{RwLockReadGuard, RwLockWriteGuard};

use config::{Environment, Source};
use lazy_static::lazy_static;

use super::error::Result;

static DEFAULT_CONFIG: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/resources/default_config.toml"));

/// A named table under `presets`, merged on top of everything else when selected
#[derive(Debug, Clone, serde::Deserialize)]
struct Preset(HashMap<String, config::Value>);

impl config::Source for Preset {
    fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
        Box::new(self.clone())
    }

    fn collect(&self) -> std::result::Result<HashMap<String, config::Value>, config::ConfigError> {
        let mut kv = self.0.clone();
        // a preset can not pull in other presets
        kv.remove("presets");
        Ok(kv)
    }
}

/// Layered application config: embedded defaults, environment, file, preset
pub struct AppConfig(config::Config);

impl AppConfig {
    fn new() -> Self {
        Self(config::Config::new())
    }

    /// Defaults plus `CREDITSIM_*` environment variables
    pub fn setup(&mut self) -> Result<&mut Self> {
        self.0
            .merge(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))?;
        self.0.merge(Environment::with_prefix("CREDITSIM"))?;
        Ok(self)
    }

    /// Load config from a file, format guessed from the extension
    pub fn use_file(&mut self, path: &Path) -> Result<&mut Self> {
        self.0.merge(config::File::from(path))?;
        Ok(self)
    }

    pub fn use_preset(&mut self, name: &str) -> Result<&mut Self> {
        let preset: Preset = self.get(format!("presets.{}", name))?;
        self.0.merge(preset)?;
        Ok(self)
    }

    /// Override a single value
    pub fn set<T>(&mut self, key: &str, value: T) -> Result<&mut Self>
    where
        T: Into<config::Value>,
    {
        self.0.set(key, value)?;
        Ok(self)
    }

    /// Get a single value and deserialize to the given type
    pub fn get<T, K>(&self, key: K) -> Result<T>
    where
        // DeserializeOwned, because the global lock is released before returning
        T: serde::de::DeserializeOwned,
        K: AsRef<str>,
    {
        Ok(self.0.get(key.as_ref())?)
    }

    /// Deserialize the whole config into the given type
    pub fn fetch<T>(&self) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let t = self.0.clone().try_into()?;
        Ok(t)
    }

    /// The effective config as YAML, without the preset tables
    pub fn dump(&self) -> Result<String> {
        let mut value: serde_yaml::Value = self.fetch()?;
        if let Some(map) = value.as_mapping_mut() {
            map.remove(&serde_yaml::Value::from("presets"));
        }
        Ok(serde_yaml::to_string(&value)?)
    }
}

lazy_static! {
    /// global AppConfig instance
    static ref CONFIG: RwLock<AppConfig> = RwLock::new(AppConfig::new());
}

pub fn setup() -> Result<()> {
    config_mut().setup()?;
    Ok(())
}

/// global AppConfig instance
pub fn config() -> RwLockReadGuard<'static, AppConfig> {
    CONFIG.read().unwrap()
}

/// mutable global AppConfig instance
pub fn config_mut() -> RwLockWriteGuard<'static, AppConfig> {
    CONFIG.write().unwrap()
}

pub mod prelude {
    pub use super::{config, config_mut};
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn test_config() -> AppConfig {
        let mut config = AppConfig::new();
        config.setup().unwrap();
        config
            .use_file(Path::new(concat!(
                env!("CARGO_MANIFEST_DIR"),
                "/resources/test_config.toml"
            )))
            .unwrap();

        config
    }

    #[test]
    fn defaults_are_embedded() {
        let mut config = AppConfig::new();
        config.setup().unwrap();

        let steps: u64 = config.get("steps").unwrap();
        let avg_delay: f64 = config.get("avg_delay").unwrap();
        let fixed_delay: u64 = config.get("fixed_delay").unwrap();
        assert_eq!(steps, 10000);
        assert_eq!(avg_delay, 3.0);
        assert_eq!(fixed_delay, 1);
    }

    #[test]
    fn fetch_config() {
        let config = test_config();

        #[derive(Deserialize)]
        struct Sweep {
            rho_start: f64,
        }
        #[derive(Deserialize)]
        struct Fragment {
            steps: u64,
            rho: f64,
            sweep: Sweep,
        }

        let frag: Fragment = config.fetch().unwrap();

        assert_eq!(frag.steps, 500);
        assert_eq!(frag.rho, 0.3);
        // untouched by the test file
        assert_eq!(frag.sweep.rho_start, 0.15);
    }

    #[test]
    fn preset() {
        let mut config = test_config();

        let rho: f64 = config.get("rho").unwrap();
        assert_eq!(rho, 0.3);

        config.use_preset("heavy").unwrap();
        let rho: f64 = config.get("rho").unwrap();
        assert_eq!(rho, 0.95);
        // keys outside the preset stay
        let steps: u64 = config.get("steps").unwrap();
        assert_eq!(steps, 500);
    }

    #[test]
    fn unknown_preset_fails() {
        let mut config = test_config();
        assert!(config.use_preset("no-such-preset").is_err());
    }

    #[test]
    fn dump_skips_presets() {
        let mut config = test_config();
        config.set("rho", 0.7).unwrap();

        let dumped = config.dump().unwrap();
        assert!(dumped.contains("rho: 0.7"));
        assert!(!dumped.contains("presets"));
    }
}
