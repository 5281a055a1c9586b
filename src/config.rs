use std::path::PathBuf;

use anyhow::{Context, Result};
use config::{Config, Environment};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database_path: PathBuf,
    pub recipes_csv: PathBuf,
    pub host: String,
    pub port: u16,
    pub base_url: String,
}

impl Settings {
    /// Defaults overlaid with `PANTRY_*` environment variables.
    pub fn load() -> Result<Self> {
        Self::from_env(Environment::with_prefix("PANTRY"))
    }

    fn from_env(env: Environment) -> Result<Self> {
        Config::builder()
            .set_default("database_path", "InternDatabase.db")?
            .set_default("recipes_csv", "recipes.csv")?
            .set_default("host", "127.0.0.1")?
            .set_default("port", 8000)?
            .set_default("base_url", "https://recipe.rakuten.co.jp")?
            .add_source(env)
            .build()
            .and_then(|c| c.try_deserialize::<Settings>())
            .context("Invalid configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::with_prefix("PANTRY").source(Some(map))
    }

    #[test]
    fn defaults() {
        let s = Settings::from_env(env(&[])).unwrap();
        assert_eq!(s.database_path, PathBuf::from("InternDatabase.db"));
        assert_eq!(s.recipes_csv, PathBuf::from("recipes.csv"));
        assert_eq!(s.port, 8000);
        assert_eq!(s.base_url, "https://recipe.rakuten.co.jp");
    }

    #[test]
    fn environment_overrides() {
        let s = Settings::from_env(env(&[
            ("PANTRY_PORT", "9100"),
            ("PANTRY_DATABASE_PATH", "/tmp/pantry.db"),
        ]))
        .unwrap();
        assert_eq!(s.port, 9100);
        assert_eq!(s.database_path, PathBuf::from("/tmp/pantry.db"));
        assert_eq!(s.host, "127.0.0.1");
    }

    #[test]
    fn bad_port_is_an_error() {
        assert!(Settings::from_env(env(&[("PANTRY_PORT", "eighty")])).is_err());
    }
}
