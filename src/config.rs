use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::BaseDirs;
use docwal::model::api_key::ApiKey;
use docwal::ClientConfig;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use url::Url;

const CONFIG_PATH: &str = "docwal/config.json";

/// Connection defaults read from `<config dir>/docwal/config.json`.
///
/// It never holds the API key, which comes from the environment or the
/// command line.
#[serde_as]
#[derive(Serialize, Deserialize, Default, Debug, PartialEq)]
pub struct Config {
    pub base_url: Option<Url>,
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    pub timeout: Option<Duration>,
}

/// Values given on the command line or through `DOCWAL_*` variables.
#[derive(Debug, Default)]
pub struct Overrides {
    pub base_url: Option<Url>,
    pub timeout: Option<Duration>,
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        let Some(dirs) = BaseDirs::new() else {
            log::warn!("could not get basedirs");
            return None;
        };
        Some(dirs.config_dir().join(CONFIG_PATH))
    }

    /// Loads the config file, falling back to defaults when it is missing or broken.
    pub fn load(path: Option<&Path>) -> Config {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) => path,
                None => return Default::default(),
            },
        };

        let Ok(contents) = fs::read_to_string(&path) else {
            log::debug!("no config at {}", path.display());
            return Default::default();
        };

        let config = match Self::parse(&contents) {
            Ok(x) => x,
            Err(e) => {
                log::warn!("error deserializing config: {e}");
                return Default::default();
            }
        };

        log::debug!("config: {config:?}");

        config
    }

    pub fn parse(contents: &str) -> Result<Config, serde_json::Error> {
        serde_json::from_str(contents)
    }

    /// Overrides win over the file, the file wins over library defaults.
    pub fn client_config(&self, api_key: ApiKey, overrides: Overrides) -> ClientConfig {
        let mut config = ClientConfig::new(api_key);

        if let Some(url) = overrides.base_url.or_else(|| self.base_url.clone()) {
            config = config.base_url(url);
        }
        if let Some(timeout) = overrides.timeout.or(self.timeout) {
            config = config.timeout(timeout);
        }

        config
    }
}
