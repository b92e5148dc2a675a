//! Configuration management


use std::env::{self, VarError};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use log::debug;
use serde::Deserialize;

use crate::error::Result;


/// Process configuration
///
/// Every field has a default, so a configuration file only needs to name the
/// values it changes. Keys are camelCase.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {

    /// Address on which sitecam listens for HTTP requests
    pub listen: String,

    /// Name of the operating environment, reported by the health check
    pub env: String,

    /// Path to the SQLite database file
    ///
    /// When absent, *sitecam.db* is placed under the directory given by the
    /// STATE_DIRECTORY environment variable.
    pub database_url: Option<String>,

    /// Upper bound, in seconds, on any single database operation
    pub query_timeout: u64,

    /// Size of the database connection pool
    pub max_connections: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen: String::from("127.0.0.1:4000"),
            env: String::from("development"),
            database_url: None,
            query_timeout: 3,
            max_connections: 10,
        }
    }
}

impl Config {

    /// Loads configuration from the specified file, or defaults if none is given
    ///
    /// The SC_ENV environment variable, if present, overrides `env`.
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<Config> {

        let mut config = match path {
            Some(path) => {
                debug!("loading configuration from {}", path.as_ref().display());
                let file = File::open(path)?;
                serde_json::from_reader(BufReader::new(file))?
            },
            None => Config::default(),
        };

        match env::var("SC_ENV") {
            Ok(env) => config.env = env,
            Err(VarError::NotPresent) => (),
            Err(err) => return Err(err.into()),
        }

        Ok(config)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout)
    }

    /// Resolves the database location
    ///
    /// If STATE_DIRECTORY is not present and this program is compiled in debug
    /// mode, the database file is placed in the current working directory.
    pub fn database_url(&self) -> Result<String> {

        if let Some(url) = &self.database_url {
            return Ok(url.clone());
        }

        let db_dir = match env::var("STATE_DIRECTORY") {
            Ok(dir) => dir,
            #[cfg(debug_assertions)]
            Err(VarError::NotPresent) => String::from("."),
            Err(err) => return Err(err.into()),
        };

        Ok(format!("{}/sitecam.db", db_dir))
    }
}
