//! Configuration loading and merging.
//!
//! Settings come from a YAML file, searched in the working directory, the
//! home directory, then the system location. Credentials can also arrive
//! via environment variables, which win over the file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::api::Credentials;
use crate::error::{ConfigError, Result};

/// Size used for droplet creation when none is configured.
pub const DEFAULT_SIZE: &str = "512MB";

/// Image used for droplet creation when none is configured.
pub const DEFAULT_IMAGE: &str = "Ubuntu 12.04 x64";

/// Region used for droplet creation when none is configured.
pub const DEFAULT_REGION: &str = "New York 1";

/// Login username used when none is configured.
pub const DEFAULT_USERNAME: &str = "root";

/// File name searched in the working and home directories.
const CONFIG_FILE_NAME: &str = ".coracle";

/// System-wide fallback location.
const SYSTEM_CONFIG_PATH: &str = "/etc/coracle.conf";

/// Environment variable overriding the configured client id.
pub const ENV_CLIENT_ID: &str = "CORACLE_CLIENT_ID";

/// Environment variable overriding the configured API key.
pub const ENV_API_KEY: &str = "CORACLE_API_KEY";

/// User configuration, merged from file, environment, and defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API client id.
    pub client_id: Option<String>,

    /// API key paired with the client id.
    pub api_key: Option<String>,

    /// Default size name for droplet creation.
    pub size: String,

    /// Default image name for droplet creation.
    pub image: String,

    /// Default region name for droplet creation.
    pub region: String,

    /// Registered SSH key names added to new droplets.
    pub keys: Vec<String>,

    /// Droplet login username.
    pub username: String,

    /// Path to the SSH private key used for logins.
    pub ssh_private_key: String,

    /// Path to the matching public key.
    pub ssh_public_key: String,

    /// Name this machine's key is registered under, once configured.
    pub auth_key_name: Option<String>,

    /// Scrub data on droplet termination.
    pub scrub_data: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_id: None,
            api_key: None,
            size: String::from(DEFAULT_SIZE),
            image: String::from(DEFAULT_IMAGE),
            region: String::from(DEFAULT_REGION),
            keys: Vec::new(),
            username: String::from(DEFAULT_USERNAME),
            ssh_private_key: String::from("~/.ssh/id_rsa"),
            ssh_public_key: String::from("~/.ssh/id_rsa.pub"),
            auth_key_name: None,
            scrub_data: true,
        }
    }
}

impl Config {
    /// Loads configuration with standard precedence: the explicit path if
    /// given, otherwise the first file found in the search locations,
    /// otherwise pure defaults. Environment overrides apply last.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit path is missing, or any found file
    /// cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(explicit) => Self::from_file(explicit)?,
            None => match search_paths().into_iter().find(|p| p.exists()) {
                Some(found) => Self::from_file(&found)?,
                None => {
                    debug!("no configuration file found, using defaults");
                    Self::default()
                }
            },
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads configuration from a specific YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }
            .into());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ParseError {
            message: format!("Failed to read file: {e}"),
            location: Some(path.display().to_string()),
        })?;

        Self::from_yaml(&content, Some(path))
    }

    /// Parses configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn from_yaml(content: &str, source: Option<&Path>) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError {
            message: format!("YAML parse error: {e}"),
            location: source.map(|p| p.display().to_string()),
        })?;
        Ok(config)
    }

    /// Applies credential overrides from the environment.
    fn apply_env_overrides(&mut self) {
        if let Ok(client_id) = std::env::var(ENV_CLIENT_ID) {
            debug!("Overriding client_id from environment");
            self.client_id = Some(client_id);
        }
        if let Ok(api_key) = std::env::var(ENV_API_KEY) {
            debug!("Overriding api_key from environment");
            self.api_key = Some(api_key);
        }
    }

    /// Extracts the credential pair, requiring both halves.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCredential`] naming the absent half.
    pub fn credentials(&self) -> Result<Credentials> {
        let client_id = self
            .client_id
            .clone()
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingCredential {
                name: String::from("client_id"),
            })?;
        let api_key = self
            .api_key
            .clone()
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingCredential {
                name: String::from("api_key"),
            })?;
        Ok(Credentials { client_id, api_key })
    }
}

/// Loads a `.env` file from the working directory when present.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be loaded.
pub fn load_dotenv() -> Result<()> {
    let env_path = PathBuf::from(".env");
    if env_path.exists() {
        info!("Loading environment from: {}", env_path.display());
        dotenvy::from_path(&env_path).map_err(|e| ConfigError::ParseError {
            message: format!("Failed to load .env file: {e}"),
            location: Some(env_path.display().to_string()),
        })?;
    }
    Ok(())
}

/// Standard search locations, most specific first.
fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(CONFIG_FILE_NAME));
    }
    paths.push(PathBuf::from(SYSTEM_CONFIG_PATH));
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoracleError;
    use std::io::Write;

    #[test]
    fn defaults_cover_every_field() {
        let config = Config::default();
        assert_eq!(config.size, "512MB");
        assert_eq!(config.image, "Ubuntu 12.04 x64");
        assert_eq!(config.region, "New York 1");
        assert_eq!(config.username, "root");
        assert!(config.scrub_data);
        assert!(config.keys.is_empty());
    }

    #[test]
    fn parses_a_partial_file_over_defaults() {
        let yaml = r"
client_id: abc123
api_key: secret
size: 1GB
keys:
  - workstation
";
        let config = Config::from_yaml(yaml, None).unwrap();
        assert_eq!(config.client_id.as_deref(), Some("abc123"));
        assert_eq!(config.size, "1GB");
        assert_eq!(config.keys, ["workstation"]);
        // untouched fields keep their defaults
        assert_eq!(config.region, "New York 1");
        assert!(config.scrub_data);
    }

    #[test]
    fn loads_from_a_file_on_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "client_id: from-disk\napi_key: k").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.client_id.as_deref(), Some("from-disk"));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = Config::from_file(Path::new("/nonexistent/.coracle")).unwrap_err();
        assert!(matches!(
            err,
            CoracleError::Config(ConfigError::FileNotFound { .. })
        ));
    }

    #[test]
    fn invalid_yaml_is_a_parse_error() {
        let err = Config::from_yaml("client_id: [unclosed", None).unwrap_err();
        assert!(matches!(
            err,
            CoracleError::Config(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn parse_errors_name_the_offending_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "client_id: [unclosed").unwrap();

        let err = Config::from_file(file.path()).unwrap_err();
        let rendered = err.to_string();
        assert!(
            rendered.contains(&file.path().display().to_string()),
            "missing file path in: {rendered}"
        );
    }

    #[test]
    fn credentials_require_both_halves() {
        let mut config = Config::default();
        let err = config.credentials().unwrap_err();
        assert!(matches!(
            err,
            CoracleError::Config(ConfigError::MissingCredential { .. })
        ));

        config.client_id = Some(String::from("abc"));
        config.api_key = Some(String::new());
        assert!(config.credentials().is_err());

        config.api_key = Some(String::from("key"));
        let credentials = config.credentials().unwrap();
        assert_eq!(credentials.client_id, "abc");
        assert_eq!(credentials.api_key, "key");
    }
}
