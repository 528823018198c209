use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashMap},
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading file '{}'", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("parsing file '{}'", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("serializing options")]
    Serialize(#[from] toml::ser::Error),

    #[error("writing file '{}'", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scan: Scan,

    /// Option values per device, applied right after opening it.
    #[serde(default)]
    pub options: HashMap<String, BTreeMap<String, toml::Value>>,

    #[serde(default)]
    pub auth: HashMap<String, Auth>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scan {
    pub device: Option<String>,

    /// Below 25 the resolution is picked automatically.
    #[serde(default)]
    pub preview_dpi: f64,

    #[serde(default = "default_output")]
    pub output: PathBuf,
}

impl Default for Scan {
    fn default() -> Self {
        Self {
            device: None,
            preview_dpi: 0.0,
            output: default_output(),
        }
    }
}

fn default_output() -> PathBuf {
    PathBuf::from(".")
}

#[derive(Clone, Deserialize)]
pub struct Auth {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Auth")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct SavedOptions<'a> {
    options: BTreeMap<&'a str, &'a BTreeMap<String, String>>,
}

impl Config {
    pub fn read_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;

        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Configured option values of `device` in the form `Session::set_options_map` takes.
    pub fn device_options(&self, device: &str) -> BTreeMap<String, String> {
        let Some(options) = self.options.get(device) else {
            log::debug!("No custom options for device '{device}'");
            return BTreeMap::new();
        };

        options
            .iter()
            .filter_map(|(name, value)| {
                let text = match value {
                    toml::Value::String(text) => text.clone(),
                    toml::Value::Integer(value) => value.to_string(),
                    toml::Value::Float(value) => value.to_string(),
                    toml::Value::Boolean(value) => value.to_string(),
                    value => {
                        log::warn!("Ignore option '{name}' with unsupported value {value}");
                        return None;
                    }
                };
                Some((name.clone(), text))
            })
            .collect()
    }
}

/// Writes `options` as an `[options."<device>"]` table that [`Config::read_from`] accepts.
pub fn write_options(
    path: &Path,
    device: &str,
    options: &BTreeMap<String, String>,
) -> Result<(), ConfigError> {
    let saved = SavedOptions {
        options: BTreeMap::from([(device, options)]),
    };

    let raw = toml::to_string(&saved)?;
    fs::write(path, raw).map_err(|source| ConfigError::Write {
        path: path.to_owned(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
        [scan]
        device = "pixma:04A9176D"
        preview_dpi = 75.0

        [options."pixma:04A9176D"]
        mode = "Gray"
        resolution = 300
        "tl-x" = 12.5
        preview = false

        [auth."net:scanbox:pixma:04A9176D"]
        username = "alice"
        password = "secret"
    "#;

    #[test]
    fn full_config() {
        let config: Config = toml::from_str(CONFIG).unwrap();

        assert_eq!(config.scan.device.as_deref(), Some("pixma:04A9176D"));
        assert_eq!(config.scan.preview_dpi, 75.0);
        assert_eq!(config.scan.output, PathBuf::from("."));
        assert_eq!(config.auth["net:scanbox:pixma:04A9176D"].username, "alice");

        let options = config.device_options("pixma:04A9176D");
        assert_eq!(options["mode"], "Gray");
        assert_eq!(options["resolution"], "300");
        assert_eq!(options["tl-x"], "12.5");
        assert_eq!(options["preview"], "false");

        assert!(config.device_options("other").is_empty());
    }

    #[test]
    fn empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.scan.device.is_none());
        assert!(config.options.is_empty());
    }

    #[test]
    fn saved_options_read_back() {
        let path = std::env::temp_dir().join(format!("scankit-options-{}.toml", std::process::id()));
        let options = BTreeMap::from([
            ("mode".to_owned(), "Color".to_owned()),
            ("scankit:page-size".to_owned(), "A4".to_owned()),
        ]);

        write_options(&path, "test:0", &options).unwrap();
        let config = Config::read_from(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(config.device_options("test:0"), options);
    }

    #[test]
    fn missing_file() {
        let err = Config::read_from("/nonexistent/scankit.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
