use std::{
    io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::server::DEFAULT_PORT;

/// The longest the relay may wait on the transport per tick.
/// Waiting longer than this starves the serial side.
pub const MAX_SERVICE_WAIT_MS: u64 = 100;

/// Problems with a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Could not read config file `{path}`")]
    Io {
        /// The path given.
        path: PathBuf,

        /// What went wrong.
        #[source]
        source: io::Error,
    },

    /// The contents are not valid.
    #[error("Could not parse config")]
    Parse(#[from] ron::error::SpannedError),

    /// The config could not be written out.
    #[error("Could not serialize config")]
    Serialize(#[from] ron::Error),

    /// The values make no sense.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Runtime switches.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Options {
    /// Log at debug level.
    pub debug: bool,

    /// Mirror serial bytes to stdout.
    /// See [`crate::echo::LocalEcho`].
    pub local_echo: bool,

    /// Follow a message starting with a carriage return by a line feed,
    /// for devices which expect CRLF line endings.
    pub translate_cr_to_crlf: bool,
}

/// The configuration used for running the relay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Port to listen on, on all interfaces.
    pub port: u16,

    /// See [`Options`].
    pub options: Options,

    /// How long to wait on the transport per tick when the serial line is quiet.
    pub service_wait_ms: u64,

    /// How many bytes from the session may wait for the serial device.
    pub inbound_capacity: usize,

    /// If set, also log to a daily file in this directory.
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            options: Options::default(),
            service_wait_ms: 5,
            inbound_capacity: 4096,
            log_dir: None,
        }
    }
}

impl Config {
    fn ron() -> ron::Options {
        ron::Options::default()
            .with_default_extension(ron::extensions::Extensions::IMPLICIT_SOME)
            .with_default_extension(ron::extensions::Extensions::UNWRAP_NEWTYPES)
    }

    /// Deserialize a .ron file's contents.
    /// Omitted fields keep their defaults.
    pub fn deserialize(input: &str) -> Result<Self, ConfigError> {
        Ok(Self::ron().from_str::<Config>(input)?)
    }

    /// An example configuration with some fields filled in.
    pub fn example() -> Self {
        Self {
            port: 8080,
            options: Options {
                debug: false,
                local_echo: true,
                translate_cr_to_crlf: true,
            },
            log_dir: Some(PathBuf::from("/var/log/serial-relay")),
            ..Default::default()
        }
    }

    /// Serialize the configuration in a "pretty" (i.e. non-compact) fashion.
    pub fn serialize_pretty(&self) -> Result<String, ConfigError> {
        Ok(Self::ron().to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Setup a new configuration from a RON file.
    pub fn new_from_path<P: AsRef<Path>>(p: P) -> Result<Self, ConfigError> {
        let path = p.as_ref();
        let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::deserialize(&s)
    }

    /// How long to wait on the transport when the serial line is quiet.
    pub fn service_wait(&self) -> Duration {
        Duration::from_millis(self.service_wait_ms)
    }

    /// Check the values make sense together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.inbound_capacity == 0 {
            return Err(ConfigError::Invalid(
                "inbound_capacity must be at least 1".into(),
            ));
        }

        if self.service_wait_ms > MAX_SERVICE_WAIT_MS {
            return Err(ConfigError::Invalid(format!(
                "service_wait_ms is {}, at most {MAX_SERVICE_WAIT_MS} is allowed",
                self.service_wait_ms
            )));
        }

        Ok(())
    }
}
