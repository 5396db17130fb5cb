//! Layered configuration loading
//!
//! Sources, lowest precedence first:
//!
//! 1. an optional TOML file
//! 2. environment variables prefixed with `TALKBRIDGE_`, using `__` to
//!    separate nesting levels (`TALKBRIDGE_SIGNALING__SECURITY_KEY` maps to
//!    `signaling.security_key`)
//!
//! Each crate deserializes only the section it owns; validation of the
//! values stays with the owning crate.

use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::errors::types::{Error, Result};

/// Environment variable prefix for every talkbridge setting
pub const ENV_PREFIX: &str = "TALKBRIDGE";

/// Load one configuration section.
///
/// A missing section yields `T::default()` so that the owning crate can
/// report precisely which required field is absent.
pub fn load_section<T>(section: &str, file: Option<&Path>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let mut builder = Config::builder();

    if let Some(path) = file {
        debug!("Loading configuration file {}", path.display());
        builder = builder.add_source(File::from(path).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true),
    );

    let settings = builder.build()?;

    match settings.get::<T>(section) {
        Ok(value) => Ok(value),
        Err(ConfigError::NotFound(_)) => {
            debug!("Configuration section '{}' not present, using defaults", section);
            Ok(T::default())
        }
        Err(e) => Err(Error::Config(format!("section '{}': {}", section, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serial_test::serial;
    use std::io::Write;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct DemoSection {
        name: Option<String>,
        port: Option<u16>,
    }

    #[test]
    #[serial]
    fn missing_section_is_default() {
        let section: DemoSection = load_section("absent_section", None).unwrap();
        assert_eq!(section, DemoSection::default());
    }

    #[test]
    #[serial]
    fn environment_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[demo]\nname = \"from-file\"\nport = 1000").unwrap();

        // SAFETY: tests touching the environment are serialized.
        unsafe { std::env::set_var("TALKBRIDGE_DEMO__PORT", "64738") };
        let section: DemoSection = load_section("demo", Some(file.path())).unwrap();
        unsafe { std::env::remove_var("TALKBRIDGE_DEMO__PORT") };

        assert_eq!(section.name.as_deref(), Some("from-file"));
        assert_eq!(section.port, Some(64738));
    }

    #[test]
    #[serial]
    fn missing_file_is_an_error() {
        let result: Result<DemoSection> =
            load_section("demo", Some(Path::new("/nonexistent/talkbridge.toml")));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
