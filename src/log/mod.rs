pub mod structured_console_encoder;

use std::path::Path;
use std::sync::OnceLock;

use anyhow::{Context, anyhow};
use log::{debug, info};
use log4rs::{
    Config,
    config::{Deserializers, RawConfig},
};

use crate::log::structured_console_encoder::StructuredConsoleEncoderDeserializer;

const EXTERNAL_CONFIG: &str = "log4rs.yml";

/// Initializes logging.
///
/// A `log4rs.yml` in the working directory wins; otherwise the embedded
/// defaults are used.
pub fn init_logging() -> Result<(), anyhow::Error> {
    let mut deserializers = Deserializers::default();
    deserializers.insert("structured_console", StructuredConsoleEncoderDeserializer);

    let path = Path::new(EXTERNAL_CONFIG);
    if path.exists() {
        log4rs::init_file(path, deserializers)
            .with_context(|| format!("Failed to load external {}", EXTERNAL_CONFIG))?;
        info!(path = EXTERNAL_CONFIG; "Logging initialized from external configuration");
        return Ok(());
    }

    let yaml_content = include_str!("../../resources/default_log4rs.yml");
    let raw_config: RawConfig =
        serde_yaml::from_str(yaml_content).context("Embedded logging configuration is invalid YAML")?;

    let (appenders, errors) = raw_config.appenders_lossy(&deserializers);
    if !errors.is_empty() {
        return Err(anyhow!("Errors parsing embedded appenders: {:?}", errors));
    }

    let config = Config::builder()
        .appenders(appenders)
        .loggers(raw_config.loggers())
        .build(raw_config.root())
        .context("Failed to build logging config")?;

    log4rs::init_config(config).context("Failed to initialize logging from embedded config")?;

    debug!("Logging initialized from embedded defaults (no external log4rs.yml found)");
    Ok(())
}

fn reveal_pii() -> bool {
    static REVEAL_PII_CACHE: OnceLock<bool> = OnceLock::new();

    *REVEAL_PII_CACHE.get_or_init(|| {
        std::env::var("REVEAL_PII")
            .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1"))
            .unwrap_or(false)
    })
}

/// Masks an address, keeping the first and last six characters.
/// With `REVEAL_PII` set, returns the input unchanged.
pub fn mask_string(s: &str) -> String {
    if reveal_pii() {
        return s.to_string();
    }

    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= 12 {
        return "***".to_string();
    }

    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 6..].iter().collect();
    format!("{head}...{tail}")
}

/// Redacts a nanoton amount unless `REVEAL_PII` is set.
pub fn mask_amount(nanotons: u64) -> String {
    if reveal_pii() {
        return nanotons.to_string();
    }

    "<REDACTED>".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_config_parses() {
        let raw: RawConfig = serde_yaml::from_str(include_str!("../../resources/default_log4rs.yml")).unwrap();
        let mut deserializers = Deserializers::default();
        deserializers.insert("structured_console", StructuredConsoleEncoderDeserializer);

        let (appenders, errors) = raw.appenders_lossy(&deserializers);
        assert!(errors.is_empty(), "{errors:?}");
        assert!(!appenders.is_empty());
    }

    #[test]
    fn test_masking_without_reveal() {
        if reveal_pii() {
            return;
        }
        assert_eq!(
            mask_string("EQCD39VS5jcptHL8vMjEXrzGaRcCVYto7HUn4bpAOg8xqB2N"),
            "EQCD39...8xqB2N"
        );
        assert_eq!(mask_string("short"), "***");
        assert_eq!(mask_amount(1_000_000_000), "<REDACTED>");
    }
}
