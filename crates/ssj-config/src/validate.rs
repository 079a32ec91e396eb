use crate::config::Config;
use crate::error::ConfigError;

/// Shortest timeout accepted, in milliseconds.
pub const MIN_TIMEOUT_MS: u64 = 100;

/// Widest source window accepted on each side of the current line.
pub const MAX_LISTING_CONTEXT: u32 = 50;

/// Check a [`Config`], returning every violation found.
pub fn validate(config: &Config) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut invalid = |field: &str, message: String| {
        errors.push(ConfigError::Validation {
            field: field.to_string(),
            message,
        })
    };

    if config.connection.port == 0 {
        invalid("connection.port", "must not be 0".to_string());
    }
    if config.connection.host.trim().is_empty() {
        invalid("connection.host", "must not be empty".to_string());
    }
    for (field, value) in [
        ("connection.connect_timeout_ms", config.connection.connect_timeout_ms),
        ("connection.handshake_timeout_ms", config.connection.handshake_timeout_ms),
    ] {
        if value < MIN_TIMEOUT_MS {
            invalid(field, format!("must be at least {MIN_TIMEOUT_MS}, got {value}"));
        }
    }
    if config.display.listing_context > MAX_LISTING_CONTEXT {
        invalid(
            "display.listing_context",
            format!(
                "must be at most {MAX_LISTING_CONTEXT}, got {}",
                config.display.listing_context
            ),
        );
    }
    if config.watermark.text.is_empty() {
        invalid("watermark.text", "must not be empty".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_field(cfg: &Config) -> String {
        let errs = validate(cfg).unwrap_err();
        assert_eq!(errs.len(), 1, "{errs:?}");
        match &errs[0] {
            ConfigError::Validation { field, .. } => field.clone(),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn default_config_passes() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn port_zero_rejected() {
        let mut cfg = Config::default();
        cfg.connection.port = 0;
        assert_eq!(single_field(&cfg), "connection.port");
    }

    #[test]
    fn short_timeouts_rejected() {
        let mut cfg = Config::default();
        cfg.connection.handshake_timeout_ms = 99;
        assert_eq!(single_field(&cfg), "connection.handshake_timeout_ms");

        cfg.connection.handshake_timeout_ms = MIN_TIMEOUT_MS;
        assert!(validate(&cfg).is_ok());
    }

    #[test]
    fn wide_listing_rejected() {
        let mut cfg = Config::default();
        cfg.display.listing_context = MAX_LISTING_CONTEXT + 1;
        assert_eq!(single_field(&cfg), "display.listing_context");
    }

    #[test]
    fn empty_watermark_rejected() {
        let mut cfg = Config::default();
        cfg.watermark.text.clear();
        assert_eq!(single_field(&cfg), "watermark.text");
    }

    #[test]
    fn multiple_errors_returned() {
        let mut cfg = Config::default();
        cfg.connection.port = 0;
        cfg.connection.connect_timeout_ms = 1;
        cfg.watermark.text.clear();
        assert_eq!(validate(&cfg).unwrap_err().len(), 3);
    }
}
