//! Configuration module
//!
//! Combines the command-line flags with the polling settings read from the
//! environment.

use anyhow::{Result, bail};
use kiln_core::domain::credential::Credential;
use kiln_poller::PollerConfig;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the generation service
    pub base_url: String,

    /// Session cookie, never printed
    pub credential: Credential,

    pub poller: PollerConfig,
}

impl Config {
    /// Builds the configuration, reading `KILN_*` polling variables
    ///
    /// # Arguments
    /// * `base_url` - Service URL from `--base-url`
    /// * `cookie` - Session cookie from `--cookie`
    pub fn load(base_url: String, cookie: String) -> Result<Self> {
        let poller = PollerConfig::from_env()?;
        Self::new(base_url, cookie, poller)
    }

    pub fn new(base_url: String, cookie: String, poller: PollerConfig) -> Result<Self> {
        let credential = Credential::new(cookie.trim());
        if credential.is_empty() {
            bail!("A session cookie is required (--cookie or KILN_COOKIE)");
        }
        if base_url.trim().is_empty() {
            bail!("The service URL cannot be empty");
        }
        poller.validate()?;

        Ok(Self {
            base_url,
            credential,
            poller,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_blank_cookie() {
        let result = Config::new(
            "http://localhost".to_string(),
            "   ".to_string(),
            PollerConfig::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_credential_is_trimmed() {
        let config = Config::new(
            "http://localhost".to_string(),
            " session=abc \n".to_string(),
            PollerConfig::default(),
        )
        .unwrap();
        assert_eq!(config.credential.expose(), "session=abc");
        assert!(!format!("{config:?}").contains("abc"));
    }

    #[test]
    fn test_invalid_poller_config_is_rejected() {
        let poller = PollerConfig {
            max_backoff: std::time::Duration::ZERO,
            ..PollerConfig::default()
        };
        let result = Config::new("http://localhost".to_string(), "c=1".to_string(), poller);
        assert!(result.is_err());
    }
}
