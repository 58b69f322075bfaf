//! Payment provider configuration (Xendit)

use serde::Deserialize;

use super::error::ValidationError;

/// Payment provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Xendit secret API key
    pub secret_key: String,

    /// Static token Xendit echoes in the x-callback-token header
    pub callback_token: String,

    /// Optional HMAC key for webhook body signatures
    pub webhook_signing_key: Option<String>,

    /// Provider API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// api-version header sent on QR endpoints
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Outbound request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Replace sandbox QR placeholder payloads with a synthetic string
    #[serde(default = "default_synthesize_sandbox_qr")]
    pub synthesize_sandbox_qr: bool,
}

impl ProviderConfig {
    /// Check if using a development (sandbox) key
    pub fn is_test_mode(&self) -> bool {
        self.secret_key.starts_with("xnd_development_")
    }

    /// Check if using a production key
    pub fn is_live_mode(&self) -> bool {
        self.secret_key.starts_with("xnd_production_")
    }

    /// Validate provider configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.secret_key.is_empty() {
            return Err(ValidationError::MissingRequired("PROVIDER_SECRET_KEY"));
        }
        if self.callback_token.is_empty() {
            return Err(ValidationError::MissingRequired("PROVIDER_CALLBACK_TOKEN"));
        }

        // Verify key prefixes for safety
        if !self.secret_key.starts_with("xnd_") {
            return Err(ValidationError::InvalidProviderKey);
        }
        if !self.base_url.starts_with("https://") {
            return Err(ValidationError::InvalidProviderBaseUrl);
        }

        Ok(())
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            callback_token: String::new(),
            webhook_signing_key: None,
            base_url: default_base_url(),
            api_version: default_api_version(),
            request_timeout_secs: default_request_timeout(),
            synthesize_sandbox_qr: default_synthesize_sandbox_qr(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.xendit.co".to_string()
}

fn default_api_version() -> String {
    "2022-07-31".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_synthesize_sandbox_qr() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_test_mode() {
        let config = ProviderConfig {
            secret_key: "xnd_development_abc".to_string(),
            callback_token: "tok".to_string(),
            ..Default::default()
        };
        assert!(config.is_test_mode());
        assert!(!config.is_live_mode());
    }

    #[test]
    fn test_is_live_mode() {
        let config = ProviderConfig {
            secret_key: "xnd_production_abc".to_string(),
            callback_token: "tok".to_string(),
            ..Default::default()
        };
        assert!(config.is_live_mode());
        assert!(!config.is_test_mode());
    }

    #[test]
    fn test_validation_missing_secret_key() {
        let config = ProviderConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_missing_callback_token() {
        let config = ProviderConfig {
            secret_key: "xnd_development_abc".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_key_prefix() {
        let config = ProviderConfig {
            secret_key: "sk_test_abc".to_string(),
            callback_token: "tok".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_insecure_base_url() {
        let config = ProviderConfig {
            secret_key: "xnd_development_abc".to_string(),
            callback_token: "tok".to_string(),
            base_url: "http://api.xendit.co".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_valid_config() {
        let config = ProviderConfig {
            secret_key: "xnd_development_abc".to_string(),
            callback_token: "tok".to_string(),
            webhook_signing_key: Some("whk".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
