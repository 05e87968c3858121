//! Application configuration loaded from environment variables.
//!
//! Secrets (the JWT signing key) are read once at startup. On Cloud Run the
//! secret bindings inject them as environment variables, so no Secret
//! Manager round-trips are needed at runtime.

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// OAuth client ID expected as the `aud` claim of Google ID tokens
    pub google_client_id: String,
    /// Accept federated ID tokens without signature verification when
    /// strict verification fails. Off unless explicitly enabled; every
    /// use is warn-logged.
    pub allow_unverified_id_tokens: bool,

    // --- Token issuance ---
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// `iss` claim stamped into and required from session tokens
    pub jwt_issuer: String,
    /// `aud` claim stamped into and required from session tokens
    pub jwt_audience: String,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            google_client_id: "test-google-client-id.apps.googleusercontent.com".to_string(),
            allow_unverified_id_tokens: false,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            jwt_issuer: "gymdesk-api".to_string(),
            jwt_audience: "gymdesk-clients".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            google_client_id: env::var("GOOGLE_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_ID"))?,
            allow_unverified_id_tokens: env::var("ALLOW_UNVERIFIED_ID_TOKENS")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "gymdesk-api".to_string()),
            jwt_audience: env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "gymdesk-clients".to_string()),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("GOOGLE_CLIENT_ID", "test-client.apps.googleusercontent.com");
        env::set_var("JWT_SIGNING_KEY", "test_jwt_key_32_bytes_minimum!!");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(
            config.google_client_id,
            "test-client.apps.googleusercontent.com"
        );
        assert_eq!(config.port, 8080);
        assert_eq!(config.jwt_issuer, "gymdesk-api");

        // Unverified-token fallback must be opt-in
        env::set_var("ALLOW_UNVERIFIED_ID_TOKENS", "true");
        let config = Config::from_env().expect("Config should load");
        assert!(config.allow_unverified_id_tokens);
        env::remove_var("ALLOW_UNVERIFIED_ID_TOKENS");
    }
}
