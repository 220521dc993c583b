//! API server configuration.

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:8080").
    pub bind_addr: String,
    /// Include the plaintext reset token in `/forgot-password` responses.
    ///
    /// Development only: in production the token must reach the user through
    /// a trusted channel such as email.
    pub expose_reset_token: bool,
    /// Accept and re-hash passwords stored before hashing was introduced.
    pub upgrade_legacy_passwords: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".into(),
            expose_reset_token: false,
            upgrade_legacy_passwords: false,
        }
    }
}
