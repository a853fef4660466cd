//! Hub configuration.

use std::path::PathBuf;

use crate::usecase::AuthSettings;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_TOKENS_FILE: &str = "tokens.json";

/// Everything needed to assemble and run a hub.
#[derive(Debug, Clone)]
pub struct HubConfig {
    pub host: String,
    pub port: u16,
    /// Legacy shared secret accepted until an invite system exists
    pub broadcast_secret: Option<String>,
    /// Accept every connection and request without credentials
    pub allow_no_auth: bool,
    pub admin_token: Option<String>,
    pub invite_codes: Vec<String>,
    pub tokens_file: PathBuf,
    /// Optional append-only log of HTTP broadcasts
    pub broadcast_log: Option<PathBuf>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            broadcast_secret: None,
            allow_no_auth: false,
            admin_token: None,
            invite_codes: Vec::new(),
            tokens_file: PathBuf::from(DEFAULT_TOKENS_FILE),
            broadcast_log: None,
        }
    }
}

impl HubConfig {
    pub fn auth_settings(&self) -> AuthSettings {
        AuthSettings {
            allow_no_auth: self.allow_no_auth,
            broadcast_secret: self.broadcast_secret.clone().filter(|s| !s.is_empty()),
            admin_token: self.admin_token.clone().filter(|s| !s.is_empty()),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_secrets_are_treated_as_unset() {
        // テスト項目: 空文字のシークレットは未設定として扱われる
        // given (前提条件):
        let config = HubConfig {
            broadcast_secret: Some(String::new()),
            admin_token: Some(String::new()),
            ..Default::default()
        };

        // when (操作):
        let settings = config.auth_settings();

        // then (期待する結果):
        assert_eq!(settings.broadcast_secret, None);
        assert_eq!(settings.admin_token, None);
        assert_eq!(config.bind_addr(), "127.0.0.1:3001");
    }
}
