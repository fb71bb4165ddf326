use dotenvy::dotenv;
use std::env;
use std::time::Duration;

use crate::error::AppError;
use crate::models::{CurrentUser, UserRef};

#[derive(Debug, Clone)]
pub struct Config {
    /// API base, without trailing slash (e.g. "https://app.example.com/api")
    pub api_base_url: String,
    /// Bearer token; requests are still attempted without one
    pub access_token: Option<String>,
    pub user_id: i64,
    pub username: String,
    pub request_timeout: Duration,
    pub typing_expiry: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();

        let api_base_url = env::var("MESSAGING_API_URL")
            .unwrap_or_else(|_| "http://localhost:8000/api".into())
            .trim_end_matches('/')
            .to_string();
        if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
            return Err(AppError::Config(format!(
                "MESSAGING_API_URL must be an http(s) URL, got {api_base_url}"
            )));
        }

        let access_token = env::var("MESSAGING_ACCESS_TOKEN")
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        let user_id = env::var("MESSAGING_USER_ID")
            .map_err(|_| AppError::Config("MESSAGING_USER_ID missing".into()))?
            .trim()
            .parse::<i64>()
            .map_err(|_| AppError::Config("MESSAGING_USER_ID must be an integer".into()))?;
        let username = env::var("MESSAGING_USERNAME").unwrap_or_default();

        let request_timeout_secs = env::var("MESSAGING_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);
        let typing_expiry_ms = env::var("MESSAGING_TYPING_EXPIRY_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        Ok(Self {
            api_base_url,
            access_token,
            user_id,
            username,
            request_timeout: Duration::from_secs(request_timeout_secs),
            typing_expiry: Duration::from_millis(typing_expiry_ms),
        })
    }

    pub fn current_user(&self) -> CurrentUser {
        CurrentUser::new(UserRef::new(self.user_id, self.username.clone()))
    }

    pub fn test_defaults() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000/api".into(),
            access_token: Some("test-token".into()),
            user_id: 1,
            username: "tester".into(),
            request_timeout: Duration::from_secs(5),
            typing_expiry: Duration::from_millis(3000),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_describe_current_user() {
        let cfg = Config::test_defaults();
        let me = cfg.current_user();
        assert_eq!(me.id(), 1);
        assert_eq!(me.user().username, "tester");
        assert_eq!(cfg.typing_expiry, Duration::from_millis(3000));
    }
}
