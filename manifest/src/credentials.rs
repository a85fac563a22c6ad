use crate::{ManifestError, ManifestResult};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

const API_KEY_PREFIX: &str = "AIza";
const API_KEY_MIN_LEN: usize = 30;

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9]{24}\.[A-Za-z0-9]{6,7}\.[A-Za-z0-9_-]{27}$")
            .expect("token pattern is valid")
    })
}

/// Discord bot tokens are `<24 id chars>.<6-7 chars>.<27 secret chars>`.
pub fn validate_bot_token(token: &str) -> ManifestResult<()> {
    if token_pattern().is_match(token) {
        Ok(())
    } else {
        Err(ManifestError::InvalidCredential {
            field: "Discord bot token".to_string(),
            reason: "expected three dot-separated segments of 24, 6-7 and 27 characters"
                .to_string(),
        })
    }
}

pub fn validate_api_key(key: &str) -> ManifestResult<()> {
    if !key.starts_with(API_KEY_PREFIX) {
        return Err(ManifestError::InvalidCredential {
            field: "Gemini API key".to_string(),
            reason: format!("must start with '{}'", API_KEY_PREFIX),
        });
    }

    if key.len() < API_KEY_MIN_LEN {
        return Err(ManifestError::InvalidCredential {
            field: "Gemini API key".to_string(),
            reason: format!("must be at least {} characters", API_KEY_MIN_LEN),
        });
    }

    Ok(())
}

/// Secrets the deployed bot reads from its environment.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub bot_token: String,
    pub api_key: String,
}

impl Credentials {
    pub fn new(bot_token: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            api_key: api_key.into(),
        }
    }

    pub fn validate(&self) -> ManifestResult<()> {
        validate_bot_token(&self.bot_token)?;
        validate_api_key(&self.api_key)
    }
}

// Never print secrets.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("bot_token", &"<redacted>")
            .field("api_key", &"<redacted>")
            .finish()
    }
}
