use axum_extra::extract::cookie::{Cookie, Key, SameSite, SignedCookieJar};
use secrecy::{ExposeSecret, Secret};

use crate::identity_provider::PendingLogin;

pub const SESSION_COOKIE: &str = "session";

#[derive(thiserror::Error, Debug)]
#[error("The session key must be at least 64 bytes long.")]
pub struct SessionKeyError;

/// Derive the cookie signing key from the configured secret.
pub fn session_key(secret: &Secret<String>) -> Result<Key, SessionKeyError> {
    Key::try_from(secret.expose_secret().as_bytes()).map_err(|_| SessionKeyError)
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Administrator {
    pub subject: String,
    pub email: String,
    pub name: String,
}

/// Cookie-backed session state. The whole payload travels in the signed
/// `session` cookie; nothing is kept server side.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Default)]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub administrator: Option<Administrator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_login: Option<PendingLogin>,
}

impl Session {
    /// A missing or unreadable cookie yields an empty session.
    pub fn from_jar(jar: &SignedCookieJar) -> Self {
        jar.get(SESSION_COOKIE)
            .and_then(|cookie| serde_json::from_str(cookie.value()).ok())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.administrator.is_none() && self.pending_login.is_none()
    }

    /// Write the session back into the jar, dropping the cookie entirely
    /// once nothing is left in it.
    pub fn store(self, jar: SignedCookieJar) -> Result<SignedCookieJar, serde_json::Error> {
        if self.is_empty() {
            let removal = Cookie::build(SESSION_COOKIE, "").path("/").finish();
            return Ok(jar.remove(removal));
        }
        let value = serde_json::to_string(&self)?;
        let cookie = Cookie::build(SESSION_COOKIE, value)
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .finish();
        Ok(jar.add(cookie))
    }
}
