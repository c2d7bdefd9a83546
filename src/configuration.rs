use secrecy::{ExposeSecret, Secret};
use serde_aux::field_attributes::deserialize_number_from_string;
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use url::Url;

use crate::domain::MemberEmail;

/// Fixed path segment appended to the member mount point to reach the
/// verification confirmation endpoint.
pub const VERIFY_SEGMENT: &str = "verify";

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub email_client: EmailClientSettings,
    pub reminders: ReminderSettings,
    pub identity_provider: Option<IdentityProviderSettings>,
    #[serde(default)]
    pub enrollment: EnrollmentSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    pub public_address: String,
    pub session_key: Secret<String>,
    pub member_mount_point: String,
    pub static_dir: String,
    pub environment: Environment,
}

impl ApplicationSettings {
    pub fn challenge_response_url(&self) -> Result<Url, PublicAddressError> {
        challenge_response_url(&self.public_address, &self.member_mount_point)
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: Secret<String>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    pub database_name: String,
    pub require_ssl: bool,
}

impl DatabaseSettings {
    pub fn without_db(&self) -> PgConnectOptions {
        let ssl_mode = if self.require_ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };
        PgConnectOptions::new()
            .host(&self.host)
            .username(&self.username)
            .password(self.password.expose_secret())
            .port(self.port)
            .ssl_mode(ssl_mode)
    }

    pub fn with_db(&self) -> PgConnectOptions {
        self.without_db().database(&self.database_name)
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct EmailClientSettings {
    pub base_url: String,
    pub sender_email: String,
    pub authorization_token: Secret<String>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_milliseconds: u64,
}

impl EmailClientSettings {
    pub fn sender(&self) -> Result<MemberEmail, String> {
        MemberEmail::parse(self.sender_email.clone())
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_milliseconds)
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct ReminderSettings {
    /// Seconds to wait between two sweeps. This is distinct from the
    /// period at which any given member is reminded.
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub check_period_seconds: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub reminder_interval_hours: i64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_concurrency: usize,
}

impl ReminderSettings {
    pub fn check_period(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.check_period_seconds)
    }

    pub fn reminder_interval(&self) -> chrono::Duration {
        chrono::Duration::hours(self.reminder_interval_hours)
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct IdentityProviderSettings {
    pub issuer: String,
    pub client_id: String,
    pub client_secret: Secret<String>,
}

#[derive(serde::Deserialize, Clone, Default)]
pub struct EnrollmentSettings {
    #[serde(default)]
    pub capacity: Option<u64>,
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir()
        .map_err(|e| config::ConfigError::Message(e.to_string()))?;
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;
    let environment_filename = format!("{}.yaml", environment.as_str());

    let mut builder = config::Config::builder()
        .add_source(config::File::from(configuration_directory.join("base.yaml")))
        .add_source(config::File::from(
            configuration_directory.join(environment_filename),
        ))
        // E.g. `APP_APPLICATION__PORT=5001` would set `Settings.application.port`
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .set_override("application.environment", environment.as_str())?;

    // The hosting platform hands us the port to listen on.
    if let Ok(port) = std::env::var("PORT") {
        builder = builder.set_override("application.port", port)?;
    }

    builder.build()?.try_deserialize::<Settings>()
}

#[derive(serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }

    /// Development environments expose error chains on error pages.
    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Local)
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. \
                Use either `local` or `production`.",
                other
            )),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum PublicAddressError {
    #[error("The public address is missing.")]
    Missing,
    #[error("The public address `{address}` is not a valid URL.")]
    Malformed {
        address: String,
        #[source]
        source: url::ParseError,
    },
    #[error("The public address `{0}` cannot be used as a base URL.")]
    NotABase(String),
}

/// Joins the public address, the member mount point and the `verify`
/// segment into the link members follow to complete verification.
pub fn challenge_response_url(
    public_address: &str,
    member_mount_point: &str,
) -> Result<Url, PublicAddressError> {
    public_url(public_address, &[member_mount_point, VERIFY_SEGMENT])
}

/// Resolves `parts` below the path of the public address. Empty and `.`
/// segments are dropped, `..` removes the previous one.
pub fn public_url(public_address: &str, parts: &[&str]) -> Result<Url, PublicAddressError> {
    let address = public_address.trim();
    if address.is_empty() {
        return Err(PublicAddressError::Missing);
    }
    let mut url = Url::parse(address).map_err(|source| PublicAddressError::Malformed {
        address: address.to_owned(),
        source,
    })?;
    if url.cannot_be_a_base() {
        return Err(PublicAddressError::NotABase(address.to_owned()));
    }

    let mut segments: Vec<&str> = Vec::new();
    for part in std::iter::once(url.path()).chain(parts.iter().copied()) {
        for segment in part.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                segment => segments.push(segment),
            }
        }
    }
    let path = format!("/{}", segments.join("/"));
    url.set_path(&path);

    Ok(url)
}
