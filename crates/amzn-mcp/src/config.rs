//! Server configuration.

use amzn_core::{Connector, Credentials, Error, FixtureConnector, TotpSecret};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::Cli;

pub const USERNAME_VAR: &str = "AMAZON_USERNAME";
pub const PASSWORD_VAR: &str = "AMAZON_PASSWORD";
pub const OTP_SECRET_VAR: &str = "AMAZON_OTP_SECRET";
pub const BASE_URL_VAR: &str = "AMAZON_BASE_URL";
pub const FIXTURE_VAR: &str = "AMAZON_ORDERS_FIXTURE";

const DEFAULT_BASE_URL: &str = "https://www.amazon.com";

/// Server configuration
#[derive(Clone)]
pub struct Config {
    /// Amazon account email or phone
    pub username: Option<String>,
    /// Amazon account password
    pub password: Option<String>,
    /// Base32 authenticator secret; when set, 2FA codes are generated
    pub otp_secret: Option<String>,
    /// Storefront to sign in to
    pub base_url: String,
    /// Serve orders from this JSON file instead of amazon.com
    pub fixture_path: Option<PathBuf>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("Config")
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("otp_secret", &redact(&self.otp_secret))
            .field("base_url", &self.base_url)
            .field("fixture_path", &self.fixture_path)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            username: None,
            password: None,
            otp_secret: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            fixture_path: None,
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// Call after `.env` has been loaded; values are read once and never
    /// re-read.
    pub fn load() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            username: get(USERNAME_VAR),
            password: get(PASSWORD_VAR),
            otp_secret: get(OTP_SECRET_VAR),
            base_url: get(BASE_URL_VAR).unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            fixture_path: get(FIXTURE_VAR).map(PathBuf::from),
        }
    }

    /// Apply command line overrides
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(base_url) = &cli.base_url {
            self.base_url = base_url.clone();
        }
        if let Some(fixture) = &cli.fixture {
            self.fixture_path = Some(fixture.clone());
        }
    }

    /// Credentials for sign-in, or a configuration error naming what is missing
    pub fn credentials(&self) -> amzn_core::Result<Credentials> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => {
                let credentials = Credentials::new(username, password);
                match &self.otp_secret {
                    Some(secret) => {
                        let secret = TotpSecret::parse(secret)
                            .map_err(|e| Error::Config(format!("{}: {}", OTP_SECRET_VAR, e)))?;
                        Ok(credentials.with_otp_secret(secret))
                    }
                    None => Ok(credentials),
                }
            }
            (username, password) => Err(Error::Config(format!(
                "{} and {} environment variables must be set. Found: username={}, password={}",
                USERNAME_VAR,
                PASSWORD_VAR,
                if username.is_some() { "set" } else { "NOT SET" },
                if password.is_some() { "set" } else { "NOT SET" },
            ))),
        }
    }

    /// Build the order backend this configuration selects
    pub fn connector(&self) -> amzn_core::Result<Arc<dyn Connector>> {
        if let Some(path) = &self.fixture_path {
            return Ok(Arc::new(FixtureConnector::from_file(path)?));
        }
        self.amazon_connector()
    }

    #[cfg(feature = "amazon")]
    fn amazon_connector(&self) -> amzn_core::Result<Arc<dyn Connector>> {
        Ok(Arc::new(amzn_core::amazon::AmazonConnector::new(
            &self.base_url,
        )?))
    }

    #[cfg(not(feature = "amazon"))]
    fn amazon_connector(&self) -> amzn_core::Result<Arc<dyn Connector>> {
        Err(Error::Config(format!(
            "Built without the amazon backend; set {} to a fixture file",
            FIXTURE_VAR
        )))
    }
}
