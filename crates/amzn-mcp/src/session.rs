//! Session manager.
//!
//! Holds the single authenticated order client. Login replaces it; every
//! other tool borrows it through [`SessionManager::acquire`], which also
//! serializes backend calls.

use amzn_core::{Connector, Credentials, Error, OrderClient, OtpPrompt, Result};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

/// Result of a login call that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    LoggedIn,
    /// 2FA is enabled and no code was supplied
    OtpRequired,
}

#[derive(Default)]
struct SessionState {
    client: Option<Arc<dyn OrderClient>>,
    otp_pending: bool,
}

/// Owner of the process's authenticated session
pub struct SessionManager {
    connector: Arc<dyn Connector>,
    credentials: Result<Credentials>,
    state: Mutex<SessionState>,
}

/// Exclusive access to the authenticated client for one tool call
pub struct ActiveSession<'a> {
    state: MutexGuard<'a, SessionState>,
    client: Arc<dyn OrderClient>,
}

impl ActiveSession<'_> {
    pub fn client(&self) -> &dyn OrderClient {
        self.client.as_ref()
    }

    /// Release the session, dropping the client if the backend reported
    /// that its sign-in has expired.
    pub fn finish<T>(mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if e.is_not_authenticated() {
                warn!("Amazon session expired; amazon_login must be called again");
                self.state.client = None;
            }
        }
        result
    }
}

impl SessionManager {
    /// `credentials` is the outcome of reading configuration; an error is
    /// reported on every login attempt.
    pub fn new(connector: Arc<dyn Connector>, credentials: Result<Credentials>) -> Self {
        Self {
            connector,
            credentials,
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Sign in, replacing any existing session.
    pub async fn login(&self, otp_code: Option<String>, debug: bool) -> Result<LoginOutcome> {
        let mut state = self.state.lock().await;
        state.client = None;

        let credentials = match &self.credentials {
            Ok(c) => c,
            Err(e) => return Err(Error::Config(e.to_string())),
        };

        let prompt = OtpPrompt::new(otp_code).with_secret(credentials.otp_secret.clone());
        info!(
            "Logging in via {} backend (otp code provided: {}, otp secret configured: {})",
            self.connector.name(),
            prompt.has_code(),
            prompt.has_secret()
        );

        match self.connector.login(credentials, &prompt, debug).await {
            Ok(client) => {
                state.client = Some(client);
                state.otp_pending = false;
                info!("Login succeeded");
                Ok(LoginOutcome::LoggedIn)
            }
            Err(Error::OtpRequired) => {
                state.otp_pending = true;
                info!("Login waiting for OTP code");
                Ok(LoginOutcome::OtpRequired)
            }
            Err(e) => {
                if prompt.otp_requested() {
                    state.otp_pending = true;
                }
                warn!("Login failed: {}", e);
                Err(e)
            }
        }
    }

    /// Borrow the authenticated client, or fail with [`Error::NotAuthenticated`].
    ///
    /// The returned guard blocks other tool calls until dropped.
    pub async fn acquire(&self) -> Result<ActiveSession<'_>> {
        let guard = self.state.lock().await;
        let client = guard.client.clone().ok_or(Error::NotAuthenticated)?;
        Ok(ActiveSession {
            state: guard,
            client,
        })
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.lock().await.client.is_some()
    }

    /// Whether the last login stopped at an OTP challenge
    pub async fn otp_pending(&self) -> bool {
        self.state.lock().await.otp_pending
    }
}
