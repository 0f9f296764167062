//! Interactive prompts raised during sign-in.
//!
//! Backends never read from a terminal. When the sign-in flow needs input
//! (normally a one-time passcode) it asks an [`AuthPrompt`], and the caller
//! decides whether an answer is available.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Error, Result};
use crate::totp::TotpSecret;

/// Source of answers for prompts raised by a backend's sign-in flow.
pub trait AuthPrompt: Send + Sync {
    /// Answer a prompt, or fail if no answer can be given without a human.
    fn prompt(&self, message: &str) -> Result<String>;
}

/// Keywords that mark a prompt as an OTP request
const OTP_KEYWORDS: [&str; 3] = ["otp", "code", "verification"];

/// Returns true if `message` asks for a one-time passcode.
pub fn is_otp_prompt(message: &str) -> bool {
    let lower = message.to_lowercase();
    OTP_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Prompt that answers OTP requests with a code supplied up front.
///
/// A supplied code wins; otherwise a configured [`TotpSecret`] generates
/// one. With neither, an OTP request fails with [`Error::OtpRequired`] so
/// the caller can ask the user and retry. Any other prompt fails with
/// [`Error::InteractivePrompt`].
#[derive(Debug, Default)]
pub struct OtpPrompt {
    otp_code: Option<String>,
    secret: Option<TotpSecret>,
    otp_requested: AtomicBool,
}

impl OtpPrompt {
    pub fn new(otp_code: Option<String>) -> Self {
        Self {
            otp_code: otp_code
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            secret: None,
            otp_requested: AtomicBool::new(false),
        }
    }

    /// Generate codes from `secret` when no code was supplied
    pub fn with_secret(mut self, secret: Option<TotpSecret>) -> Self {
        self.secret = secret;
        self
    }

    /// Whether the sign-in flow asked for an OTP at any point
    pub fn otp_requested(&self) -> bool {
        self.otp_requested.load(Ordering::SeqCst)
    }

    pub fn has_code(&self) -> bool {
        self.otp_code.is_some()
    }

    pub fn has_secret(&self) -> bool {
        self.secret.is_some()
    }
}

impl AuthPrompt for OtpPrompt {
    fn prompt(&self, message: &str) -> Result<String> {
        if !is_otp_prompt(message) {
            return Err(Error::InteractivePrompt(message.to_string()));
        }
        self.otp_requested.store(true, Ordering::SeqCst);
        match (&self.otp_code, &self.secret) {
            (Some(code), _) => Ok(code.clone()),
            (None, Some(secret)) => secret.current_code(),
            (None, None) => Err(Error::OtpRequired),
        }
    }
}
