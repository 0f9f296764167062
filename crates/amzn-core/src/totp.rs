//! Time-based one-time passcodes (RFC 6238) from a stored 2FA secret.
//!
//! Amazon's authenticator-app setup shows a base32 secret. With it
//! configured, sign-in answers OTP prompts without asking the user.

use std::fmt;

use data_encoding::BASE32_NOPAD;
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::error::{Error, Result};

type HmacSha1 = Hmac<Sha1>;

/// Seconds each code stays valid
pub const STEP_SECS: u64 = 30;
const DIGITS: u32 = 6;

/// Decoded TOTP shared secret
#[derive(Clone, PartialEq, Eq)]
pub struct TotpSecret {
    key: Vec<u8>,
}

impl TotpSecret {
    /// Parse a base32 secret as shown by Amazon (spaces and case ignored).
    pub fn parse(encoded: &str) -> Result<Self> {
        let normalized: String = encoded
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect::<String>()
            .trim_end_matches('=')
            .to_ascii_uppercase();
        if normalized.is_empty() {
            return Err(Error::Config("OTP secret is empty".to_string()));
        }
        let key = BASE32_NOPAD
            .decode(normalized.as_bytes())
            .map_err(|e| Error::Config(format!("OTP secret is not valid base32: {}", e)))?;
        Ok(Self { key })
    }

    /// Code for the time step containing `unix_secs`
    pub fn code_at(&self, unix_secs: u64) -> Result<String> {
        let counter = unix_secs / STEP_SECS;
        let mut mac = HmacSha1::new_from_slice(&self.key)
            .map_err(|e| Error::Config(format!("OTP secret rejected: {}", e)))?;
        mac.update(&counter.to_be_bytes());
        let hash = mac.finalize().into_bytes();

        let offset = (hash[hash.len() - 1] & 0x0f) as usize;
        let binary = u32::from_be_bytes([
            hash[offset] & 0x7f,
            hash[offset + 1],
            hash[offset + 2],
            hash[offset + 3],
        ]);
        Ok(format!(
            "{:0width$}",
            binary % 10u32.pow(DIGITS),
            width = DIGITS as usize
        ))
    }

    /// Code for the current time
    pub fn current_code(&self) -> Result<String> {
        let now = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default();
        self.code_at(now)
    }
}

impl fmt::Debug for TotpSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TotpSecret(<redacted>)")
    }
}
