//! Amazon sign-in flow.
//!
//! Each response is classified into a [`SignInStep`] and answered until the
//! account page shows a sign-out link or the attempt budget runs out.

use regex::Regex;
use reqwest::Url;
use std::sync::LazyLock;
use tracing::{debug, info};

use super::html::{self, Form};
use super::{Page, MAX_AUTH_ATTEMPTS};
use crate::error::{Error, Result};
use crate::prompt::AuthPrompt;
use crate::types::Credentials;

static ERROR_BOX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)id="auth-error-message-box".*?class="a-alert-content"[^>]*>(.*?)</div>"#)
        .expect("error box regex")
});
static DEVICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)name="otpDeviceContext"[^>]*value="([^"]+)""#).expect("device regex")
});

/// What a sign-in response is asking for
#[derive(Debug, Clone, PartialEq)]
pub enum SignInStep {
    /// The session is authenticated
    SignedIn,
    /// Email and/or password form
    Credentials(Form),
    /// Choose where the OTP is sent
    SelectDevice(Form, String),
    /// One-time passcode form
    Otp(Form),
    /// Amazon wants a CAPTCHA solved
    Captcha,
    /// Amazon rejected the last submission
    Rejected(String),
    /// Nothing recognisable
    Unknown,
}

impl SignInStep {
    /// Classify a sign-in response page
    pub fn detect(page: &str) -> Self {
        if page.contains(r#"id="nav-item-signout""#) {
            return Self::SignedIn;
        }
        if let Some(caps) = ERROR_BOX_RE.captures(page) {
            return Self::Rejected(html::text_of(&caps[1]));
        }
        if page.contains("validateCaptcha") || page.contains("cvf-widget-form-captcha") {
            return Self::Captcha;
        }
        if let Some(form) = html::find_form(page, "auth-mfa-form") {
            return Self::Otp(form);
        }
        if let Some(form) = html::find_form(page, "auth-select-device-form") {
            let device = DEVICE_RE
                .captures(page)
                .map(|c| html::decode_entities(&c[1]))
                .unwrap_or_default();
            return Self::SelectDevice(form, device);
        }
        if let Some(form) = html::find_form(page, r#"name="signIn""#) {
            return Self::Credentials(form);
        }
        Self::Unknown
    }

    fn label(&self) -> &'static str {
        match self {
            Self::SignedIn => "signed-in",
            Self::Credentials(_) => "credentials",
            Self::SelectDevice(..) => "select-device",
            Self::Otp(_) => "otp",
            Self::Captcha => "captcha",
            Self::Rejected(_) => "rejected",
            Self::Unknown => "unknown",
        }
    }
}

/// Drive the sign-in flow starting from `sign_in_url`
pub async fn sign_in(
    http: &reqwest::Client,
    sign_in_url: Url,
    credentials: &Credentials,
    prompt: &dyn AuthPrompt,
    debug_steps: bool,
) -> Result<()> {
    let mut page = Page::fetch(http.get(sign_in_url)).await?;

    for attempt in 1..=MAX_AUTH_ATTEMPTS {
        let step = SignInStep::detect(&page.html);
        if debug_steps {
            info!("sign-in attempt {}: {} at {}", attempt, step.label(), page.url);
        } else {
            debug!("sign-in attempt {}: {}", attempt, step.label());
        }

        page = match step {
            SignInStep::SignedIn => return Ok(()),
            SignInStep::Credentials(mut form) => {
                form.set("email", credentials.username.clone());
                form.set("password", credentials.password.clone());
                form.set("rememberMe", "true");
                submit(http, &page, form).await?
            }
            SignInStep::SelectDevice(mut form, device) => {
                form.set("otpDeviceContext", device);
                submit(http, &page, form).await?
            }
            SignInStep::Otp(mut form) => {
                let code = prompt.prompt("Enter the OTP code from your authenticator app")?;
                form.set("otpCode", code);
                form.set("rememberDevice", "true");
                submit(http, &page, form).await?
            }
            SignInStep::Captcha => {
                return Err(Error::AuthFailed(
                    "Amazon presented a CAPTCHA challenge".to_string(),
                ));
            }
            SignInStep::Rejected(message) => return Err(Error::AuthFailed(message)),
            SignInStep::Unknown => {
                return Err(Error::parse(
                    "sign-in page",
                    format!("unrecognised page at {}", page.url),
                ));
            }
        };
    }

    Err(Error::AuthFailed(
        "Authentication attempts exhausted".to_string(),
    ))
}

async fn submit(http: &reqwest::Client, page: &Page, form: Form) -> Result<Page> {
    let target = match form.action.as_deref().filter(|a| !a.is_empty()) {
        Some(action) => page
            .url
            .join(action)
            .map_err(|e| Error::parse("sign-in form", e.to_string()))?,
        None => page.url.clone(),
    };

    let request = if form.is_get() {
        http.get(target).query(&form.fields)
    } else {
        http.post(target).form(&form.fields)
    };
    Page::fetch(request).await
}
