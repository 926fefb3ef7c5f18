//! Session cookie rendering (`Set-Cookie` values for login and logout)

use crate::{auth::jwt::IssuedToken, config::AppConfig, error::AppError};
use axum::http::HeaderValue;

/// SameSite cookie attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Attributes of the cookie that carries the session token
#[derive(Debug, Clone)]
pub struct SessionCookie {
    pub name: String,
    pub secure: bool,
    pub same_site: SameSite,
}

impl SessionCookie {
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let same_site = match config.security.cookie_same_site.to_lowercase().as_str() {
            "strict" => SameSite::Strict,
            "lax" => SameSite::Lax,
            "none" => SameSite::None,
            other => return Err(AppError::Config(format!("Unknown SameSite value: {}", other))),
        };

        Ok(Self {
            name: config.security.cookie_name.clone(),
            secure: config.security.cookie_secure,
            same_site,
        })
    }

    /// `Set-Cookie` value that hands the token to the client
    pub fn issue(&self, issued: &IssuedToken) -> Result<HeaderValue, AppError> {
        let expires = issued.expires_at.format("%a, %d %b %Y %H:%M:%S GMT");
        self.render(&issued.token, &format!("Expires={}", expires))
    }

    /// `Set-Cookie` value that tells the client to drop the token
    pub fn clear(&self) -> Result<HeaderValue, AppError> {
        self.render("", "Max-Age=0")
    }

    fn render(&self, value: &str, lifetime: &str) -> Result<HeaderValue, AppError> {
        let mut cookie = format!(
            "{}={}; Path=/; {}; HttpOnly; SameSite={}",
            self.name,
            value,
            lifetime,
            self.same_site.as_str()
        );
        if self.secure {
            cookie.push_str("; Secure");
        }

        HeaderValue::from_str(&cookie)
            .map_err(|e| AppError::Internal(format!("Invalid Set-Cookie value: {}", e)))
    }
}
