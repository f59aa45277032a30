//! Delegated OAuth2 credentials for the mail provider.
//!
//! The service holds a long-lived refresh token and trades it for a
//! short-lived access token on every send.

mod client;
mod error;

pub use client::{AccessToken, GoogleOAuthClient, OAuthClient, OAuthConfig};
pub use error::TokenError;

#[cfg(test)]
pub use client::MockOAuthClient;

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GMAIL_SEND_SCOPE: &str = "https://www.googleapis.com/auth/gmail.send";
