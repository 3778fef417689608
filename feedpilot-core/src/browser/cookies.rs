use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CookieError {
    #[error("invalid cookie json: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSitePolicy {
    Strict,
    Lax,
    None,
}

impl SameSitePolicy {
    pub const DEFAULT: SameSitePolicy = SameSitePolicy::Lax;

    pub fn as_str(&self) -> &'static str {
        match self {
            SameSitePolicy::Strict => "Strict",
            SameSitePolicy::Lax => "Lax",
            SameSitePolicy::None => "None",
        }
    }
}

impl fmt::Display for SameSitePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SameSitePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Strict" => Ok(SameSitePolicy::Strict),
            "Lax" => Ok(SameSitePolicy::Lax),
            "None" => Ok(SameSitePolicy::None),
            other => Err(format!("unrecognized sameSite value: {other}")),
        }
    }
}

/// One exported cookie. Fields the agent does not interpret are kept in
/// `extra` so a repaired export round-trips without losing data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CookieRecord {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(rename = "sameSite", default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
    #[serde(rename = "expirationDate", default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<f64>,
    #[serde(rename = "httpOnly", default, skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CookieRecord {
    pub fn path(&self) -> &str {
        self.path.as_deref().unwrap_or("/")
    }

    /// Expiry in seconds since the epoch; extension exports name it `expirationDate`.
    pub fn expiry(&self) -> Option<f64> {
        self.expires.or(self.expiration_date)
    }

    pub fn same_site_policy(&self) -> Option<SameSitePolicy> {
        self.same_site
            .as_ref()
            .and_then(Value::as_str)
            .and_then(|value| value.parse().ok())
    }
}

pub fn parse_cookies(payload: &str) -> Result<Vec<CookieRecord>, CookieError> {
    Ok(serde_json::from_str(payload)?)
}

/// Coerces every missing or unrecognized `sameSite` to [`SameSitePolicy::DEFAULT`].
/// Returns how many cookies were changed; a second pass always returns zero.
pub fn normalize_same_site(cookies: &mut [CookieRecord]) -> usize {
    let mut changed = 0;
    for cookie in cookies.iter_mut() {
        if cookie.same_site_policy().is_none() {
            cookie.same_site = Some(Value::String(SameSitePolicy::DEFAULT.as_str().to_string()));
            changed += 1;
        }
    }
    changed
}
