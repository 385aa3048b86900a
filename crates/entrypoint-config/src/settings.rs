//! Values substituted into the application settings file.

use std::fmt;

/// Public URL of the instance, always carrying exactly one trailing slash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrl(String);

impl BaseUrl {
    /// Normalises `raw` so it ends with a single `/`.
    ///
    /// Repeated trailing slashes collapse into one, so `http://host`,
    /// `http://host/` and `http://host//` all yield `http://host/`.
    #[must_use]
    pub fn new(raw: &str) -> Self {
        let trimmed = raw.trim().trim_end_matches('/');
        Self(format!("{trimmed}/"))
    }

    /// Returns the normalised URL.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result proxy (morty) endpoint and its shared HMAC key.
///
/// The key is the base64 text operators pass through `MORTY_KEY`; it is
/// written to the settings file verbatim and never exported to the process
/// server environment.
#[derive(Clone, PartialEq, Eq)]
pub struct ResultProxy {
    url: String,
    key: String,
}

impl ResultProxy {
    /// Builds the proxy settings when both halves are present and non-empty.
    #[must_use]
    pub fn from_parts(url: Option<&str>, key: Option<&str>) -> Option<Self> {
        match (url.map(str::trim), key.map(str::trim)) {
            (Some(url), Some(key)) if !url.is_empty() && !key.is_empty() => Some(Self {
                url: url.to_owned(),
                key: key.to_owned(),
            }),
            _ => None,
        }
    }

    /// Proxy URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Base64 encoded proxy key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Debug for ResultProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultProxy")
            .field("url", &self.url)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Settings values resolved from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsValues {
    /// `general.instance_name`; `None` keeps the template value.
    pub instance_name: Option<String>,
    /// `search.autocomplete`; `None` keeps the template value.
    pub autocomplete: Option<String>,
    /// `server.base_url`; `None` keeps the template placeholder.
    pub base_url: Option<BaseUrl>,
    /// Result proxy block, present only when both URL and key are set.
    pub result_proxy: Option<ResultProxy>,
}
