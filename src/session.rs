//! Per-browser session state.
//!
//! A [`Session`] is loaded by the page layer for each request, handed
//! explicitly to whatever needs it (the token bridge, page handlers) and saved
//! back only if something changed.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Error,
    Warning,
    Info,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Success => "success",
            Level::Error => "error",
            Level::Warning => "warning",
            Level::Info => "info",
        }
    }
}

/// One-shot message shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: Level,
    pub message: String,
}

/// Stored payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<Flash>,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    id: Option<String>,
    data: SessionData,
    modified: bool,
    flushed: bool,
}

impl Session {
    /// A session with no stored row yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// A session restored from storage.
    pub fn restore(id: String, data: SessionData) -> Self {
        Self {
            id: Some(id),
            data,
            modified: false,
            flushed: false,
        }
    }

    /// Session with the given credentials, for code that has no stored row.
    pub fn with_tokens(access: Option<&str>, refresh: Option<&str>) -> Self {
        Self {
            data: SessionData {
                access_token: access.map(str::to_string),
                refresh_token: refresh.map(str::to_string),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn data(&self) -> &SessionData {
        &self.data
    }

    /// True if the payload changed since it was loaded.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// True once [`Session::flush`] was called.
    pub fn is_flushed(&self) -> bool {
        self.flushed
    }

    pub fn access_token(&self) -> Option<&str> {
        self.data.access_token.as_deref()
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.data.refresh_token.as_deref()
    }

    pub fn username(&self) -> Option<&str> {
        self.data.username.as_deref()
    }

    /// Start an authenticated session after login.
    pub fn log_in(&mut self, username: &str, access: String, refresh: String) {
        self.data.username = Some(username.to_string());
        self.data.access_token = Some(access);
        self.data.refresh_token = Some(refresh);
        self.modified = true;
    }

    pub fn set_access_token(&mut self, token: String) {
        self.data.access_token = Some(token);
        self.modified = true;
    }

    pub fn set_refresh_token(&mut self, token: String) {
        self.data.refresh_token = Some(token);
        self.modified = true;
    }

    /// Drop both credentials. The username stays so the page layer can tell
    /// "logged out" from "credentials lost".
    pub fn clear_tokens(&mut self) {
        if self.data.access_token.is_some() || self.data.refresh_token.is_some() {
            self.data.access_token = None;
            self.data.refresh_token = None;
            self.modified = true;
        }
    }

    /// Forget everything, including the stored row.
    pub fn flush(&mut self) {
        self.data = SessionData::default();
        self.flushed = true;
        self.modified = true;
    }

    pub fn flash(&mut self, level: Level, message: impl Into<String>) {
        self.data.messages.push(Flash {
            level,
            message: message.into(),
        });
        self.modified = true;
    }

    /// Remove and return pending flash messages.
    pub fn take_messages(&mut self) -> Vec<Flash> {
        if self.data.messages.is_empty() {
            return Vec::new();
        }
        self.modified = true;
        std::mem::take(&mut self.data.messages)
    }
}
