use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The profile fields a client supplies when creating a session.
///
/// Carries no password: credentials belong to the credential store alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProfile {
    pub username: String,
    pub email: String,
}

/// Server-held state correlated with a client by the `sessionId` cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub session_id: String,
    pub username: String,
    pub email: String,
    pub theme: Theme,
    pub created_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(session_id: String, profile: SessionProfile, created_at: DateTime<Utc>) -> Self {
        SessionRecord {
            session_id,
            username: profile.username,
            email: profile.email,
            theme: Theme::default(),
            created_at,
        }
    }
}
