use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Placeholder shown when a participant has no usable display name.
pub const ANONYMOUS_NAME: &str = "Anonymous";

/// Maximum question length, counted in characters after trimming.
pub const MAX_QUESTION_CHARS: usize = 280;

/// Real-time group name for a session.
pub fn group_name(session_id: i64) -> String {
    format!("session_{}", session_id)
}

/// Resolve what to show for a participant. Never fails: a missing or blank
/// name falls back to [`ANONYMOUS_NAME`].
pub fn resolve_display_name(name: Option<&str>) -> String {
    match name.map(str::trim) {
        Some(n) if !n.is_empty() => n.to_string(),
        _ => ANONYMOUS_NAME.to_string(),
    }
}

/// Returned by the `FromStr` impls below when a stored value is unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown variant '{}'", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Host,
    Participant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Participant => "participant",
        }
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "host" => Ok(Self::Host),
            "participant" => Ok(Self::Participant),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Moderation state of a question. Questions are never deleted; hiding one
/// is a status change like any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionStatus {
    Queued,
    Selected,
    Answered,
    Hidden,
}

impl QuestionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Selected => "selected",
            Self::Answered => "answered",
            Self::Hidden => "hidden",
        }
    }

    /// Participants may only vote on questions still waiting for the host.
    pub fn accepts_votes(&self) -> bool {
        matches!(self, Self::Queued | Self::Selected)
    }
}

impl FromStr for QuestionStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "selected" => Ok(Self::Selected),
            "answered" => Ok(Self::Answered),
            "hidden" => Ok(Self::Hidden),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentType {
    Html,
    Text,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Text => "text",
        }
    }
}

impl FromStr for ContentType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "html" => Ok(Self::Html),
            "text" => Ok(Self::Text),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}
