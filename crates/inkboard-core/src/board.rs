//! Board records: threads, posts and the reserved special threads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Author name used when the name field is left blank.
pub const ANONYMOUS: &str = "Anonymous";

pub type ThreadId = i64;
pub type PostId = i64;

/// Input rejected locally, before any remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Thread title is empty")]
    EmptyTitle,
    #[error("Only administrators can create {0} threads")]
    ReservedTitle(&'static str),
    #[error("Post is empty")]
    EmptyPost,
    #[error("Drawing is blank")]
    EmptyDrawing,
    #[error("No thread selected")]
    NoThreadSelected,
    #[error("A post is already being submitted")]
    SubmitInFlight,
}

/// Threads identified by a reserved title and shown in the pinned area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecialThread {
    /// Today's case.
    TheCase,
    /// Important announcements.
    TopNews,
    /// Drawing game.
    DrawIt,
}

impl SpecialThread {
    pub const ALL: [SpecialThread; 3] = [
        SpecialThread::TheCase,
        SpecialThread::TopNews,
        SpecialThread::DrawIt,
    ];

    /// Canonical stored title.
    pub fn title(self) -> &'static str {
        match self {
            SpecialThread::TheCase => "THE CASE",
            SpecialThread::TopNews => "TOP NEWS",
            SpecialThread::DrawIt => "DRAW IT",
        }
    }

    /// Text shown when no thread of this kind exists.
    pub fn empty_message(self) -> &'static str {
        match self {
            SpecialThread::TheCase => "No case available today.",
            SpecialThread::TopNews => "No important news available.",
            SpecialThread::DrawIt => "No drawing game running.",
        }
    }

    /// Case-insensitive match on a (trimmed) title.
    pub fn from_title(title: &str) -> Option<Self> {
        let title = title.trim();
        Self::ALL
            .into_iter()
            .find(|special| special.title().eq_ignore_ascii_case(title))
    }
}

/// A discussion thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub id: ThreadId,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

impl Thread {
    pub fn special(&self) -> Option<SpecialThread> {
        SpecialThread::from_title(&self.title)
    }

    /// Display label. Special threads carry their creation date since a new
    /// one is posted every day.
    pub fn label(&self) -> String {
        match self.special() {
            Some(_) => format!("{} [{}]", self.title, self.created_at.format("%Y-%m-%d")),
            None => self.title.clone(),
        }
    }
}

/// A reply in a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub thread_id: ThreadId,
    /// Markdown text, or a PNG data URL when `is_drawing` is set.
    pub content: String,
    pub author_name: String,
    #[serde(default, deserialize_with = "null_as_false")]
    pub is_drawing: bool,
    pub created_at: DateTime<Utc>,
}

// Rows written before the drawing column existed carry `null`.
fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

/// Row sent to create a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewThread {
    pub title: String,
}

impl NewThread {
    /// Trim and validate a user-entered title.
    pub fn validated(title: &str) -> Result<Self, ValidationError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if let Some(special) = SpecialThread::from_title(title) {
            return Err(ValidationError::ReservedTitle(special.title()));
        }
        Ok(Self {
            title: title.to_string(),
        })
    }
}

/// Row sent to create a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPost {
    pub thread_id: ThreadId,
    pub content: String,
    pub author_name: String,
    pub is_drawing: bool,
}

impl NewPost {
    /// Text reply. `content` is sent as typed.
    pub fn text(thread_id: ThreadId, content: String, author_name: &str) -> Self {
        Self {
            thread_id,
            content,
            author_name: author_or_anonymous(author_name),
            is_drawing: false,
        }
    }

    /// Drawing reply carrying an encoded image.
    pub fn drawing(thread_id: ThreadId, payload: String, author_name: &str) -> Self {
        Self {
            thread_id,
            content: payload,
            author_name: author_or_anonymous(author_name),
            is_drawing: true,
        }
    }
}

/// Trimmed author name, or [`ANONYMOUS`] when blank.
pub fn author_or_anonymous(name: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        ANONYMOUS.to_string()
    } else {
        name.to_string()
    }
}
