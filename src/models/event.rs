use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of accessibility event that produced an observation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    WindowStateChanged,
    ContentChanged,
    Scrolled,
    Clicked,
    Focused,
    Other,
}

impl EventKind {
    /// Important events bypass the evaluation cooldown.
    pub fn is_important(&self) -> bool {
        matches!(
            self,
            EventKind::WindowStateChanged
                | EventKind::ContentChanged
                | EventKind::Scrolled
                | EventKind::Clicked
        )
    }
}

/// One raw observation delivered by the event source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenEvent {
    pub package_id: String,
    pub timestamp_ms: i64,
    #[serde(default)]
    pub text: String,
    pub kind: EventKind,
    /// Class names of the on-screen nodes, when the source walks the tree.
    #[serde(default)]
    pub node_classes: Vec<String>,
}

impl ScreenEvent {
    pub fn new(package_id: &str, timestamp_ms: i64, text: &str, kind: EventKind) -> Self {
        Self {
            package_id: package_id.to_string(),
            timestamp_ms,
            text: text.to_string(),
            kind,
            node_classes: Vec::new(),
        }
    }

    pub fn with_node_classes(mut self, classes: &[&str]) -> Self {
        self.node_classes = classes.iter().map(|c| c.to_string()).collect();
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Video,
    Shopping,
    News,
    Image,
    Text,
    Other,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Video => "video",
            ContentType::Shopping => "shopping",
            ContentType::News => "news",
            ContentType::Image => "image",
            ContentType::Text => "text",
            ContentType::Other => "other",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A (package, content type) pair confirmed by consecutive observations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StableDetection {
    pub package_id: String,
    pub content_type: ContentType,
    pub timestamp_ms: i64,
    pub consecutive: u32,
}

/// A stable detection joined with the screen text it was observed with.
/// Ephemeral: handed to the session manager, never persisted as-is.
#[derive(Debug, Clone)]
pub struct Detection {
    pub package_id: String,
    pub content_type: ContentType,
    pub text: String,
    pub timestamp_ms: i64,
}

impl Detection {
    pub fn from_stable(stable: StableDetection, text: &str) -> Self {
        Self {
            package_id: stable.package_id,
            content_type: stable.content_type,
            text: text.to_string(),
            timestamp_ms: stable.timestamp_ms,
        }
    }
}
