//! Location and attribution scope threaded through every pipeline phase.
//!
//! A [`Frame`] pairs the path of the value currently being looked at with the
//! [`Meta`] snapshot of the record that owns it. Frames are plain values:
//! deriving a child frame clones the parent, so an error that captured a frame
//! can never observe a later change made by a sibling branch.
//!
//! # Pointer Construction
//!
//! ```text
//! Frame::root()                         ""
//!   .with_path_segment("basalSchedule")  "/basalSchedule"
//!   .with_path_segment(3)                "/basalSchedule/3"
//!   .pointer_to("rate")                  "/basalSchedule/3/rate"
//! ```
//!
//! # Examples
//!
//! ```rust
//! use structure::{Frame, Meta};
//!
//! let root = Frame::root();
//! let child = root
//!     .with_meta(Meta::new("bolus", Some("pen")))
//!     .with_path_segment("items")
//!     .with_path_segment(3);
//!
//! assert_eq!(child.pointer_to("normal").as_str(), "/items/3/normal");
//! assert!(!root.has_meta());
//! assert!(child.has_meta());
//! ```
use std::fmt;

use serde::{Deserialize, Serialize};

/// Snapshot of the discriminator active when a check ran.
///
/// `Meta` is captured by value. Copies never alias, so mutating a record's own
/// `type` after an error was reported leaves that error's `Meta` untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Meta {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(rename = "subType", default, skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,
}

impl Meta {
    pub fn new(type_: impl Into<String>, sub_type: Option<&str>) -> Self {
        Self {
            type_: type_.into(),
            sub_type: sub_type.map(str::to_owned),
        }
    }
}

impl fmt::Display for Meta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sub_type {
            Some(sub_type) => write!(f, "{}/{}", self.type_, sub_type),
            None => f.write_str(&self.type_),
        }
    }
}

/// One step in a path: an object member name or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Field(String),
    Index(usize),
}

impl From<&str> for Segment {
    fn from(value: &str) -> Self {
        Segment::Field(value.to_owned())
    }
}

impl From<String> for Segment {
    fn from(value: String) -> Self {
        Segment::Field(value)
    }
}

impl From<usize> for Segment {
    fn from(value: usize) -> Self {
        Segment::Index(value)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Field(name) => {
                for ch in name.chars() {
                    match ch {
                        '~' => f.write_str("~0")?,
                        '/' => f.write_str("~1")?,
                        _ => write!(f, "{ch}")?,
                    }
                }
                Ok(())
            }
            Segment::Index(index) => write!(f, "{index}"),
        }
    }
}

/// RFC6901 JSON pointer identifying the exact value a violation refers to.
///
/// The document root is the empty pointer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pointer(String);

impl Pointer {
    pub fn root() -> Self {
        Self(String::new())
    }

    pub fn from_segments<'s>(segments: impl IntoIterator<Item = &'s Segment>) -> Self {
        let mut pointer = String::new();
        for segment in segments {
            pointer.push('/');
            pointer.push_str(&segment.to_string());
        }
        Self(pointer)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for Pointer {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Immutable path + meta scope.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    path: Vec<Segment>,
    meta: Option<Meta>,
}

impl Frame {
    /// Top-level frame: empty path, no meta attached yet.
    pub fn root() -> Self {
        Self::default()
    }

    /// Same path, different meta. The receiver is left as it was.
    pub fn with_meta(&self, meta: Meta) -> Self {
        Self {
            path: self.path.clone(),
            meta: Some(meta),
        }
    }

    /// Same meta, path extended by `segment`.
    pub fn with_path_segment(&self, segment: impl Into<Segment>) -> Self {
        let mut path = self.path.clone();
        path.push(segment.into());
        Self {
            path,
            meta: self.meta.clone(),
        }
    }

    pub fn has_meta(&self) -> bool {
        self.meta.is_some()
    }

    pub fn meta(&self) -> Option<&Meta> {
        self.meta.as_ref()
    }

    pub fn path(&self) -> &[Segment] {
        &self.path
    }

    /// Pointer to the value this frame is scoped to.
    pub fn pointer(&self) -> Pointer {
        Pointer::from_segments(&self.path)
    }

    /// Pointer to a direct child of the value this frame is scoped to.
    pub fn pointer_to(&self, segment: impl Into<Segment>) -> Pointer {
        let segment = segment.into();
        Pointer::from_segments(self.path.iter().chain(std::iter::once(&segment)))
    }
}
