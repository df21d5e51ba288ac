use std::fmt;

use serde::{Serialize, Serializer};

/// A shape code outside the known categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown shape code {0}")]
pub struct UnknownShapeCode(pub i64);

/// Lexical shape category of a single token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeCategory {
    Function,
    Content,
    Discourse,
    Other,
    EndOfSequence,
}

impl ShapeCategory {
    pub const EOS_CODE: i64 = -2;

    /// Map an upstream shape code to its category
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(ShapeCategory::Function),
            1 => Some(ShapeCategory::Content),
            2 => Some(ShapeCategory::Discourse),
            3 => Some(ShapeCategory::Other),
            Self::EOS_CODE => Some(ShapeCategory::EndOfSequence),
            _ => None,
        }
    }

    /// Classify a token, forcing incomplete words (trailing dash) to `Other`
    pub fn for_token(token: &str, code: i64) -> Result<Self, UnknownShapeCode> {
        if token.ends_with('-') {
            return Ok(ShapeCategory::Other);
        }
        Self::from_code(code).ok_or(UnknownShapeCode(code))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ShapeCategory::Function => "FUNC",
            ShapeCategory::Content => "CON",
            ShapeCategory::Discourse => "DISC",
            ShapeCategory::Other => "OTHER",
            ShapeCategory::EndOfSequence => "EOS",
        }
    }
}

impl fmt::Display for ShapeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ShapeCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Representative shape of a view's error tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeSummary {
    Uniform(ShapeCategory),
    Mix,
}

impl ShapeSummary {
    /// Summarize a shape run whose final entry is the closing context.
    /// Returns `None` when there are fewer than two entries.
    pub fn of(shapes: &[ShapeCategory]) -> Option<Self> {
        let (_, run) = shapes.split_last()?;
        let first = *run.first()?;
        if run.iter().all(|s| *s == first) {
            Some(ShapeSummary::Uniform(first))
        } else {
            Some(ShapeSummary::Mix)
        }
    }
}

impl fmt::Display for ShapeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeSummary::Uniform(shape) => write!(f, "{}", shape),
            ShapeSummary::Mix => f.write_str("MIX"),
        }
    }
}

impl Serialize for ShapeSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
