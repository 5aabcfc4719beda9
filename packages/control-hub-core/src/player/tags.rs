//! Media tag lists and their text serialization.
//!
//! Tags are extracted by the player; the hub only stores them and renders them
//! for the `/tags` endpoint in the classic structure text form:
//!
//! ```text
//! taglist, title=(string)"Big Buck Bunny", bitrate=(uint)1200000;
//! ```

use std::fmt::Write;

use thiserror::Error;

/// Errors raised while serializing a tag list.
#[derive(Debug, Error, PartialEq)]
pub enum TagError {
    #[error("invalid tag name: {0:?}")]
    InvalidName(String),

    #[error("tag {0:?} holds a non-finite number")]
    NonFinite(String),
}

/// A single tag value.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    String(String),
    UInt(u64),
    Int(i64),
    Double(f64),
    Boolean(bool),
}

impl TagValue {
    fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::UInt(v) if *v > u32::MAX as u64 => "guint64",
            Self::UInt(_) => "uint",
            Self::Int(v) if *v > i32::MAX as i64 || *v < i32::MIN as i64 => "gint64",
            Self::Int(_) => "int",
            Self::Double(_) => "double",
            Self::Boolean(_) => "boolean",
        }
    }
}

impl From<&str> for TagValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for TagValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<u64> for TagValue {
    fn from(value: u64) -> Self {
        Self::UInt(value)
    }
}

impl From<u32> for TagValue {
    fn from(value: u32) -> Self {
        Self::UInt(value as u64)
    }
}

impl From<i64> for TagValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for TagValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<bool> for TagValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

/// Ordered list of named tags. Names may repeat (e.g. several artists).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TagList {
    entries: Vec<(String, TagValue)>,
}

impl TagList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a tag, builder style.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<TagValue>) -> Self {
        self.push(name, value);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<TagValue>) {
        self.entries.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&TagValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders the list as structure text.
    pub fn serialize(&self) -> Result<String, TagError> {
        let mut out = String::from("taglist");

        for (name, value) in &self.entries {
            if !is_valid_name(name) {
                return Err(TagError::InvalidName(name.clone()));
            }
            // Writing into a String cannot fail.
            let _ = write!(out, ", {}=({})", name, value.type_name());
            match value {
                TagValue::String(s) => {
                    out.push('"');
                    for c in s.chars() {
                        if c == '"' || c == '\\' {
                            out.push('\\');
                        }
                        out.push(c);
                    }
                    out.push('"');
                }
                TagValue::UInt(v) => {
                    let _ = write!(out, "{}", v);
                }
                TagValue::Int(v) => {
                    let _ = write!(out, "{}", v);
                }
                TagValue::Double(v) => {
                    if !v.is_finite() {
                        return Err(TagError::NonFinite(name.clone()));
                    }
                    let _ = write!(out, "{}", v);
                }
                TagValue::Boolean(v) => out.push_str(if *v { "true" } else { "false" }),
            }
        }

        out.push(';');
        Ok(out)
    }
}

/// Structure field names: non-empty, starting with a letter, made of
/// alphanumerics and `-_+:.`.
fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | ':' | '.'))
}
