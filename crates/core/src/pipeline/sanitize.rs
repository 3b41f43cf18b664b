//! Per-field rules that turn untrusted model values into validated primitives.
//!
//! Lengths are counted in chars. A missing, `null` or wrong-typed string field
//! reads as the empty string; a missing or `null` integer field reads as zero.

use crate::llm::json::ParsedTree;
use serde_json::Value;

pub const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("item is not an object")]
    NotAnObject,

    #[error("`{field}` is missing or empty")]
    Empty { field: &'static str },

    #[error("`{field}` has {len} chars (max {max})")]
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("`{field}` is not an integer")]
    NotInteger { field: &'static str },

    #[error("`{field}` = {value} is outside {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
}

/// What happens when a string field is empty or longer than its bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnInvalid {
    /// Empty or overlong rejects the item.
    Reject,
    /// Overlong is cut to `max - 3` chars plus [`ELLIPSIS`]; empty rejects.
    Truncate,
    /// Empty or overlong is replaced by the token.
    Default(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRule {
    /// First key is the canonical field name; later keys are accepted aliases.
    pub keys: &'static [&'static str],
    pub max_chars: usize,
    pub on_invalid: OnInvalid,
}

impl TextRule {
    pub const fn reject(keys: &'static [&'static str], max_chars: usize) -> Self {
        Self {
            keys,
            max_chars,
            on_invalid: OnInvalid::Reject,
        }
    }

    pub const fn truncate(keys: &'static [&'static str], max_chars: usize) -> Self {
        Self {
            keys,
            max_chars,
            on_invalid: OnInvalid::Truncate,
        }
    }

    pub const fn defaulted(
        keys: &'static [&'static str],
        max_chars: usize,
        default: &'static str,
    ) -> Self {
        Self {
            keys,
            max_chars,
            on_invalid: OnInvalid::Default(default),
        }
    }

    pub fn field(&self) -> &'static str {
        self.keys.first().copied().unwrap_or("<unnamed>")
    }

    pub fn apply(&self, obj: &ParsedTree) -> Result<String, Rejection> {
        let value = lookup(obj, self.keys)
            .and_then(Value::as_str)
            .unwrap_or("")
            .trim();
        let len = value.chars().count();
        let field = self.field();

        match self.on_invalid {
            OnInvalid::Default(token) if len == 0 || len > self.max_chars => Ok(token.to_string()),
            OnInvalid::Default(_) => Ok(value.to_string()),
            _ if len == 0 => Err(Rejection::Empty { field }),
            OnInvalid::Reject if len > self.max_chars => Err(Rejection::TooLong {
                field,
                len,
                max: self.max_chars,
            }),
            OnInvalid::Truncate if len > self.max_chars => {
                Ok(truncate_with_ellipsis(value, self.max_chars))
            }
            _ => Ok(value.to_string()),
        }
    }
}

/// Inclusive integer bounds. Values are never clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntRule {
    pub keys: &'static [&'static str],
    pub min: i64,
    pub max: i64,
}

impl IntRule {
    pub const fn new(keys: &'static [&'static str], min: i64, max: i64) -> Self {
        Self { keys, min, max }
    }

    pub fn apply(&self, obj: &ParsedTree) -> Result<i64, Rejection> {
        let field = self.keys.first().copied().unwrap_or("<unnamed>");
        let value = match lookup(obj, self.keys) {
            None => 0,
            // Floats and out-of-i64 numbers are not integers here.
            Some(Value::Number(n)) => n.as_i64().ok_or(Rejection::NotInteger { field })?,
            Some(_) => return Err(Rejection::NotInteger { field }),
        };

        if !(self.min..=self.max).contains(&value) {
            return Err(Rejection::OutOfRange {
                field,
                value,
                min: self.min,
                max: self.max,
            });
        }
        Ok(value)
    }
}

/// First non-null value among `keys`.
pub fn lookup<'a>(obj: &'a ParsedTree, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| !v.is_null())
}

/// Cuts `value` to exactly `max_chars` chars, the last three being [`ELLIPSIS`].
pub fn truncate_with_ellipsis(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let keep = max_chars.saturating_sub(ELLIPSIS.len());
    let mut out: String = value.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}
