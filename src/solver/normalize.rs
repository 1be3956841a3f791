use serde::Serialize;
use std::fmt;

/// Recognized text reduced to ASCII letters and digits, at least the minimum length
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct NormalizedCandidate(String);

impl NormalizedCandidate {
    /// Strip everything outside `[0-9A-Za-z]`; `None` when fewer than
    /// `min_len` characters remain (or none at all)
    pub fn new(raw: &str, min_len: usize) -> Option<Self> {
        let text: String = raw.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
        if text.is_empty() || text.len() < min_len {
            return None;
        }
        Some(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
