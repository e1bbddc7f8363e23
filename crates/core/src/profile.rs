//! Public profile of a subject (display handle).

use serde::{Deserialize, Serialize};

use crate::SubjectId;

/// A row of the `profiles` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: SubjectId,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl Profile {
    /// Name to show next to a subject's messages.
    pub fn display_name(&self) -> String {
        let nonblank = |s: &&str| !s.trim().is_empty();
        self.full_name
            .as_deref()
            .filter(nonblank)
            .or(self.username.as_deref().filter(nonblank))
            .map(str::to_string)
            .unwrap_or_else(|| self.id.prefix(8).to_string())
    }
}

/// Normalize free text into a handle: lowercase `[a-z0-9_]`, no leading,
/// trailing or repeated underscores. Returns `fallback` when nothing survives.
pub fn slugify_handle(raw: &str, fallback: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.trim().to_lowercase().chars() {
        let c = if c == '-' { '_' } else { c };
        if !(c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') {
            continue;
        }
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }

    let slug = out.trim_matches('_');
    if slug.is_empty() {
        fallback.to_string()
    } else {
        slug.to_string()
    }
}
