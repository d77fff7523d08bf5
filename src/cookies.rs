//! In-memory cookie jar with whole-replacement semantics.
//!
//! The jar stores the `name=value` pairs from the most recent response that
//! carried any `Set-Cookie` headers. A response with `Set-Cookie` replaces
//! the jar wholesale (header order preserved); a response without leaves it
//! untouched. Attributes after the first `;` or `,` are dropped — no expiry,
//! path, or domain matching is performed.

use log::debug;
use reqwest::header::{HeaderMap, SET_COOKIE};

/// Ordered store of `name=value` cookie strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    entries: Vec<String>,
}

impl CookieJar {
    /// Creates an empty jar.
    pub fn new() -> Self {
        CookieJar::default()
    }

    /// Returns the stored `name=value` entries in insertion order.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Returns true when no cookies are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the value for an outgoing `Cookie` header, or `None` when the
    /// jar is empty.
    pub fn header_value(&self) -> Option<String> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.join("; "))
        }
    }

    /// Replaces the jar contents from a response's `Set-Cookie` headers.
    ///
    /// Each header contributes one entry: the text before the first `;` or
    /// `,`, trimmed. Headers with non-UTF-8 values are skipped. If the map
    /// carries no `Set-Cookie` header at all, the jar is left untouched.
    ///
    /// # Returns
    ///
    /// `true` if the jar was replaced.
    pub fn replace_from(&mut self, headers: &HeaderMap) -> bool {
        let mut replacement = Vec::new();
        for header in headers.get_all(SET_COOKIE) {
            if let Ok(value) = header.to_str() {
                if let Some(pair) = value.split([';', ',']).next() {
                    replacement.push(pair.trim().to_string());
                }
            }
        }

        if replacement.is_empty() {
            return false;
        }

        debug!("Replacing cookie jar with {} entries", replacement.len());
        self.entries = replacement;
        true
    }
}
