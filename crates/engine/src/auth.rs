// ABOUTME: Authentication-state detection for raw responses, dispatched on an AuthPolicy tag.
// ABOUTME: Looks for login redirects in the final URL and refresh header, and login markers in short bodies.

//! Heuristic login detection.
//!
//! Public sites have no session, so every response counts as authenticated.
//! Sites behind a login are checked against a fixed list of signals, first
//! decisive signal wins. False positives and negatives are possible.

use aho_corasick::AhoCorasick;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::resource::RawResponse;

/// Bodies shorter than this are inspected for login markers.
pub const SHORT_CONTENT_THRESHOLD: usize = 800;

/// Path fragments of login, verification and return-to redirects.
static LOGIN_REDIRECT_MARKERS: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .build(["login", "verify", "checkpoint", "returnto"])
        .unwrap()
});

static LOGIN_BODY_MARKERS: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .build(["login", "not authorized"])
        .unwrap()
});

/// Whether a site needs a logged-in session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthPolicy {
    /// No authentication concept; every response passes.
    #[default]
    Public,
    /// Responses are checked for signs of a logged-out session.
    Authenticated,
}

impl AuthPolicy {
    /// Classifies a response as authenticated or not.
    pub fn is_authenticated(&self, response: &RawResponse) -> bool {
        match self {
            AuthPolicy::Public => true,
            AuthPolicy::Authenticated => looks_logged_in(response),
        }
    }
}

fn looks_logged_in(response: &RawResponse) -> bool {
    if LOGIN_REDIRECT_MARKERS.is_match(&response.final_url) {
        return false;
    }

    if let Some(target) = response.header("refresh").and_then(refresh_target) {
        if LOGIN_REDIRECT_MARKERS.is_match(target) {
            return false;
        }
    }

    let body = match response.body.as_deref() {
        Some(body) => body,
        None => return false,
    };

    !(body.chars().count() < SHORT_CONTENT_THRESHOLD && LOGIN_BODY_MARKERS.is_match(body))
}

/// Extracts the redirect target of a `refresh` header such as `0; url=/login.php`.
fn refresh_target(header: &str) -> Option<&str> {
    let idx = header.to_ascii_lowercase().find("url=")?;
    let target = header[idx + 4..].trim().trim_matches(|c| c == '\'' || c == '"');
    if target.is_empty() {
        None
    } else {
        Some(target)
    }
}
