//! Apply outcome classification
//!
//! `kubectl apply` exits non-zero in cases that leave the cluster exactly as
//! requested, so its exit status alone cannot tell "nothing to do" from
//! "broken". Each printed `<kind>/<name> <verb>` line is parsed into a typed
//! verb first; free-text markers are the fallback when no line parses.

use crate::executor::ExecResult;
use std::fmt;

/// Markers that mean the object is in place
const SUCCESS_MARKERS: &[&str] = &["unchanged", "configured", "created", "applied"];

const ALREADY_EXISTS: &str = "already exists";

/// Verb kubectl prints after each object it touched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyVerb {
    Created,
    Configured,
    Unchanged,
    ServerSideApplied,
}

impl ApplyVerb {
    fn parse(word: &str) -> Option<Self> {
        match word {
            "created" => Some(ApplyVerb::Created),
            "configured" => Some(ApplyVerb::Configured),
            "unchanged" => Some(ApplyVerb::Unchanged),
            "serverside-applied" => Some(ApplyVerb::ServerSideApplied),
            _ => None,
        }
    }
}

/// What an apply call actually did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// At least one object was created or updated
    Changed,
    /// Everything was already in the requested state
    Unchanged,
    /// The object already exists (create-style conflict)
    AlreadyExists,
    /// Genuine failure with the raw tool output
    Failed(String),
}

impl fmt::Display for ApplyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyOutcome::Changed => f.write_str("changed"),
            ApplyOutcome::Unchanged => f.write_str("unchanged"),
            ApplyOutcome::AlreadyExists => f.write_str("already-exists"),
            ApplyOutcome::Failed(_) => f.write_str("failed"),
        }
    }
}

/// Typed verbs from lines shaped like `ipaddresspool.metallb.io/pool unchanged`
pub fn parse_verbs(output: &str) -> Vec<ApplyVerb> {
    output
        .lines()
        .filter_map(|line| {
            let mut words = line.split_whitespace();
            let object = words.next()?;
            let verb = words.next()?;
            if !object.contains('/') || words.next().is_some() {
                return None;
            }
            ApplyVerb::parse(verb)
        })
        .collect()
}

/// Classify an apply-style result
///
/// `tolerate_existing` additionally accepts "already exists" anywhere in the
/// output or error text.
pub fn classify(result: &ExecResult, tolerate_existing: bool) -> ApplyOutcome {
    let output = result.combined_output();

    let verbs = parse_verbs(&output);
    if !verbs.is_empty() {
        let changed = verbs.iter().any(|v| *v != ApplyVerb::Unchanged);
        return if changed {
            ApplyOutcome::Changed
        } else {
            ApplyOutcome::Unchanged
        };
    }

    if tolerate_existing && output.to_lowercase().contains(ALREADY_EXISTS) {
        return ApplyOutcome::AlreadyExists;
    }

    if result.success {
        return ApplyOutcome::Changed;
    }

    // case-sensitive: kubectl prints these verbs in lowercase
    if SUCCESS_MARKERS.iter().any(|marker| output.contains(marker)) {
        return if output.contains("unchanged") {
            ApplyOutcome::Unchanged
        } else {
            ApplyOutcome::Changed
        };
    }

    ApplyOutcome::Failed(format!(
        "output: [{}], error: [{}]",
        result.data.as_deref().unwrap_or("").trim(),
        result.error.as_deref().unwrap_or("").trim()
    ))
}
