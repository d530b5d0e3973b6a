//! Exit code expectations and validation.
//!
//! The expectation is a free-form string: an integer demands that exact
//! code, `true` demands zero, and anything else (including `false`) skips
//! validation entirely. The child tool's own success signal is trusted and
//! re-reported, not reinterpreted.

use anyhow::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitExpectation {
    /// The exit code must equal this value exactly.
    Exact(i32),
    /// No validation; every exit code passes.
    Skip,
}

impl ExitExpectation {
    /// Parses an expectation string. Never fails: unrecognized input means
    /// "do not validate".
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(code) = trimmed.parse::<i32>() {
            return Self::Exact(code);
        }
        if trimmed.eq_ignore_ascii_case("true") {
            return Self::Exact(0);
        }
        Self::Skip
    }

    /// Checks an observed exit code against this expectation.
    pub fn validate(&self, exit_code: i32) -> Result<()> {
        match self {
            Self::Exact(expected) if exit_code != *expected => {
                anyhow::bail!("Invalid exit status: {}", exit_code)
            }
            _ => Ok(()),
        }
    }
}
