//! Fixed-position extraction of numeric results from engine transcripts.
//!
//! Every value the pipeline needs is addressed by a [`Locator`]: either "find this
//! marker phrase, then take the whitespace token `offset` positions after it" or
//! "take token `index` of a character window near the end of the transcript".
//! Failures are reported as [`ParseError`] so they stay distinguishable from
//! process-launch failures.

use std::num::ParseFloatError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("marker phrase '{0}' not found")]
    MarkerNotFound(&'static str),

    #[error("token {index} requested but only {available} available")]
    TokenOutOfRange { index: usize, available: usize },

    #[error("token '{0}' is not a valid index")]
    InvalidIndex(String),

    #[error("token '{token}' is not a number: {source}")]
    InvalidNumber {
        token: String,
        #[source]
        source: ParseFloatError,
    },
}

/// Addresses one whitespace-delimited token in a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locator {
    /// Token `offset` in the text starting at the first occurrence of `marker`
    /// (the marker's own words count as tokens).
    AfterMarker {
        marker: &'static str,
        offset: usize,
    },
    /// Token `index` of the characters between `from_end` and `to_end` before the end.
    TailWindow {
        from_end: usize,
        to_end: usize,
        index: usize,
    },
}

/// A named value to read from a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub locator: Locator,
}

impl Field {
    pub const fn after_marker(name: &'static str, marker: &'static str, offset: usize) -> Self {
        Self {
            name,
            locator: Locator::AfterMarker { marker, offset },
        }
    }

    pub const fn tail_window(
        name: &'static str,
        from_end: usize,
        to_end: usize,
        index: usize,
    ) -> Self {
        Self {
            name,
            locator: Locator::TailWindow {
                from_end,
                to_end,
                index,
            },
        }
    }
}

/// Captured standard output of one engine invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transcript {
    text: String,
}

impl Transcript {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn token(&self, locator: &Locator) -> Result<&str, ParseError> {
        let (region, index) = match *locator {
            Locator::AfterMarker { marker, offset } => {
                let start = self
                    .text
                    .find(marker)
                    .ok_or(ParseError::MarkerNotFound(marker))?;
                (&self.text[start..], offset)
            }
            Locator::TailWindow {
                from_end,
                to_end,
                index,
            } => (self.tail_window(from_end, to_end), index),
        };

        let mut tokens = region.split_whitespace();
        match tokens.nth(index) {
            Some(token) => Ok(token),
            None => Err(ParseError::TokenOutOfRange {
                index,
                available: region.split_whitespace().count(),
            }),
        }
    }

    pub fn number(&self, locator: &Locator) -> Result<f64, ParseError> {
        let token = self.token(locator)?;
        token.parse().map_err(|source| ParseError::InvalidNumber {
            token: token.to_string(),
            source,
        })
    }

    /// Characters `[len - from_end, len - to_end)`, clamped to the start of the text.
    fn tail_window(&self, from_end: usize, to_end: usize) -> &str {
        let total = self.text.chars().count();
        let start = total.saturating_sub(from_end);
        let end = total.saturating_sub(to_end);
        if start >= end {
            return "";
        }
        let byte_at = |char_idx: usize| {
            self.text
                .char_indices()
                .nth(char_idx)
                .map(|(b, _)| b)
                .unwrap_or(self.text.len())
        };
        &self.text[byte_at(start)..byte_at(end)]
    }
}

impl From<String> for Transcript {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}
