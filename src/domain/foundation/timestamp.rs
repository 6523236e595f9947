//! Unix-seconds timestamp value object.
//!
//! The store persists all creation times as unix seconds; display ordering
//! within a channel relies on these being server-assigned and
//! non-decreasing.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in time with one-second resolution.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// The current time.
    pub fn now() -> Self {
        Self(Utc::now().timestamp())
    }

    /// Wraps a raw unix-seconds value.
    pub fn from_unix(secs: i64) -> Self {
        Self(secs)
    }

    /// Returns the raw unix-seconds value.
    pub fn as_unix(&self) -> i64 {
        self.0
    }

    /// This timestamp shifted forward by `secs` seconds.
    pub fn plus_secs(&self, secs: i64) -> Self {
        Self(self.0 + secs)
    }

    /// Whether this timestamp lies strictly in the future.
    pub fn is_future(&self) -> bool {
        self.0 > Utc::now().timestamp()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
