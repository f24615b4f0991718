//! Time primitives.
//!
//! Millisecond epochs order changesets within a vertex; the service captures
//! a single "now" per mutation so every stamp written by one operation agrees.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Millisecond epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EpochMs(pub u64);

impl EpochMs {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EpochMs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wall clock capability, injected so tests control time.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// System wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_displays_as_plain_decimal() {
        assert_eq!(EpochMs(0).to_string(), "0");
        assert_eq!(EpochMs(1_724_327_716_271).to_string(), "1724327716271");
    }

    #[test]
    fn epoch_serializes_transparently() {
        let json = serde_json::to_string(&EpochMs(42)).unwrap();
        assert_eq!(json, "42");
        let back: EpochMs = serde_json::from_str("42").unwrap();
        assert_eq!(back, EpochMs(42));
    }
}
