//! Blink sampling
//!
//! Turns a per-frame eyes-closed signal into discrete blink events.

use tracing::debug;

use crate::types::{BlinkEvent, Millis};

/// Tracks the current closed-eye interval
#[derive(Debug, Clone, Default)]
pub struct BlinkSampler {
    /// Time the eyes closed, or `None` while they are open
    closed_since: Option<Millis>,
}

impl BlinkSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one sample; returns a blink when a closed interval ends.
    ///
    /// Repeated closed samples keep the first start time. A stream that
    /// begins closed starts the interval at its first sample.
    pub fn observe(&mut self, t_ms: Millis, eyes_closed: bool) -> Option<BlinkEvent> {
        match (eyes_closed, self.closed_since) {
            (true, None) => {
                debug!("Eyes closed at {:.1}ms", t_ms);
                self.closed_since = Some(t_ms);
                None
            }
            (false, Some(start_ms)) => {
                self.closed_since = None;
                let blink = BlinkEvent::new(start_ms, t_ms);
                debug!("Blink: {:.0}ms", blink.duration_ms);
                Some(blink)
            }
            _ => None,
        }
    }

    /// Whether a closed interval is in progress
    pub fn is_closed(&self) -> bool {
        self.closed_since.is_some()
    }

    /// Start of the closed interval in progress
    pub fn closed_since(&self) -> Option<Millis> {
        self.closed_since
    }
}
