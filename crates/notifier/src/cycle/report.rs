//! Outcome of one poll cycle

use std::fmt;

use crate::models::{Identity, MessageId, Watermark};

/// A notification that could not be delivered this cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDispatch {
    pub message_id: MessageId,
    pub received_at: i64,
    pub reason: String,
}

/// Statistics from one cycle
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub identity: Identity,
    /// Watermark loaded at cycle start
    pub previous_watermark: Option<Watermark>,
    /// Watermark persisted at cycle end (equal to previous when unchanged)
    pub watermark: Option<Watermark>,
    /// Number of messages matching the query
    pub candidates: usize,
    /// Number of candidates past the watermark
    pub new_messages: usize,
    /// Number of notifications delivered
    pub sent: usize,
    pub failures: Vec<FailedDispatch>,
    /// Whether a refreshed credential was written back
    pub credential_refreshed: bool,
    /// Duration of the cycle
    pub duration_ms: u64,
}

impl CycleReport {
    pub fn watermark_advanced(&self) -> bool {
        self.watermark != self.previous_watermark
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.new_messages == 0 {
            return write!(
                f,
                "No emails for \"{}\" matching query since we last checked ({} candidates, {} ms)",
                self.identity, self.candidates, self.duration_ms
            );
        }

        write!(
            f,
            "Sent {} notification(s) to {}",
            self.sent, self.identity
        )?;
        if !self.failures.is_empty() {
            write!(f, ", {} failed", self.failures.len())?;
        }
        match self.watermark {
            Some(w) if self.watermark_advanced() => write!(f, "; watermark now {}", w)?,
            _ => write!(f, "; watermark unchanged")?,
        }
        write!(f, " ({} ms)", self.duration_ms)
    }
}
