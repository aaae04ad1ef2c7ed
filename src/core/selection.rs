// Locked-stream selection and highlight classification

use crate::core::format::Record;
use crate::core::streams::{Direction, StreamInfo, StreamKey};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selection {
    pub stream: StreamKey,
    pub access: Option<String>,
    pub station: Option<String>,
    pub direction: Direction,
}

/// Relation of a record to the locked stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Same stream, same direction.
    Forward,
    /// Same conversation, opposite direction.
    Reverse,
    /// Shares one endpoint with the locked stream.
    Partial,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LockOutcome {
    Locked,
    Switched,
    Unlocked,
}

#[derive(Debug, Default)]
pub struct SelectionState {
    current: Option<Selection>,
}

impl SelectionState {
    pub fn current(&self) -> Option<&Selection> {
        self.current.as_ref()
    }

    pub fn locked_stream(&self) -> Option<&StreamKey> {
        self.current.as_ref().map(|s| &s.stream)
    }

    /// Locks a stream. Locking the stream that is already locked unlocks it;
    /// locking another stream switches directly to it.
    pub fn lock(&mut self, stream: &StreamInfo) -> LockOutcome {
        if self.locked_stream() == Some(&stream.key) {
            self.unlock();
            return LockOutcome::Unlocked;
        }
        let outcome = if self.current.is_some() {
            LockOutcome::Switched
        } else {
            LockOutcome::Locked
        };
        self.current = Some(Selection {
            stream: stream.key.clone(),
            access: stream.access.clone(),
            station: stream.station.clone(),
            direction: stream.direction,
        });
        info!("Locked to: {}", stream.key);
        outcome
    }

    pub fn unlock(&mut self) {
        if self.current.take().is_some() {
            info!("Unlocked");
        }
    }

    pub fn classify(&self, record: &Record) -> Classification {
        let Some(selection) = &self.current else {
            return Classification::None;
        };
        let key = &selection.stream;
        if record.stream == *key {
            Classification::Forward
        } else if record.ta == key.ra && record.ra == key.ta {
            Classification::Reverse
        } else if key.contains(&record.ta) || key.contains(&record.ra) {
            Classification::Partial
        } else {
            Classification::None
        }
    }
}
