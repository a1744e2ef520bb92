use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboxKind {
    Message,
    Attendance,
}

impl OutboxKind {
    pub const ALL: [OutboxKind; 2] = [OutboxKind::Message, OutboxKind::Attendance];

    /// Name of the persisted collection holding records of this kind.
    pub fn collection(&self) -> &'static str {
        match self {
            OutboxKind::Message => "offlineMessages",
            OutboxKind::Attendance => "offlineAttendance",
        }
    }

    /// REST path the record is replayed to.
    pub fn rest_path(&self) -> &'static str {
        match self {
            OutboxKind::Message => "/messages",
            OutboxKind::Attendance => "/attendance",
        }
    }
}

/// A mutation captured while offline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboxRecord {
    pub id: String,
    pub kind: OutboxKind,
    pub payload: Value,
    /// Milliseconds since epoch
    pub created_at: i64,
    /// Tie-breaker for records created in the same millisecond
    pub sequence: u64,
}

impl OutboxRecord {
    pub fn order_key(&self) -> (i64, u64) {
        (self.created_at, self.sequence)
    }
}

/// Sort records oldest first.
pub fn sort_by_creation(records: &mut [OutboxRecord]) {
    records.sort_by_key(OutboxRecord::order_key);
}
