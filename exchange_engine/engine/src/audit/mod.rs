use std::collections::VecDeque;
use std::sync::Mutex;

use tracing::{info, warn};

/// Kind of exchange event being tracked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditEventType {
    Publish,
    Payment,
    TaskSubmit,
    Reconstruct,
    Error,
}

impl AuditEventType {
    pub fn label(&self) -> &'static str {
        match self {
            AuditEventType::Publish => "PUBLISH",
            AuditEventType::Payment => "PAYMENT",
            AuditEventType::TaskSubmit => "TASK",
            AuditEventType::Reconstruct => "RECONSTRUCT",
            AuditEventType::Error => "ERROR",
        }
    }
}

/// Record of one exchange event
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub event_type: AuditEventType,
    /// Data id or task id the event belongs to.
    pub session_id: String,
    /// Wallet address that triggered the event, when known.
    pub participant: Option<String>,
    pub message: String,
    pub timestamp: String, // RFC3339
}

impl AuditRecord {
    pub fn new(event_type: AuditEventType, session_id: &str, message: impl Into<String>) -> Self {
        AuditRecord {
            event_type,
            session_id: session_id.to_string(),
            participant: None,
            message: message.into(),
            timestamp: now_rfc3339(),
        }
    }

    pub fn participant(mut self, address: &str) -> Self {
        self.participant = Some(address.to_string());
        self
    }
}

/// Bounded in-memory audit trail; the oldest entry is evicted once full.
pub struct AuditTracker {
    records: Mutex<VecDeque<AuditRecord>>,
    max_entries: usize,
}

impl Default for AuditTracker {
    fn default() -> Self {
        Self::new(500)
    }
}

impl AuditTracker {
    pub fn new(max_entries: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(max_entries)),
            max_entries: max_entries.max(1),
        }
    }

    /// Record a new event in the audit log
    pub fn log(&self, record: AuditRecord) {
        let participant = record.participant.as_deref().unwrap_or("-");
        if record.event_type == AuditEventType::Error {
            warn!(event = record.event_type.label(), session = %record.session_id, participant, "{}", record.message);
        } else {
            info!(event = record.event_type.label(), session = %record.session_id, participant, "{}", record.message);
        }

        // a poisoned trail still accepts records
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        if records.len() == self.max_entries {
            records.pop_front(); // evict oldest
        }
        records.push_back(record);
    }

    /// Most recent first.
    pub fn recent(&self, count: usize) -> Vec<AuditRecord> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.iter().rev().take(count).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Helper to get current timestamp as RFC3339 string
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
