use crate::audit::{AuditEventType, AuditRecord, AuditTracker, now_rfc3339};

#[test]
fn test_audit_log_adds_and_retrieves() {
    let tracker = AuditTracker::new(10);

    tracker.log(AuditRecord {
        event_type: AuditEventType::Publish,
        session_id: "data_1".into(),
        participant: Some("publisher".into()),
        message: "published 2-of-3".into(),
        timestamp: now_rfc3339(),
    });

    let recent = tracker.recent(1);
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].session_id, "data_1");
    assert_eq!(recent[0].message, "published 2-of-3");
    assert!(chrono::DateTime::parse_from_rfc3339(&recent[0].timestamp).is_ok());
}

#[test]
fn test_audit_log_eviction() {
    let tracker = AuditTracker::new(3);

    for i in 0..5 {
        tracker.log(AuditRecord::new(AuditEventType::Payment, &format!("task_{i}"), format!("paid {i}")));
    }

    let recent = tracker.recent(5);
    assert_eq!(recent.len(), 3); // oldest two evicted
    assert_eq!(recent[0].session_id, "task_4");
    assert_eq!(recent[2].session_id, "task_2");
}

#[test]
fn test_audit_log_thread_safety() {
    let tracker = AuditTracker::new(100);

    std::thread::scope(|scope| {
        for i in 0..10 {
            let tracker = &tracker;
            scope.spawn(move || {
                tracker.log(AuditRecord::new(AuditEventType::TaskSubmit, &format!("thread_{i}"), "submitted"));
            });
        }
    });

    assert_eq!(tracker.recent(10).len(), 10);
    assert_eq!(tracker.len(), 10);
}

#[test]
fn test_event_labels() {
    assert_eq!(AuditEventType::Reconstruct.label(), "RECONSTRUCT");
    assert_eq!(AuditEventType::Error.label(), "ERROR");
}
