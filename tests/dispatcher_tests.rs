#![allow(clippy::unwrap_used)]

use async_trait::async_trait;
use club_membership_bot::campaigns::{BroadcastDispatcher, DispatchReport};
use club_membership_bot::channel::{NotificationChannel, OutboundMessage, SendOutcome};
use club_membership_bot::database::connection::DatabaseManager;
use club_membership_bot::database::models::Member;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::{tempdir, TempDir};

/// Channel stub with a scripted outcome per recipient.
#[derive(Default)]
struct ScriptedChannel {
    outcomes: HashMap<i64, SendOutcome>,
    sent_order: Mutex<Vec<i64>>,
}

#[async_trait]
impl NotificationChannel for ScriptedChannel {
    async fn send(&self, recipient: i64, _message: &OutboundMessage) -> SendOutcome {
        self.sent_order.lock().unwrap().push(recipient);
        self.outcomes
            .get(&recipient)
            .cloned()
            .unwrap_or(SendOutcome::Delivered)
    }

    async fn revoke_access(&self, _recipient: i64) -> anyhow::Result<()> {
        Ok(())
    }
}

async fn setup_test_db() -> (Arc<DatabaseManager>, TempDir) {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test.db");
    let db_url = format!("sqlite:{}", db_path.to_string_lossy());

    let db = DatabaseManager::new(&db_url).await.unwrap();
    db.run_migrations().await.unwrap();
    (Arc::new(db), dir)
}

fn dispatcher(channel: Arc<ScriptedChannel>, db: Arc<DatabaseManager>) -> BroadcastDispatcher {
    BroadcastDispatcher::new(channel, db).with_pacing(Duration::ZERO)
}

#[tokio::test]
async fn test_counts_successes_and_failures_independently() {
    let (db, _tmp) = setup_test_db().await;
    for id in [1, 2, 3] {
        Member::upsert(&db.pool, id, None, None).await.unwrap();
    }

    let mut channel = ScriptedChannel::default();
    channel.outcomes.insert(2, SendOutcome::Failed("timeout".to_string()));
    let channel = Arc::new(channel);

    let report = dispatcher(channel.clone(), db)
        .dispatch(&OutboundMessage::text("hello"), &[1, 2, 3])
        .await;

    assert_eq!(report, DispatchReport { success: 2, failed: 1 });
    // One transient failure never aborts the rest of the fan-out.
    assert_eq!(*channel.sent_order.lock().unwrap(), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_permanent_rejection_marks_member_blocked() {
    let (db, _tmp) = setup_test_db().await;
    for id in [1, 2, 3] {
        Member::upsert(&db.pool, id, None, None).await.unwrap();
    }

    let mut channel = ScriptedChannel::default();
    channel.outcomes.insert(2, SendOutcome::Blocked);
    let channel = Arc::new(channel);

    let report = dispatcher(channel, db.clone())
        .dispatch(&OutboundMessage::text("hello"), &[1, 2, 3])
        .await;

    assert_eq!(report, DispatchReport { success: 2, failed: 1 });

    let blocked = Member::find_by_id(&db.pool, 2).await.unwrap().unwrap();
    assert!(blocked.blocked);
    let untouched = Member::find_by_id(&db.pool, 1).await.unwrap().unwrap();
    assert!(!untouched.blocked);
}

#[tokio::test]
async fn test_empty_recipient_set_is_a_noop() {
    let (db, _tmp) = setup_test_db().await;
    let channel = Arc::new(ScriptedChannel::default());

    let report = dispatcher(channel.clone(), db)
        .dispatch(&OutboundMessage::text("hello"), &[])
        .await;

    assert_eq!(report, DispatchReport::default());
    assert!(channel.sent_order.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_sends_are_strictly_ordered() {
    let (db, _tmp) = setup_test_db().await;
    let channel = Arc::new(ScriptedChannel::default());

    let recipients: Vec<i64> = (1..=20).collect();
    let report = dispatcher(channel.clone(), db)
        .dispatch(&OutboundMessage::text("hello"), &recipients)
        .await;

    assert_eq!(report.success, 20);
    assert_eq!(*channel.sent_order.lock().unwrap(), recipients);
}
