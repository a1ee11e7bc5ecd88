use myprofile_storage::{FollowerStore, StorageError};
use myprofile_sync::source::mock::MockSource;
use myprofile_sync::{FollowerSync, MutationOutcome, SyncConfig, SyncError};
use myprofile_types::{FollowerId, FollowerRecord};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

fn abc() -> Vec<FollowerRecord> {
    vec![
        FollowerRecord::new("a", "Aruzhan"),
        FollowerRecord::new("b", "Dias"),
        FollowerRecord::new("c", "Abok"),
    ]
}

fn id(s: &str) -> FollowerId {
    FollowerId::from(s)
}

fn ids(records: &[FollowerRecord]) -> Vec<String> {
    records.iter().map(|r| r.id.to_string()).collect()
}

/// Engine whose store and remote both hold `[A, B, C]`.
async fn make_sync() -> (FollowerSync, Arc<MockSource>) {
    let store = Arc::new(FollowerStore::open_in_memory().unwrap());
    store.replace_all(&abc()).unwrap();
    let source = Arc::new(MockSource::with_followers(abc()));
    let sync = FollowerSync::open(store, source.clone(), SyncConfig::default())
        .await
        .unwrap();
    (sync, source)
}

// ── Remove / undo ────────────────────────────────────────────────

#[tokio::test]
async fn remove_takes_record_out_of_list() {
    let (sync, _) = make_sync().await;

    let outcome = sync.remove(&id("b")).await.unwrap();
    assert!(matches!(outcome, MutationOutcome::Pending(_)));
    assert_eq!(ids(&sync.read_all().await.unwrap()), vec!["a", "c"]);
    assert_eq!(ids(&sync.followers()), vec!["a", "c"]);

    let pending = sync.pending_removals().await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].record, abc()[1]);
    assert_eq!(pending[0].position, 1);
    if let MutationOutcome::Pending(token) = outcome {
        assert_eq!(pending[0].token, token);
    }
}

#[tokio::test]
async fn undo_restores_original_position() {
    let (sync, _) = make_sync().await;
    sync.remove(&id("b")).await.unwrap();

    assert_eq!(sync.undo(&id("b")).await.unwrap(), MutationOutcome::Applied);
    assert_eq!(sync.read_all().await.unwrap(), abc());
    assert!(sync.pending_removals().await.is_empty());
}

#[tokio::test]
async fn undo_keeps_other_records_in_order() {
    let (sync, _) = make_sync().await;
    sync.remove(&id("a")).await.unwrap();
    sync.remove(&id("c")).await.unwrap();
    assert_eq!(ids(&sync.followers()), vec!["b"]);

    sync.undo(&id("c")).await.unwrap();
    assert_eq!(ids(&sync.followers()), vec!["b", "c"]);
    sync.undo(&id("a")).await.unwrap();
    assert_eq!(ids(&sync.followers()), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn second_remove_is_idempotent() {
    let (sync, _) = make_sync().await;
    let first = sync.remove(&id("b")).await.unwrap();
    let second = sync.remove(&id("b")).await.unwrap();

    assert!(matches!(first, MutationOutcome::Pending(_)));
    assert_eq!(second, MutationOutcome::AlreadyPending);
    assert_eq!(sync.pending_removals().await.len(), 1);
    assert_eq!(ids(&sync.followers()), vec!["a", "c"]);
}

#[tokio::test]
async fn remove_unknown_is_not_found() {
    let (sync, _) = make_sync().await;
    let mut sub = sync.subscribe();
    sub.try_latest();

    assert_eq!(sync.remove(&id("nope")).await.unwrap(), MutationOutcome::NotFound);
    assert_eq!(sync.followers(), abc());
    assert_eq!(sub.try_recv(), None);
}

#[tokio::test]
async fn undo_without_removal_is_not_found() {
    let (sync, _) = make_sync().await;
    assert_eq!(sync.undo(&id("a")).await.unwrap(), MutationOutcome::NotFound);
    assert_eq!(sync.followers(), abc());
}

// ── Confirm ──────────────────────────────────────────────────────

#[tokio::test]
async fn confirm_is_permanent() {
    let (sync, _) = make_sync().await;
    sync.remove(&id("b")).await.unwrap();

    assert_eq!(sync.confirm(&id("b")).await.unwrap(), MutationOutcome::Applied);
    assert_eq!(sync.undo(&id("b")).await.unwrap(), MutationOutcome::NotFound);
    assert_eq!(sync.confirm(&id("b")).await.unwrap(), MutationOutcome::NotFound);
    assert_eq!(ids(&sync.read_all().await.unwrap()), vec!["a", "c"]);
}

#[tokio::test]
async fn removed_record_can_be_removed_again_after_undo() {
    let (sync, _) = make_sync().await;
    sync.remove(&id("b")).await.unwrap();
    sync.undo(&id("b")).await.unwrap();
    assert!(matches!(
        sync.remove(&id("b")).await.unwrap(),
        MutationOutcome::Pending(_)
    ));
}

// ── Undo window ──────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn undo_within_window_succeeds() {
    let (sync, _) = make_sync().await;
    sync.remove(&id("b")).await.unwrap();

    tokio::time::sleep(Duration::from_millis(3_900)).await;
    assert_eq!(sync.undo(&id("b")).await.unwrap(), MutationOutcome::Applied);
    assert_eq!(sync.followers(), abc());
}

#[tokio::test(start_paused = true)]
async fn window_expiry_confirms() {
    let (sync, _) = make_sync().await;
    sync.remove(&id("b")).await.unwrap();

    tokio::time::sleep(Duration::from_millis(4_100)).await;
    assert!(sync.pending_removals().await.is_empty());
    assert_eq!(sync.undo(&id("b")).await.unwrap(), MutationOutcome::NotFound);
    assert_eq!(ids(&sync.read_all().await.unwrap()), vec!["a", "c"]);
}

#[tokio::test(start_paused = true)]
async fn old_timer_does_not_confirm_new_removal() {
    let (sync, _) = make_sync().await;
    sync.remove(&id("b")).await.unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;
    sync.undo(&id("b")).await.unwrap();
    sync.remove(&id("b")).await.unwrap();

    // First window would have ended at 4s; the second ends at 6s.
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(sync.pending_removals().await.len(), 1);

    tokio::time::sleep(Duration::from_millis(1_100)).await;
    assert!(sync.pending_removals().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn custom_window_is_used() {
    let store = Arc::new(FollowerStore::open_in_memory().unwrap());
    store.replace_all(&abc()).unwrap();
    let config = SyncConfig { undo_window_ms: 500 };
    let sync = FollowerSync::open(store, Arc::new(MockSource::new()), config)
        .await
        .unwrap();

    sync.remove(&id("a")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(sync.pending_removals().await.is_empty());
}

// ── Interaction with refresh ─────────────────────────────────────

#[tokio::test]
async fn refresh_restores_confirmed_removal() {
    let (sync, _) = make_sync().await;
    sync.remove(&id("b")).await.unwrap();
    sync.confirm(&id("b")).await.unwrap();
    assert_eq!(ids(&sync.read_all().await.unwrap()), vec!["a", "c"]);

    sync.refresh().await.unwrap();
    assert_eq!(sync.read_all().await.unwrap(), abc());
}

#[tokio::test]
async fn refresh_drops_pending_removals() {
    let (sync, _) = make_sync().await;
    sync.remove(&id("b")).await.unwrap();

    sync.refresh().await.unwrap();
    assert!(sync.pending_removals().await.is_empty());
    assert_eq!(sync.read_all().await.unwrap(), abc());
    assert_eq!(sync.undo(&id("b")).await.unwrap(), MutationOutcome::NotFound);
    assert_eq!(sync.read_all().await.unwrap(), abc());
}

#[tokio::test]
async fn failed_refresh_keeps_pending_removals() {
    let (sync, source) = make_sync().await;
    source.push_err("offline");
    sync.remove(&id("b")).await.unwrap();

    assert!(sync.refresh().await.is_err());
    assert_eq!(sync.pending_removals().await.len(), 1);
    assert_eq!(sync.undo(&id("b")).await.unwrap(), MutationOutcome::Applied);
}

// ── Follow-back flag ─────────────────────────────────────────────

#[tokio::test]
async fn toggle_follower_flips_flag() {
    let (sync, _) = make_sync().await;
    let mut sub = sync.subscribe();
    sub.try_latest();

    assert_eq!(sync.toggle_follower(&id("a")).await.unwrap(), MutationOutcome::Applied);
    assert!(sync.followers()[0].following_state);
    assert!(sub.try_recv().unwrap()[0].following_state);

    sync.toggle_follower(&id("a")).await.unwrap();
    assert!(!sync.followers()[0].following_state);
}

#[tokio::test]
async fn set_follower_following_and_missing() {
    let (sync, _) = make_sync().await;
    assert_eq!(
        sync.set_follower_following(&id("c"), true).await.unwrap(),
        MutationOutcome::Applied
    );
    assert!(sync.read_all().await.unwrap()[2].following_state);

    assert_eq!(
        sync.set_follower_following(&id("nope"), true).await.unwrap(),
        MutationOutcome::NotFound
    );
    assert_eq!(sync.toggle_follower(&id("nope")).await.unwrap(), MutationOutcome::NotFound);
}

#[tokio::test]
async fn pending_follower_cannot_be_toggled() {
    let (sync, _) = make_sync().await;
    sync.remove(&id("b")).await.unwrap();
    assert_eq!(sync.toggle_follower(&id("b")).await.unwrap(), MutationOutcome::NotFound);
}

// ── Local add ────────────────────────────────────────────────────

#[tokio::test]
async fn add_follower_appends() {
    let (sync, _) = make_sync().await;
    let record = FollowerRecord::local("Nurgul");

    assert_eq!(sync.add_follower(record.clone()).await.unwrap(), MutationOutcome::Applied);
    let followers = sync.followers();
    assert_eq!(followers.len(), 4);
    assert_eq!(followers[3], record);
}

#[tokio::test]
async fn add_existing_or_pending_is_rejected() {
    let (sync, _) = make_sync().await;
    assert_eq!(
        sync.add_follower(FollowerRecord::new("a", "Again")).await.unwrap(),
        MutationOutcome::AlreadyExists
    );

    sync.remove(&id("b")).await.unwrap();
    assert_eq!(
        sync.add_follower(FollowerRecord::new("b", "Again")).await.unwrap(),
        MutationOutcome::AlreadyPending
    );
    assert_eq!(ids(&sync.followers()), vec!["a", "c"]);
}

#[tokio::test]
async fn undo_after_add_keeps_added_record_last() {
    let (sync, _) = make_sync().await;
    sync.remove(&id("b")).await.unwrap();
    sync.add_follower(FollowerRecord::new("d", "Madi")).await.unwrap();
    sync.undo(&id("b")).await.unwrap();
    assert_eq!(ids(&sync.followers()), vec!["a", "b", "c", "d"]);
}

#[tokio::test]
async fn added_id_is_trimmed() {
    let (sync, _) = make_sync().await;
    sync.add_follower(FollowerRecord::new(" d ", "Madi")).await.unwrap();

    assert_eq!(ids(&sync.read_all().await.unwrap()), vec!["a", "b", "c", "d"]);
    assert!(matches!(
        sync.remove(&id("d")).await.unwrap(),
        MutationOutcome::Pending(_)
    ));
    assert_eq!(ids(&sync.followers()), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn add_blank_id_is_refused() {
    let (sync, _) = make_sync().await;
    let err = sync
        .add_follower(FollowerRecord::new("  ", "Nobody"))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Storage(StorageError::InvalidData(_))));

    assert_eq!(sync.read_all().await.unwrap(), abc());
    assert_eq!(sync.followers(), abc());
    assert!(matches!(
        sync.remove(&id("a")).await.unwrap(),
        MutationOutcome::Pending(_)
    ));
}

// ── Callers that stop waiting ────────────────────────────────────

#[tokio::test]
async fn dropped_remove_still_opens_undo_window() {
    let (sync, _) = make_sync().await;
    let mut sub = sync.subscribe();
    sub.try_latest();

    let b = id("b");
    let mut call = Box::pin(sync.remove(&b));
    assert!(futures::poll!(&mut call).is_pending());
    drop(call);

    assert_eq!(ids(&sub.recv().await.unwrap()), vec!["a", "c"]);
    assert_eq!(sync.read_all().await.unwrap(), sync.followers());
    assert_eq!(sync.pending_removals().await.len(), 1);

    assert_eq!(sync.undo(&b).await.unwrap(), MutationOutcome::Applied);
    assert_eq!(sync.followers(), abc());
}

#[tokio::test]
async fn dropped_undo_still_publishes() {
    let (sync, _) = make_sync().await;
    let b = id("b");
    sync.remove(&b).await.unwrap();
    let mut sub = sync.subscribe();
    sub.try_latest();

    let mut call = Box::pin(sync.undo(&b));
    assert!(futures::poll!(&mut call).is_pending());
    drop(call);

    assert_eq!(sub.recv().await.unwrap(), abc());
    assert_eq!(sync.read_all().await.unwrap(), abc());
    assert!(sync.pending_removals().await.is_empty());
}

#[tokio::test]
async fn dropped_add_still_publishes() {
    let (sync, _) = make_sync().await;
    let mut sub = sync.subscribe();
    sub.try_latest();

    let mut call = Box::pin(sync.add_follower(FollowerRecord::new("d", "Madi")));
    assert!(futures::poll!(&mut call).is_pending());
    drop(call);

    assert_eq!(ids(&sub.recv().await.unwrap()), vec!["a", "b", "c", "d"]);
    assert_eq!(sync.read_all().await.unwrap(), sync.followers());
}
