mod support;

use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use support::{harness, harness_with_config, survival, threshold};
use volley_remote::codec;
use volley_sync::SyncConfig;
use volley_types::{MatchId, MatchKind, MatchRecord, Player, PlayerId};

#[tokio::test]
async fn save_online_writes_both_sides() {
    let h = harness(true);
    let m = threshold("ftx_1", "p1", "p2", 1_000);

    h.service.save_threshold_match(m.clone()).await.unwrap();

    assert!(
        h.remote
            .doc(codec::THRESHOLD_COLLECTION, "ftx_1")
            .is_some()
    );
    let stored = h
        .service
        .local()
        .get_match(MatchKind::Threshold, &m.id)
        .unwrap()
        .unwrap();
    assert!(stored.synced());
    assert_eq!(h.service.pending_upload_count(), 0);
}

#[tokio::test]
async fn save_offline_commits_locally_and_queues() {
    let h = harness(false);
    let m = survival("fsv_1", "p1", 1_000);

    h.service.save_survival_match(m.clone()).await.unwrap();

    assert_eq!(h.remote.doc_count(codec::SURVIVAL_COLLECTION), 0);
    let stored = h
        .service
        .local()
        .get_match(MatchKind::Survival, &m.id)
        .unwrap()
        .unwrap();
    assert!(!stored.synced());
    assert_eq!(h.service.pending_upload_count(), 1);

    // Connectivity regained: a drain flushes the queue
    h.network.set_online(true);
    h.service.drain().await.unwrap();

    assert!(h.remote.doc(codec::SURVIVAL_COLLECTION, "fsv_1").is_some());
    assert!(
        h.service
            .local()
            .get_match(MatchKind::Survival, &m.id)
            .unwrap()
            .unwrap()
            .synced()
    );
    assert_eq!(h.service.pending_upload_count(), 0);
}

#[tokio::test]
async fn save_with_degraded_remote_queues_instead_of_failing() {
    let h = harness(true);
    h.remote.set_failing(true);
    let m = threshold("ftx_1", "p1", "p2", 1_000);

    // The save must succeed even though every remote call faults
    h.service.save_match(m.clone().into()).await.unwrap();
    assert_eq!(h.service.pending_upload_count(), 1);
    assert_eq!(h.remote.doc_count(codec::THRESHOLD_COLLECTION), 0);

    h.remote.set_failing(false);
    h.service.drain().await.unwrap();
    assert!(h.remote.doc(codec::THRESHOLD_COLLECTION, "ftx_1").is_some());
    assert_eq!(h.service.pending_upload_count(), 0);
}

#[tokio::test]
async fn retried_upload_of_existing_document_counts_as_success() {
    let h = harness(true);
    let m = threshold("ftx_1", "p1", "p2", 1_000);
    // Simulate a write that landed remotely but whose ack was lost
    h.remote.seed(
        codec::THRESHOLD_COLLECTION,
        "ftx_1",
        codec::threshold_to_document(&m),
    );

    h.service.save_match(m.clone().into()).await.unwrap();

    assert_eq!(h.remote.doc_count(codec::THRESHOLD_COLLECTION), 1);
    assert!(
        h.service
            .local()
            .get_match(MatchKind::Threshold, &m.id)
            .unwrap()
            .unwrap()
            .synced()
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn hung_remote_probe_cannot_stall_a_save() {
    let mut config = SyncConfig::eager();
    config.probe_timeout_secs = 1;
    let h = harness_with_config(true, config);
    // Degraded backend: the probe hangs far past the budget and every
    // other call faults
    h.remote.set_ping_delay(Duration::from_secs(30));
    h.remote.set_failing(true);
    let m = threshold("ftx_1", "p1", "p2", 1_000);

    let started = Instant::now();
    h.service.save_threshold_match(m.clone()).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(h.service.pending_upload_count(), 1);
    assert!(
        !h.service
            .local()
            .get_match(MatchKind::Threshold, &m.id)
            .unwrap()
            .unwrap()
            .synced()
    );
    assert_eq!(h.remote.doc_count(codec::THRESHOLD_COLLECTION), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_drain_requests_collapse_into_one_pass() {
    let h = harness(false);
    h.service.save_survival_match(survival("fsv_1", "p1", 1_000)).await.unwrap();
    h.remote.set_create_delay(Duration::from_secs(2));
    h.network.set_online(true);

    let svc = h.service.clone();
    let first = tokio::spawn(async move { svc.drain().await });
    tokio::time::sleep(Duration::from_millis(200)).await;

    // Second request while the first pass is mid-upload: dropped, not run
    let started = Instant::now();
    h.service.drain().await.unwrap();
    assert!(started.elapsed() < Duration::from_millis(500));
    assert_eq!(h.remote.create_calls.load(Ordering::SeqCst), 1);

    first.await.unwrap().unwrap();
    assert_eq!(h.remote.create_calls.load(Ordering::SeqCst), 1);
    assert!(h.remote.doc(codec::SURVIVAL_COLLECTION, "fsv_1").is_some());
    assert_eq!(h.service.pending_upload_count(), 0);
}

#[tokio::test]
async fn unsynced_scans_are_throttled_between_drains() {
    let mut config = SyncConfig::eager();
    config.scan_min_interval_secs = 60;
    let h = harness_with_config(true, config);
    h.service
        .local()
        .save_match(&threshold("ftx_1", "p1", "p2", 1_000).into())
        .unwrap();

    h.service.drain().await.unwrap();
    assert!(h.remote.doc(codec::THRESHOLD_COLLECTION, "ftx_1").is_some());

    // A second unsynced row lands inside the scan interval; the immediate
    // follow-up drain must skip the full-table rescan
    h.service
        .local()
        .save_match(&threshold("ftx_2", "p1", "p2", 2_000).into())
        .unwrap();
    h.service.drain().await.unwrap();

    assert!(h.remote.doc(codec::THRESHOLD_COLLECTION, "ftx_2").is_none());
    assert_eq!(h.remote.create_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn probe_failure_enqueue_still_drains_earlier_backlog() {
    let h = harness(false);
    h.service.save_survival_match(survival("fsv_old", "p1", 1_000)).await.unwrap();
    h.network.set_online(true);
    h.remote.set_ping_failing(true);

    h.service.save_survival_match(survival("fsv_new", "p1", 2_000)).await.unwrap();

    // The failed probe queued the new record, and that enqueue triggered a
    // drain that delivered the whole backlog
    assert!(h.remote.doc(codec::SURVIVAL_COLLECTION, "fsv_old").is_some());
    assert!(h.remote.doc(codec::SURVIVAL_COLLECTION, "fsv_new").is_some());
    assert_eq!(h.service.pending_upload_count(), 0);
}

#[tokio::test]
async fn saving_the_same_match_twice_keeps_one_document() {
    let h = harness(true);
    let m = threshold("ftx_1", "p1", "p2", 1_000);

    h.service.save_threshold_match(m.clone()).await.unwrap();
    h.service.save_threshold_match(m.clone()).await.unwrap();

    assert_eq!(h.remote.doc_count(codec::THRESHOLD_COLLECTION), 1);
    assert!(
        h.service
            .local()
            .get_match(MatchKind::Threshold, &m.id)
            .unwrap()
            .unwrap()
            .synced()
    );
}

#[tokio::test]
async fn offline_match_appears_immediately_and_syncs_later() {
    let h = harness(false);
    let mut m = threshold("ftx_1", "p1", "ai_computer", 1_000);
    m.owner_score = 5;
    m.opponent_score = 3;
    m.elapsed_seconds = 42;
    h.service.save_threshold_match(m.clone()).await.unwrap();

    let rows = h
        .service
        .list_matches(MatchKind::Threshold, Some(&PlayerId::new("p1")), Some(50))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id().as_str(), "ftx_1");
    assert!(!rows[0].synced());

    h.network.set_online(true);
    h.service.drain().await.unwrap();

    let rows = h
        .service
        .list_matches(MatchKind::Threshold, Some(&PlayerId::new("p1")), Some(50))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].synced());
    let doc = h.remote.doc(codec::THRESHOLD_COLLECTION, "ftx_1").unwrap();
    assert_eq!(doc.get_str(codec::FIELD_OWNER_ID), Some("p1"));
    assert_eq!(doc.get_i64("owner_score"), Some(5));
    assert_eq!(doc.get_i64("opponent_score"), Some(3));
    assert_eq!(doc.get_i64("elapsed_seconds"), Some(42));
}

#[tokio::test]
async fn drain_is_a_noop_while_offline() {
    let h = harness(false);
    h.service.save_match(survival("fsv_1", "p1", 1_000).into()).await.unwrap();

    h.service.drain().await.unwrap();

    assert_eq!(h.service.pending_upload_count(), 1);
    assert_eq!(h.remote.doc_count(codec::SURVIVAL_COLLECTION), 0);
}

#[tokio::test]
async fn drain_scan_picks_up_rows_queued_by_a_previous_process() {
    let h = harness(true);
    // Written straight to storage: the in-memory queue never saw it
    h.service
        .local()
        .save_match(&threshold("ftx_1", "p1", "p2", 1_000).into())
        .unwrap();

    h.service.drain().await.unwrap();

    assert!(h.remote.doc(codec::THRESHOLD_COLLECTION, "ftx_1").is_some());
    assert!(
        h.service
            .local()
            .get_match(MatchKind::Threshold, &MatchId::new("ftx_1"))
            .unwrap()
            .unwrap()
            .synced()
    );
}

#[tokio::test]
async fn delete_offline_queues_remote_delete() {
    let h = harness(true);
    let m = survival("fsv_1", "p1", 1_000);
    h.service.save_match(m.clone().into()).await.unwrap();

    h.network.set_online(false);
    h.service.delete_match(MatchKind::Survival, &m.id).await.unwrap();

    // Local row gone immediately, remote copy still standing
    assert!(
        h.service
            .local()
            .get_match(MatchKind::Survival, &m.id)
            .unwrap()
            .is_none()
    );
    assert!(h.remote.doc(codec::SURVIVAL_COLLECTION, "fsv_1").is_some());
    assert_eq!(h.service.status().unwrap().pending_deletes, 1);

    h.network.set_online(true);
    h.service.drain().await.unwrap();

    assert!(h.remote.doc(codec::SURVIVAL_COLLECTION, "fsv_1").is_none());
    assert_eq!(h.service.status().unwrap().pending_deletes, 0);
}

#[tokio::test]
async fn deleting_an_absent_remote_document_is_success() {
    let h = harness(true);
    let m = threshold("ftx_1", "p1", "p2", 1_000);
    h.service.local().save_match(&m.clone().into()).unwrap();

    // Never uploaded, so the remote delete hits nothing
    h.service.delete_match(MatchKind::Threshold, &m.id).await.unwrap();

    assert_eq!(h.service.status().unwrap().pending_deletes, 0);
}

#[tokio::test]
async fn list_merges_remote_wins_and_caches_locally() {
    let h = harness(true);
    let local_only = threshold("ftx_local", "p1", "p2", 1_000);
    h.service.local().save_match(&local_only.clone().into()).unwrap();

    let remote_only = threshold("ftx_remote", "p1", "p3", 2_000);
    h.remote.seed(
        codec::THRESHOLD_COLLECTION,
        "ftx_remote",
        codec::threshold_to_document(&remote_only),
    );

    // Same id on both sides with different payloads: remote wins
    let mut contested = threshold("ftx_both", "p1", "p4", 3_000);
    h.service.local().save_match(&contested.clone().into()).unwrap();
    contested.owner_score = 21;
    h.remote.seed(
        codec::THRESHOLD_COLLECTION,
        "ftx_both",
        codec::threshold_to_document(&contested),
    );

    let rows = h
        .service
        .list_matches(MatchKind::Threshold, None, None)
        .await
        .unwrap();

    let ids: Vec<&str> = rows.iter().map(|r| r.id().as_str()).collect();
    assert_eq!(ids, vec!["ftx_both", "ftx_remote", "ftx_local"]);
    let MatchRecord::Threshold(won) = &rows[0] else {
        panic!("wrong kind");
    };
    assert_eq!(won.owner_score, 21);

    // Remote-only row got cached as already synced
    let cached = h
        .service
        .local()
        .get_match(MatchKind::Threshold, &remote_only.id)
        .unwrap()
        .unwrap();
    assert!(cached.synced());
}

#[tokio::test]
async fn list_filters_threshold_owner_in_either_slot() {
    let h = harness(true);
    let as_owner = threshold("ftx_a", "p1", "p2", 1_000);
    let as_opponent = threshold("ftx_b", "p3", "p1", 2_000);
    let unrelated = threshold("ftx_c", "p3", "p4", 3_000);
    for m in [&as_owner, &as_opponent, &unrelated] {
        h.remote.seed(
            codec::THRESHOLD_COLLECTION,
            m.id.as_str(),
            codec::threshold_to_document(m),
        );
    }

    let rows = h
        .service
        .list_matches(MatchKind::Threshold, Some(&PlayerId::new("p1")), None)
        .await
        .unwrap();

    let ids: Vec<&str> = rows.iter().map(|r| r.id().as_str()).collect();
    assert_eq!(ids, vec!["ftx_b", "ftx_a"]);
}

#[tokio::test]
async fn list_suppresses_rows_awaiting_deletion() {
    let h = harness(true);
    let m = survival("fsv_1", "p1", 1_000);
    h.remote.seed(
        codec::SURVIVAL_COLLECTION,
        "fsv_1",
        codec::survival_to_document(&m),
    );
    h.service
        .local()
        .enqueue_pending_delete(MatchKind::Survival, &m.id)
        .unwrap();

    let rows = h
        .service
        .list_matches(MatchKind::Survival, None, None)
        .await
        .unwrap();

    assert!(rows.is_empty());
}

#[tokio::test]
async fn list_falls_back_to_local_when_remote_faults() {
    let h = harness(true);
    let m = survival("fsv_1", "p1", 1_000);
    h.service.local().save_match(&m.clone().into()).unwrap();
    h.remote.set_failing(true);

    let rows = h
        .service
        .list_matches(MatchKind::Survival, None, None)
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id().as_str(), "fsv_1");
}

#[tokio::test]
async fn list_offline_serves_local_rows_with_limit() {
    let h = harness(false);
    for i in 0..5 {
        h.service
            .local()
            .save_match(&survival(&format!("fsv_{i}"), "p1", i64::from(i)).into())
            .unwrap();
    }

    let rows = h
        .service
        .list_matches(MatchKind::Survival, None, Some(2))
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].id().as_str(), "fsv_4");
    assert_eq!(rows[1].id().as_str(), "fsv_3");
}

#[tokio::test]
async fn leaderboard_merges_remote_wins_but_keeps_local_losses() {
    let h = harness(true);
    let mut local = Player::new(PlayerId::new("p1"), "Ada");
    local.win_count = 1;
    local.loss_count = 3;
    h.service.local().upsert_player(&local).unwrap();

    // Remote copy is ahead on wins and knows nothing of losses
    let mut remote = local.clone();
    remote.win_count = 5;
    remote.loss_count = 0;
    h.remote.seed(
        codec::PLAYERS_COLLECTION,
        "p1",
        codec::player_to_document(&remote),
    );

    let board = h.service.get_leaderboard(None).await.unwrap();

    assert_eq!(board.len(), 1);
    assert_eq!(board[0].win_count, 5);
    assert_eq!(board[0].loss_count, 3);

    let cached = h
        .service
        .local()
        .get_player(&PlayerId::new("p1"))
        .unwrap()
        .unwrap();
    assert_eq!(cached.win_count, 5);
    assert_eq!(cached.loss_count, 3);
}

#[tokio::test]
async fn leaderboard_orders_by_wins_then_recency() {
    let h = harness(false);
    for (id, wins, updated) in [("p1", 2, 10), ("p2", 5, 5), ("p3", 2, 20)] {
        let mut p = Player::new(PlayerId::new(id), id);
        p.win_count = wins;
        p.updated_at = updated;
        h.service.local().upsert_player(&p).unwrap();
    }

    let board = h.service.get_leaderboard(Some(2)).await.unwrap();

    let ids: Vec<&str> = board.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["p2", "p3"]);
}

#[tokio::test]
async fn status_reports_backlog() {
    let h = harness(false);
    let m = survival("fsv_1", "p1", 1_000);
    h.service.save_match(m.clone().into()).await.unwrap();
    h.service
        .local()
        .enqueue_pending_delete(MatchKind::Threshold, &MatchId::new("ftx_gone"))
        .unwrap();

    let status = h.service.status().unwrap();
    assert!(!status.online);
    assert_eq!(status.queued_uploads, 1);
    assert_eq!(status.pending_deletes, 1);
}
