mod common;

use std::sync::Arc;

use chrono::Utc;
use common::{FakePrometheus, engine, entry, test_store};
use strikr_backend::dto::leaderboard_dto::{LeaderboardFilter, SortOrder};
use strikr_backend::dto::prometheus_dto::LeaderboardPlayer;
use strikr_backend::dto::region_dto::Region;
use strikr_backend::services::leaderboard_sync::LeaderboardSync;
use strikr_backend::services::prometheus::PrometheusApi;
use strikr_backend::services::snapshot_store::SnapshotStore;

fn board(prefix: &str, len: usize) -> Vec<LeaderboardPlayer> {
    (1..=len)
        .map(|rank| entry(&format!("{prefix}{rank}"), &format!("{prefix}-player-{rank}"), rank as i64))
        .collect()
}

fn sync(
    store: &SnapshotStore,
    fake: &Arc<FakePrometheus>,
    regions: Vec<Region>,
    with_history: bool,
) -> LeaderboardSync {
    let upstream: Arc<dyn PrometheusApi> = fake.clone();
    LeaderboardSync::new(
        store.clone(),
        upstream,
        Arc::new(engine(store, fake)),
        regions,
        25,
        with_history,
    )
}

#[tokio::test]
async fn pages_until_total_items_and_replaces_stale_rows() {
    let store = test_store().await;
    let fake = FakePrometheus::new();
    fake.set_board(Region::Global, board("g", 60));
    store
        .upsert_leaderboard_entry(Region::Global, &entry("stale", "gone", 1), Utc::now())
        .await
        .unwrap();

    let report = sync(&store, &fake, vec![Region::Global], false).run().await.unwrap();

    let region = &report.regions[0];
    assert_eq!(region.pages, 3);
    assert_eq!(region.rows_written, 60);
    assert!(!region.aborted);
    assert_eq!(
        *fake.pages_requested.lock().unwrap(),
        vec![(Region::Global, 0), (Region::Global, 25), (Region::Global, 50)]
    );
    assert_eq!(store.count_leaderboard_region(Region::Global).await.unwrap(), 60);

    let top = store
        .query_leaderboard(Region::Global, LeaderboardFilter::Rank, SortOrder::Asc, 1, 0)
        .await
        .unwrap();
    assert_eq!(top[0].player_id, "g1");
}

#[tokio::test]
async fn exact_multiple_of_page_size_stops_without_extra_page() {
    let store = test_store().await;
    let fake = FakePrometheus::new();
    fake.set_board(Region::Europe, board("e", 50));

    let report = sync(&store, &fake, vec![Region::Europe], false).run().await.unwrap();

    assert_eq!(report.regions[0].pages, 2);
    assert_eq!(report.rows_written(), 50);
}

#[tokio::test]
async fn a_failing_row_does_not_abort_the_page() {
    let store = test_store().await;
    sqlx::query(
        "CREATE TRIGGER reject_row BEFORE INSERT ON leaderboard \
         WHEN NEW.player_id = 'n3' BEGIN SELECT RAISE(ABORT, 'rejected'); END",
    )
    .execute(store.pool())
    .await
    .unwrap();
    let fake = FakePrometheus::new();
    fake.set_board(Region::NorthAmerica, board("n", 10));

    let report = sync(&store, &fake, vec![Region::NorthAmerica], false).run().await.unwrap();

    assert_eq!(report.regions[0].row_failures, 1);
    assert_eq!(report.regions[0].rows_written, 9);
    assert_eq!(store.count_leaderboard_region(Region::NorthAmerica).await.unwrap(), 9);
}

#[tokio::test]
async fn regions_are_independent() {
    let store = test_store().await;
    let fake = FakePrometheus::new();
    fake.set_board(Region::Asia, board("a", 5));
    fake.set_board(Region::Oceania, board("o", 5));
    fake.fail_region(Region::Oceania);

    let report = sync(&store, &fake, vec![Region::Asia, Region::Oceania], false)
        .run()
        .await
        .unwrap();

    let asia = report.regions.iter().find(|r| r.region == Region::Asia).unwrap();
    let oceania = report.regions.iter().find(|r| r.region == Region::Oceania).unwrap();
    assert!(!asia.aborted);
    assert_eq!(asia.rows_written, 5);
    assert!(oceania.aborted);
    assert_eq!(store.count_leaderboard_region(Region::Asia).await.unwrap(), 5);
}

#[tokio::test]
async fn history_mode_snapshots_players_and_tolerates_failures() {
    let store = test_store().await;
    let fake = FakePrometheus::new();
    fake.add_player("s1", "s-player-1", 10);
    fake.set_board(Region::SouthAmerica, board("s", 2));

    let report = sync(&store, &fake, vec![Region::SouthAmerica], true).run().await.unwrap();

    let region = &report.regions[0];
    assert_eq!(region.rows_written, 2);
    // s2 is on the board but unknown to the player search.
    assert_eq!(region.history_failures, 1);

    let player = store.find_player("s1").await.unwrap().unwrap();
    assert_eq!(player.region, "SouthAmerica");
    assert_eq!(store.latest_ratings("s1", 7).await.unwrap().len(), 1);
}
