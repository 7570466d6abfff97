pub mod auth_user;
pub mod dedup;
pub mod leaderboard_sync;
pub mod prometheus;
pub mod reconciliation;
pub mod region_resolver;
pub mod scheduler;
pub mod snapshot_store;
