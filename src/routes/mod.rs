pub mod jobs;
pub mod leaderboard;
pub mod players;
