pub mod claims_dto;
pub mod job_dto;
pub mod leaderboard_dto;
pub mod player_dto;
pub mod prometheus_dto;
pub mod region_dto;
