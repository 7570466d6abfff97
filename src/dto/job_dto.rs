use serde::Serialize;

use crate::dto::region_dto::Region;

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct RegionSyncReport {
    pub region: Region,
    pub pages: u32,
    pub rows_written: u32,
    pub row_failures: u32,
    pub history_failures: u32,
    pub aborted: bool,
}

#[derive(Debug, Serialize, Clone, Default)]
pub struct SyncReport {
    pub regions: Vec<RegionSyncReport>,
}

impl RegionSyncReport {
    pub fn new(region: Region) -> Self {
        Self {
            region,
            pages: 0,
            rows_written: 0,
            row_failures: 0,
            history_failures: 0,
            aborted: false,
        }
    }
}

impl SyncReport {
    pub fn rows_written(&self) -> u32 {
        self.regions.iter().map(|r| r.rows_written).sum()
    }
}

#[derive(Debug, Serialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupReport {
    pub ratings_scanned: usize,
    pub ratings_kept: usize,
    pub character_ratings_scanned: usize,
    pub character_ratings_kept: usize,
}
