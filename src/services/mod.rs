pub mod aggregation;
pub mod french_stats;
pub mod profile_sync;
