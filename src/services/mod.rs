// Service module exports
// Persistence, the store seam, change feed, sync layer and the sweeper

pub mod config;
pub mod database;
pub mod event;
pub mod feed;
pub mod resource;
pub mod store;
pub mod sweeper;
pub mod sync;
