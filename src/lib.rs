// Clinic Scheduler Library
// Weekly time-grid scheduling: interaction engines, storage and sync

pub mod interaction;
pub mod models;
pub mod services;
pub mod utils;
