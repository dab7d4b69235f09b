// Module exports for models

pub mod event;
pub mod grid_config;
pub mod resource;
