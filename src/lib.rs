pub mod api;
pub mod broadcast;
pub mod core;
pub mod engine;
pub mod handlers;
pub mod models;
pub mod organizer;
pub mod stores;
pub mod utils;
