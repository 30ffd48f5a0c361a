// src/lib.rs

pub mod client;
pub mod config;
pub mod docs;
pub mod error;
pub mod feed;
pub mod handlers;
pub mod identity;
pub mod models;
pub mod notify;
pub mod routes;
pub mod state;
pub mod store;
pub mod tracker;
pub mod utils;

// Re-export specific items for convenience if needed
pub use routes::create_router;
