// src/models/mod.rs

pub mod club;
pub mod post;
pub mod puzzle;
pub mod session;
pub mod user;
