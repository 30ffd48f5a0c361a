// src/handlers/mod.rs

pub mod admin;
pub mod auth;
pub mod club;
pub mod community;
pub mod puzzle;
pub mod subscription;
