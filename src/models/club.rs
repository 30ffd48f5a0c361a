// src/models/club.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Public club details shown on the login screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ClubInfo {
    pub name: String,
    pub is_open: bool,
    pub timings: String,
}
