// src/feed.rs

//! Feed composition: one active puzzle, everything else that is not a puzzle.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{
    post::{Post, PublicPost},
    puzzle::PuzzleAttemptState,
};

/// Posts split into the active puzzle slot and the regular content list.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedFeed {
    pub active_puzzle: Option<Post>,
    pub posts: Vec<Post>,
}

/// Orders posts newest first (ties by id, descending) and keeps only the most
/// recent puzzle. Older puzzles are dropped from both the slot and the list.
pub fn compose_feed(mut posts: Vec<Post>) -> ComposedFeed {
    posts.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.post_id.cmp(&a.post_id))
    });

    let mut active_puzzle = None;
    let mut regular = Vec::with_capacity(posts.len());

    for post in posts {
        if !post.is_puzzle() {
            regular.push(post);
        } else if active_puzzle.is_none() {
            active_puzzle = Some(post);
        }
    }

    ComposedFeed {
        active_puzzle,
        posts: regular,
    }
}

/// The active puzzle together with the caller's standing on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ActivePuzzle {
    pub post: PublicPost,
    pub status: PuzzleAttemptState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FeedResponse {
    pub active_puzzle: Option<ActivePuzzle>,
    pub posts: Vec<PublicPost>,
}
