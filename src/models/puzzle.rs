// src/models/puzzle.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::config::MAX_PUZZLE_ATTEMPTS;

/// Represents the 'puzzle_attempts' table in the database.
/// One row per accepted submission.
#[derive(Debug, Clone, PartialEq)]
pub struct PuzzleAttempt {
    pub attempt_id: String,
    pub user_id: String,
    pub post_id: String,
    /// Raw answer as submitted.
    pub answer: String,
    pub is_correct: bool,
    /// 1-based; unique per (user, post).
    pub attempt_number: u32,
    pub created_at: DateTime<Utc>,
}

/// Where a (user, puzzle) pair stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PuzzlePhase {
    NotAttempted,
    AttemptedIncorrect,
    Exhausted,
    Solved,
}

/// A user's standing on one puzzle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PuzzleAttemptState {
    pub attempts_used: u32,
    pub attempts_remaining: u32,
    pub has_solved: bool,
}

impl Default for PuzzleAttemptState {
    fn default() -> Self {
        Self::new(0, false)
    }
}

impl PuzzleAttemptState {
    pub fn new(attempts_used: u32, has_solved: bool) -> Self {
        let attempts_used = attempts_used.min(MAX_PUZZLE_ATTEMPTS);
        Self {
            attempts_used,
            attempts_remaining: MAX_PUZZLE_ATTEMPTS - attempts_used,
            has_solved,
        }
    }

    pub fn from_attempts(attempts: &[PuzzleAttempt]) -> Self {
        let used = u32::try_from(attempts.len()).unwrap_or(u32::MAX);
        let has_solved = attempts.iter().any(|a| a.is_correct);
        Self::new(used, has_solved)
    }

    pub fn phase(&self) -> PuzzlePhase {
        if self.has_solved {
            PuzzlePhase::Solved
        } else if self.attempts_remaining == 0 {
            PuzzlePhase::Exhausted
        } else if self.attempts_used == 0 {
            PuzzlePhase::NotAttempted
        } else {
            PuzzlePhase::AttemptedIncorrect
        }
    }

    /// State after one more accepted attempt.
    pub fn advanced(&self, is_correct: bool) -> Self {
        Self::new(self.attempts_used + 1, self.has_solved || is_correct)
    }
}

/// DTO for submitting an answer.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SubmitAttemptRequest {
    #[validate(length(min = 1, max = 64))]
    pub post_id: String,

    #[validate(length(max = 100, message = "Answer must be at most 100 chars"))]
    pub answer: String,
}

/// How a submission was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AttemptKind {
    Correct,
    Incorrect,
    /// Rejected: no attempts left.
    Exhausted,
    /// Rejected: already solved.
    AlreadySolved,
}

/// Result of a submission, including the state after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AttemptResponse {
    /// Whether the submission counted as an attempt.
    pub accepted: bool,
    pub is_correct: bool,
    pub outcome: AttemptKind,
    pub message: String,
    #[serde(flatten)]
    pub state: PuzzleAttemptState,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(n: u32, is_correct: bool) -> PuzzleAttempt {
        PuzzleAttempt {
            attempt_id: format!("attempt_{}", n),
            user_id: "user_a".to_string(),
            post_id: "post_a".to_string(),
            answer: "e4".to_string(),
            is_correct,
            attempt_number: n,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn zero_state_has_two_remaining() {
        let state = PuzzleAttemptState::from_attempts(&[]);
        assert_eq!(state, PuzzleAttemptState::new(0, false));
        assert_eq!(state.attempts_remaining, 2);
        assert_eq!(state.phase(), PuzzlePhase::NotAttempted);
    }

    #[test]
    fn phases_follow_attempts() {
        let one_wrong = PuzzleAttemptState::from_attempts(&[attempt(1, false)]);
        assert_eq!(one_wrong.phase(), PuzzlePhase::AttemptedIncorrect);

        let two_wrong = PuzzleAttemptState::from_attempts(&[attempt(1, false), attempt(2, false)]);
        assert_eq!(two_wrong.phase(), PuzzlePhase::Exhausted);
        assert_eq!(two_wrong.attempts_remaining, 0);

        let solved_late = PuzzleAttemptState::from_attempts(&[attempt(1, false), attempt(2, true)]);
        assert_eq!(solved_late.phase(), PuzzlePhase::Solved);
    }

    #[test]
    fn remaining_never_underflows() {
        let state = PuzzleAttemptState::new(7, false);
        assert_eq!(state.attempts_used, 2);
        assert_eq!(state.attempts_remaining, 0);
    }

    #[test]
    fn response_flattens_state() {
        let response = AttemptResponse {
            accepted: true,
            is_correct: false,
            outcome: AttemptKind::Incorrect,
            message: "Incorrect.".to_string(),
            state: PuzzleAttemptState::new(1, false),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["attempts_used"], 1);
        assert_eq!(json["attempts_remaining"], 1);
        assert_eq!(json["outcome"], "incorrect");
    }
}
