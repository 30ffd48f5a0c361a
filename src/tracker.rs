// src/tracker.rs

//! Puzzle Engagement Tracker.
//!
//! Decides what a submitted answer does to a (user, puzzle) pair:
//!
//! ```text
//! NotAttempted --wrong--> AttemptedIncorrect --wrong--> Exhausted
//! NotAttempted --right--> Solved
//! AttemptedIncorrect --right--> Solved
//! Exhausted, Solved: every further submission is rejected unchanged
//! ```
//!
//! `evaluate` is the pure decision. `PuzzleTracker` wraps it around the store:
//! the accepted attempt is written with `attempt_number = attempts_used + 1`,
//! and a lost race on that number means re-reading and deciding again.

use std::sync::Arc;

use chrono::Utc;

use crate::{
    config::MAX_PUZZLE_ATTEMPTS,
    error::AppError,
    models::{
        post::{Post, Puzzle},
        puzzle::{AttemptKind, AttemptResponse, PuzzleAttempt, PuzzleAttemptState, PuzzlePhase},
        user::short_id,
    },
    store::{AttemptInsert, ClubStore},
};

pub const DEFAULT_SUCCESS_MESSAGE: &str = "Correct! Well done!";
pub const DEFAULT_FAILURE_MESSAGE: &str = "Incorrect. No more attempts remaining.";
pub const ALREADY_SOLVED_MESSAGE: &str = "You have already solved this puzzle.";

/// How a submission is compared with the stored answer. Both sides are trimmed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AnswerMatch {
    #[default]
    Exact,
    CaseInsensitive,
}

impl AnswerMatch {
    pub fn matches(self, submitted: &str, expected: &str) -> bool {
        let (submitted, expected) = (submitted.trim(), expected.trim());
        match self {
            AnswerMatch::Exact => submitted == expected,
            AnswerMatch::CaseInsensitive => submitted.to_lowercase() == expected.to_lowercase(),
        }
    }
}

/// What to do with one submission given the current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    /// Not counted. `AttemptResponse.state` is the unchanged state.
    Rejected(AttemptResponse),
    /// Counts as attempt number `attempt_number`; `response.state` is the state after it.
    Accepted {
        attempt_number: u32,
        response: AttemptResponse,
    },
}

pub fn evaluate(
    state: &PuzzleAttemptState,
    puzzle: &Puzzle,
    answer: &str,
    matching: AnswerMatch,
) -> Evaluation {
    match state.phase() {
        PuzzlePhase::Solved => {
            return Evaluation::Rejected(AttemptResponse {
                accepted: false,
                is_correct: false,
                outcome: AttemptKind::AlreadySolved,
                message: ALREADY_SOLVED_MESSAGE.to_string(),
                state: *state,
            });
        }
        PuzzlePhase::Exhausted => {
            return Evaluation::Rejected(AttemptResponse {
                accepted: false,
                is_correct: false,
                outcome: AttemptKind::Exhausted,
                message: failure_message(puzzle),
                state: *state,
            });
        }
        PuzzlePhase::NotAttempted | PuzzlePhase::AttemptedIncorrect => {}
    }

    let is_correct = matching.matches(answer, &puzzle.answer);
    let next = state.advanced(is_correct);

    let (outcome, message) = if is_correct {
        (
            AttemptKind::Correct,
            puzzle
                .success_message
                .clone()
                .unwrap_or_else(|| DEFAULT_SUCCESS_MESSAGE.to_string()),
        )
    } else if next.attempts_remaining == 0 {
        (AttemptKind::Incorrect, failure_message(puzzle))
    } else {
        (
            AttemptKind::Incorrect,
            format!(
                "Incorrect. You have {} attempt(s) remaining.",
                next.attempts_remaining
            ),
        )
    };

    Evaluation::Accepted {
        attempt_number: next.attempts_used,
        response: AttemptResponse {
            accepted: true,
            is_correct,
            outcome,
            message,
            state: next,
        },
    }
}

fn failure_message(puzzle: &Puzzle) -> String {
    puzzle
        .failure_message
        .clone()
        .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string())
}

/// Store-backed tracker shared by the puzzle handlers.
#[derive(Clone)]
pub struct PuzzleTracker {
    store: Arc<dyn ClubStore>,
    matching: AnswerMatch,
}

impl PuzzleTracker {
    pub fn new(store: Arc<dyn ClubStore>, matching: AnswerMatch) -> Self {
        Self { store, matching }
    }

    async fn load_puzzle(&self, post_id: &str) -> Result<Post, AppError> {
        let post = self
            .store
            .get_post(post_id)
            .await?
            .ok_or(AppError::NotFound("Post not found".to_string()))?;

        if !post.is_puzzle() {
            return Err(AppError::BadRequest("This post is not a puzzle".to_string()));
        }
        Ok(post)
    }

    pub async fn state_of(&self, user_id: &str, post_id: &str) -> Result<PuzzleAttemptState, AppError> {
        let attempts = self.store.puzzle_attempts(user_id, post_id).await?;
        Ok(PuzzleAttemptState::from_attempts(&attempts))
    }

    /// Current standing; the zero state when the user never submitted.
    pub async fn get_status(&self, user_id: &str, post_id: &str) -> Result<PuzzleAttemptState, AppError> {
        self.load_puzzle(post_id).await?;
        self.state_of(user_id, post_id).await
    }

    /// Evaluates and records one submission.
    ///
    /// At most one attempt is recorded per call, and concurrent calls for the
    /// same pair can never push `attempts_used` past the cap.
    pub async fn submit_attempt(
        &self,
        user_id: &str,
        post_id: &str,
        answer: &str,
    ) -> Result<AttemptResponse, AppError> {
        if answer.trim().is_empty() {
            return Err(AppError::BadRequest("Answer is required".to_string()));
        }

        let post = self.load_puzzle(post_id).await?;
        let Some(puzzle) = post.puzzle.as_ref() else {
            return Err(AppError::BadRequest("This post is not a puzzle".to_string()));
        };

        // Every lost race means another attempt landed, so the cap bounds the rounds.
        for _ in 0..=MAX_PUZZLE_ATTEMPTS {
            let state = self.state_of(user_id, post_id).await?;

            let (attempt_number, response) = match evaluate(&state, puzzle, answer, self.matching) {
                Evaluation::Rejected(response) => {
                    tracing::debug!(user_id, post_id, outcome = ?response.outcome, "Puzzle attempt rejected");
                    return Ok(response);
                }
                Evaluation::Accepted {
                    attempt_number,
                    response,
                } => (attempt_number, response),
            };

            let attempt = PuzzleAttempt {
                attempt_id: format!("attempt_{}", short_id()),
                user_id: user_id.to_string(),
                post_id: post_id.to_string(),
                answer: answer.to_string(),
                is_correct: response.is_correct,
                attempt_number,
                created_at: Utc::now(),
            };

            match self.store.record_attempt(attempt).await? {
                AttemptInsert::Recorded => {
                    tracing::info!(
                        user_id,
                        post_id,
                        attempt_number,
                        is_correct = response.is_correct,
                        "Puzzle attempt recorded"
                    );
                    return Ok(response);
                }
                AttemptInsert::Conflict => {
                    tracing::debug!(user_id, post_id, attempt_number, "Concurrent puzzle attempt, re-evaluating");
                }
            }
        }

        Err(AppError::InternalServerError(format!(
            "puzzle attempt for {} on {} did not settle",
            user_id, post_id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn puzzle(success: Option<&str>, failure: Option<&str>) -> Puzzle {
        Puzzle {
            answer: "Nf3".to_string(),
            success_message: success.map(str::to_string),
            failure_message: failure.map(str::to_string),
        }
    }

    fn accepted(eval: Evaluation) -> AttemptResponse {
        match eval {
            Evaluation::Accepted { response, .. } => response,
            Evaluation::Rejected(r) => panic!("expected acceptance, got {:?}", r),
        }
    }

    fn rejected(eval: Evaluation) -> AttemptResponse {
        match eval {
            Evaluation::Rejected(response) => response,
            Evaluation::Accepted { response, .. } => panic!("expected rejection, got {:?}", response),
        }
    }

    #[test]
    fn trimmed_answer_is_correct() {
        let r = accepted(evaluate(
            &PuzzleAttemptState::default(),
            &puzzle(None, None),
            " Nf3 ",
            AnswerMatch::Exact,
        ));
        assert!(r.is_correct);
        assert_eq!(r.message, DEFAULT_SUCCESS_MESSAGE);
        assert_eq!(r.state, PuzzleAttemptState::new(1, true));
    }

    #[test]
    fn comparison_is_case_sensitive_by_default() {
        let p = puzzle(None, None);
        let r = accepted(evaluate(&PuzzleAttemptState::default(), &p, "nf3", AnswerMatch::Exact));
        assert!(!r.is_correct);
        assert_eq!(r.message, "Incorrect. You have 1 attempt(s) remaining.");

        let r = accepted(evaluate(
            &PuzzleAttemptState::default(),
            &p,
            "nf3",
            AnswerMatch::CaseInsensitive,
        ));
        assert!(r.is_correct);
    }

    #[test]
    fn second_wrong_answer_exhausts_with_custom_failure() {
        let p = puzzle(Some("Bravo"), Some("The answer was Nf3"));
        let r = accepted(evaluate(&PuzzleAttemptState::new(1, false), &p, "e4", AnswerMatch::Exact));
        assert_eq!(r.outcome, AttemptKind::Incorrect);
        assert_eq!(r.message, "The answer was Nf3");
        assert_eq!(r.state.phase(), PuzzlePhase::Exhausted);
    }

    #[test]
    fn exhausted_rejects_even_the_right_answer() {
        let p = puzzle(None, None);
        let state = PuzzleAttemptState::new(2, false);
        let r = rejected(evaluate(&state, &p, "Nf3", AnswerMatch::Exact));
        assert!(!r.accepted);
        assert_eq!(r.outcome, AttemptKind::Exhausted);
        assert_eq!(r.message, DEFAULT_FAILURE_MESSAGE);
        assert_eq!(r.state, state);
    }

    #[test]
    fn solved_rejects_further_submissions() {
        let state = PuzzleAttemptState::new(1, true);
        let r = rejected(evaluate(&state, &puzzle(None, None), "Nf3", AnswerMatch::Exact));
        assert_eq!(r.outcome, AttemptKind::AlreadySolved);
        assert_eq!(r.state, state);
    }

    #[test]
    fn custom_success_message_is_used() {
        let r = accepted(evaluate(
            &PuzzleAttemptState::new(1, false),
            &puzzle(Some("Bravo"), None),
            "Nf3",
            AnswerMatch::Exact,
        ));
        assert_eq!(r.message, "Bravo");
        assert_eq!(r.state.attempts_used, 2);
        assert!(r.state.has_solved);
    }

    async fn tracker_with_puzzle() -> (PuzzleTracker, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_post(Post {
                post_id: "post_puzzle".to_string(),
                title: "Daily".to_string(),
                content: "White to move".to_string(),
                image: None,
                puzzle: Some(puzzle(None, Some("Better luck tomorrow"))),
                created_by: "user_owner".to_string(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        let tracker = PuzzleTracker::new(store.clone(), AnswerMatch::Exact);
        (tracker, store)
    }

    #[tokio::test]
    async fn attempts_never_exceed_cap() {
        let (tracker, _) = tracker_with_puzzle().await;

        for answer in ["e4", "d4", "Nf3", "c4"] {
            tracker.submit_attempt("user_a", "post_puzzle", answer).await.unwrap();
        }

        let status = tracker.get_status("user_a", "post_puzzle").await.unwrap();
        assert_eq!(status, PuzzleAttemptState::new(2, false));

        let third = tracker
            .submit_attempt("user_a", "post_puzzle", "Nf3")
            .await
            .unwrap();
        assert!(!third.accepted);
        assert_eq!(third.message, "Better luck tomorrow");
    }

    #[tokio::test]
    async fn concurrent_submissions_record_at_most_cap() {
        let (tracker, store) = tracker_with_puzzle().await;

        let mut handles = Vec::new();
        for i in 0..8 {
            let tracker = tracker.clone();
            handles.push(tokio::spawn(async move {
                tracker
                    .submit_attempt("user_a", "post_puzzle", &format!("wrong{}", i))
                    .await
            }));
        }

        let mut accepted = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap().accepted {
                accepted += 1;
            }
        }

        assert_eq!(accepted, 2);
        let attempts = store.puzzle_attempts("user_a", "post_puzzle").await.unwrap();
        assert_eq!(attempts.len(), 2);
    }

    #[tokio::test]
    async fn users_are_tracked_independently() {
        let (tracker, _) = tracker_with_puzzle().await;
        tracker.submit_attempt("user_a", "post_puzzle", "Nf3").await.unwrap();

        let other = tracker.get_status("user_b", "post_puzzle").await.unwrap();
        assert_eq!(other, PuzzleAttemptState::default());
    }

    #[tokio::test]
    async fn blank_answer_is_not_an_attempt() {
        let (tracker, _) = tracker_with_puzzle().await;
        let err = tracker.submit_attempt("user_a", "post_puzzle", "   ").await;
        assert!(matches!(err, Err(AppError::BadRequest(_))));
        let status = tracker.get_status("user_a", "post_puzzle").await.unwrap();
        assert_eq!(status.attempts_used, 0);
    }

    #[tokio::test]
    async fn unknown_or_plain_posts_are_refused() {
        let (tracker, store) = tracker_with_puzzle().await;
        assert!(matches!(
            tracker.get_status("user_a", "post_missing").await,
            Err(AppError::NotFound(_))
        ));

        store
            .insert_post(Post {
                post_id: "post_news".to_string(),
                title: "News".to_string(),
                content: "Club night moved".to_string(),
                image: None,
                puzzle: None,
                created_by: "user_owner".to_string(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        assert!(matches!(
            tracker.submit_attempt("user_a", "post_news", "e4").await,
            Err(AppError::BadRequest(_))
        ));
    }
}
