//! Checks applied to a review before it reaches the overlay store.
//!
//! The store accepts anything; this is the only gate. Messages are written
//! for display next to the review form.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;
pub const MIN_COMMENT_CHARS: usize = 5;
pub const MAX_COMMENT_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please select a rating")]
    RatingOutOfRange { rating: u8 },
    #[error("Review must be at least 5 characters")]
    CommentTooShort { chars: usize },
    #[error("Review cannot be longer than 500 characters")]
    CommentTooLong { chars: usize },
}

/// Review as entered by the user, before an id, author, and date are assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewDraft {
    pub rating: u8,
    pub comment: String,
}

impl ReviewDraft {
    pub fn new(rating: u8, comment: impl Into<String>) -> Self {
        Self {
            rating,
            comment: comment.into(),
        }
    }

    /// Rating is checked first. Comment length counts Unicode scalar values,
    /// so an emoji is one character here even where a UTF-16 form counts two.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(MIN_RATING..=MAX_RATING).contains(&self.rating) {
            return Err(ValidationError::RatingOutOfRange {
                rating: self.rating,
            });
        }
        let chars = self.comment.chars().count();
        if chars < MIN_COMMENT_CHARS {
            return Err(ValidationError::CommentTooShort { chars });
        }
        if chars > MAX_COMMENT_CHARS {
            return Err(ValidationError::CommentTooLong { chars });
        }
        Ok(())
    }
}
