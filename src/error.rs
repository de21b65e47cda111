use thiserror::Error;
use validator::ValidationError;

use crate::{dao::repository::RepositoryError, store::StoreError};

/// Errors that can occur in service layer operations.
///
/// Every variant maps to a stable wire code via [`ServiceError::code`] so
/// clients can branch on failures without parsing messages.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No live room exists for the given pin.
    #[error("room `{0}` not found")]
    RoomNotFound(String),
    /// The room's durable record is past its expiry timestamp.
    #[error("room `{0}` has expired")]
    RoomExpired(String),
    /// The caller attempted an organizer-only action.
    #[error("only the organizer can perform this action")]
    NotOrganizer,
    /// The action is not valid in the room's current lifecycle phase.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// The participant already submitted an answer for this question index.
    #[error("question {0} was already answered")]
    AlreadyAnswered(u32),
    /// The participant is not tracked in the room.
    #[error("player not found in room")]
    PlayerNotFound,
    /// No question exists at the requested index.
    #[error("question {0} not found")]
    QuestionNotFound(u32),
    /// Question data failed plugin validation.
    #[error("invalid question data: {0}")]
    InvalidQuestionData(String),
    /// The room has no further questions to advance to.
    #[error("no more questions")]
    NoMoreQuestions,
    /// A fresh join requires a nickname.
    #[error("nickname is required to join")]
    NicknameRequired,
    /// The requested nickname is already taken in this room.
    #[error("nickname `{0}` is already taken")]
    DuplicateNickname(String),
    /// The provided participant session is absent or bound to another room.
    #[error("participant session is invalid or expired")]
    InvalidSession,
    /// Unexpected failure; logged server-side, generic message to the client.
    #[error("internal error")]
    Internal(#[source] anyhow::Error),
}

impl ServiceError {
    /// Stable wire code carried in the `error` event.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::RoomNotFound(_) => "room-not-found",
            ServiceError::RoomExpired(_) => "room-expired",
            ServiceError::NotOrganizer => "not-organizer",
            ServiceError::InvalidState(_) => "invalid-state",
            ServiceError::AlreadyAnswered(_) => "already-answered",
            ServiceError::PlayerNotFound => "player-not-found",
            ServiceError::QuestionNotFound(_) => "question-not-found",
            ServiceError::InvalidQuestionData(_) => "invalid-question-data",
            ServiceError::NoMoreQuestions => "no-more-questions",
            ServiceError::NicknameRequired => "nickname-required",
            ServiceError::DuplicateNickname(_) => "duplicate-nickname",
            ServiceError::InvalidSession => "invalid-session",
            ServiceError::Internal(_) => "internal-error",
        }
    }

    /// Message safe to surface to the originating client.
    pub fn client_message(&self) -> String {
        match self {
            // Internal details stay in the logs.
            ServiceError::Internal(_) => "internal error".into(),
            other => other.to_string(),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        ServiceError::Internal(err.into())
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        ServiceError::Internal(err.into())
    }
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        let message = err
            .message
            .map(|message| message.into_owned())
            .unwrap_or_else(|| err.code.into_owned());
        ServiceError::InvalidState(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_errors_hide_details_from_clients() {
        let err = ServiceError::Internal(anyhow::anyhow!("db exploded at 0x7f"));
        assert_eq!(err.code(), "internal-error");
        assert_eq!(err.client_message(), "internal error");
    }

    #[test]
    fn codes_are_kebab_case() {
        assert_eq!(ServiceError::NotOrganizer.code(), "not-organizer");
        assert_eq!(ServiceError::AlreadyAnswered(3).code(), "already-answered");
        assert_eq!(
            ServiceError::DuplicateNickname("kim".into()).code(),
            "duplicate-nickname"
        );
    }
}
