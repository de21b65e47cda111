use std::{collections::BTreeMap, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    error::ServiceError,
    state::room::AnswerRecord,
    store::{KvStore, StoreError, StoreResult},
};

const KEY_PREFIX: &str = "participant:";

/// Durable-ish record for one participant, outliving socket disconnects.
///
/// This is the source of truth for reconnect recovery: a room's `Player`
/// entry is reconstructed from it on rejoin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantSession {
    /// Stable participant id.
    pub participant_id: Uuid,
    /// Pin of the room this session belongs to.
    pub pin: String,
    /// Display name carried back on restore.
    pub nickname: String,
    /// Accumulated score.
    pub score: u32,
    /// Answers keyed by question index.
    pub answers: BTreeMap<u32, AnswerRecord>,
    /// Last question index the participant has seen.
    pub current_question_index: i32,
    /// When the participant first joined.
    #[serde(with = "time::serde::rfc3339")]
    pub joined_at: OffsetDateTime,
    /// Bumped on every mutation and explicit refresh.
    #[serde(with = "time::serde::rfc3339")]
    pub last_active_at: OffsetDateTime,
}

/// Outcome of validating a session against a room being joined.
#[derive(Debug)]
pub struct SessionValidation {
    /// Whether the session may be used to restore into the room.
    pub is_valid: bool,
    /// The session, when one exists (even if bound to another room).
    pub session: Option<ParticipantSession>,
}

/// Participant-keyed store answering "is this a rejoin or a fresh join?".
pub struct SessionStore {
    kv: Arc<dyn KvStore>,
    ttl: Duration,
}

impl SessionStore {
    /// Wrap a key/value backend with the configured session TTL.
    pub fn new(kv: Arc<dyn KvStore>, ttl: Duration) -> Self {
        Self { kv, ttl }
    }

    fn key(participant_id: Uuid) -> String {
        format!("{KEY_PREFIX}{participant_id}")
    }

    /// Initialize a session for a fresh join: zero score, no answers,
    /// question index at the pre-start sentinel.
    pub async fn create(
        &self,
        participant_id: Uuid,
        pin: &str,
        nickname: &str,
    ) -> StoreResult<ParticipantSession> {
        let now = OffsetDateTime::now_utc();
        let session = ParticipantSession {
            participant_id,
            pin: pin.to_string(),
            nickname: nickname.to_string(),
            score: 0,
            answers: BTreeMap::new(),
            current_question_index: -1,
            joined_at: now,
            last_active_at: now,
        };
        self.set(&session).await?;
        Ok(session)
    }

    /// Fetch a session by participant id.
    pub async fn get(&self, participant_id: Uuid) -> StoreResult<Option<ParticipantSession>> {
        let key = Self::key(participant_id);
        match self.kv.get(&key).await? {
            Some(raw) => {
                let session =
                    serde_json::from_str(&raw).map_err(|err| StoreError::codec(&key, err))?;
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, session: &ParticipantSession) -> StoreResult<()> {
        let key = Self::key(session.participant_id);
        let raw = serde_json::to_string(session).map_err(|err| StoreError::codec(&key, err))?;
        self.kv.set(&key, raw, self.ttl).await
    }

    /// Append an answer and bump the score in one write.
    ///
    /// Rejects a second write for the same question index so the per-question
    /// immutability invariant holds even if the room-level guard is bypassed.
    pub async fn add_answer(
        &self,
        participant_id: Uuid,
        question_index: u32,
        record: AnswerRecord,
    ) -> Result<ParticipantSession, ServiceError> {
        let mut session = self
            .get(participant_id)
            .await?
            .ok_or(ServiceError::InvalidSession)?;

        if session.answers.contains_key(&question_index) {
            return Err(ServiceError::AlreadyAnswered(question_index));
        }

        session.score += record.points;
        session.answers.insert(question_index, record);
        session.current_question_index = question_index as i32;
        session.last_active_at = OffsetDateTime::now_utc();
        self.set(&session).await?;
        Ok(session)
    }

    /// Overwrite an already-recorded answer during deferred settlement
    /// (balance-game majority scoring), adjusting the score delta.
    pub async fn settle_answer(
        &self,
        participant_id: Uuid,
        question_index: u32,
        record: AnswerRecord,
    ) -> Result<(), ServiceError> {
        let mut session = self
            .get(participant_id)
            .await?
            .ok_or(ServiceError::InvalidSession)?;

        if let Some(previous) = session.answers.get(&question_index) {
            session.score = session.score - previous.points + record.points;
        } else {
            session.score += record.points;
        }
        session.answers.insert(question_index, record);
        session.last_active_at = OffsetDateTime::now_utc();
        self.set(&session).await?;
        Ok(())
    }

    /// Bump `last_active_at` and the TTL without other changes.
    pub async fn refresh(&self, participant_id: Uuid) -> StoreResult<bool> {
        let Some(mut session) = self.get(participant_id).await? else {
            return Ok(false);
        };
        session.last_active_at = OffsetDateTime::now_utc();
        self.set(&session).await?;
        Ok(true)
    }

    /// Remove a session entirely.
    pub async fn delete(&self, participant_id: Uuid) -> StoreResult<()> {
        self.kv.delete(&Self::key(participant_id)).await
    }

    /// Check whether a session can restore into the given room.
    ///
    /// Invalid when the session is absent or its stored pin differs from the
    /// room being joined (prevents cross-room session replay).
    pub async fn validate(
        &self,
        participant_id: Uuid,
        pin: &str,
    ) -> StoreResult<SessionValidation> {
        let session = self.get(participant_id).await?;
        let is_valid = session
            .as_ref()
            .is_some_and(|session| session.pin == pin);
        Ok(SessionValidation { is_valid, session })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{plugins::question::AnswerValue, store::memory::InMemoryKvStore};

    fn store() -> SessionStore {
        SessionStore::new(Arc::new(InMemoryKvStore::new()), Duration::from_secs(60))
    }

    fn record(points: u32) -> AnswerRecord {
        AnswerRecord {
            answer: AnswerValue::Text("O".into()),
            is_correct: points > 0,
            points,
            response_time_ms: 1000,
            submitted_at: OffsetDateTime::now_utc(),
        }
    }

    #[tokio::test]
    async fn create_initializes_fresh_progress() {
        let store = store();
        let id = Uuid::new_v4();
        let session = store.create(id, "123456", "kim").await.unwrap();

        assert_eq!(session.score, 0);
        assert!(session.answers.is_empty());
        assert_eq!(session.current_question_index, -1);
        assert_eq!(store.get(id).await.unwrap().unwrap(), session);
    }

    #[tokio::test]
    async fn add_answer_appends_and_increments_score() {
        let store = store();
        let id = Uuid::new_v4();
        store.create(id, "123456", "kim").await.unwrap();

        let session = store.add_answer(id, 0, record(1500)).await.unwrap();
        assert_eq!(session.score, 1500);
        assert_eq!(session.current_question_index, 0);

        let session = store.add_answer(id, 1, record(0)).await.unwrap();
        assert_eq!(session.score, 1500);
        assert_eq!(session.answers.len(), 2);
    }

    #[tokio::test]
    async fn second_answer_for_same_index_is_rejected() {
        let store = store();
        let id = Uuid::new_v4();
        store.create(id, "123456", "kim").await.unwrap();
        store.add_answer(id, 0, record(1000)).await.unwrap();

        let err = store.add_answer(id, 0, record(1000)).await.unwrap_err();
        assert_eq!(err.code(), "already-answered");

        // Score unchanged by the rejected write.
        assert_eq!(store.get(id).await.unwrap().unwrap().score, 1000);
    }

    #[tokio::test]
    async fn settle_answer_replaces_points_delta() {
        let store = store();
        let id = Uuid::new_v4();
        store.create(id, "123456", "kim").await.unwrap();
        store.add_answer(id, 0, record(0)).await.unwrap();

        store.settle_answer(id, 0, record(1200)).await.unwrap();
        let session = store.get(id).await.unwrap().unwrap();
        assert_eq!(session.score, 1200);
        assert_eq!(session.answers[&0].points, 1200);
    }

    #[tokio::test]
    async fn validate_rejects_absent_and_cross_room_sessions() {
        let store = store();
        let id = Uuid::new_v4();

        let missing = store.validate(id, "123456").await.unwrap();
        assert!(!missing.is_valid);
        assert!(missing.session.is_none());

        store.create(id, "123456", "kim").await.unwrap();
        assert!(store.validate(id, "123456").await.unwrap().is_valid);

        let cross_room = store.validate(id, "654321").await.unwrap();
        assert!(!cross_room.is_valid);
        assert!(cross_room.session.is_some());
    }

    #[tokio::test]
    async fn delete_removes_the_session() {
        let store = store();
        let id = Uuid::new_v4();
        store.create(id, "123456", "kim").await.unwrap();

        store.delete(id).await.unwrap();
        assert!(store.get(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn refresh_reports_presence() {
        let store = store();
        let id = Uuid::new_v4();
        assert!(!store.refresh(id).await.unwrap());

        store.create(id, "123456", "kim").await.unwrap();
        assert!(store.refresh(id).await.unwrap());
    }
}
