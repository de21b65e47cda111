use std::{error::Error, sync::Arc};

use dashmap::DashMap;
use futures::future::BoxFuture;
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::dao::models::{GameResultRecord, QuestionRecord, RoomRecord};

/// Result alias for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Error raised by the durable store regardless of the underlying backend.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The backend could not be reached or failed mid-operation.
    #[error("repository unavailable: {message}")]
    Unavailable {
        /// Human-readable failure context.
        message: String,
        /// Underlying backend failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl RepositoryError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        RepositoryError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}

/// Abstraction over the durable relational store owned by the authoring
/// service: room and question definitions in, final results out.
pub trait GameRepository: Send + Sync {
    /// Look up a room record by its join code.
    fn find_room_by_pin(&self, pin: &str)
    -> BoxFuture<'static, RepositoryResult<Option<RoomRecord>>>;
    /// Ordered question list for a game definition.
    fn load_questions(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, RepositoryResult<Vec<QuestionRecord>>>;
    /// Persist the final result record for a finished room.
    fn save_result(&self, result: GameResultRecord) -> BoxFuture<'static, RepositoryResult<()>>;
}

/// Process-local repository used for single-process wiring and tests.
#[derive(Default)]
pub struct InMemoryRepository {
    rooms: Arc<DashMap<String, RoomRecord>>,
    questions: Arc<DashMap<Uuid, Vec<QuestionRecord>>>,
    results: Arc<Mutex<Vec<GameResultRecord>>>,
}

impl InMemoryRepository {
    /// Empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a room record, replacing any previous record for the pin.
    pub fn put_room(&self, record: RoomRecord) {
        self.rooms.insert(record.pin.clone(), record);
    }

    /// Seed the question list for a game definition.
    pub fn put_questions(&self, game_id: Uuid, questions: Vec<QuestionRecord>) {
        self.questions.insert(game_id, questions);
    }

    /// Results persisted so far, oldest first.
    pub async fn results(&self) -> Vec<GameResultRecord> {
        self.results.lock().await.clone()
    }
}

impl GameRepository for InMemoryRepository {
    fn find_room_by_pin(
        &self,
        pin: &str,
    ) -> BoxFuture<'static, RepositoryResult<Option<RoomRecord>>> {
        let rooms = Arc::clone(&self.rooms);
        let pin = pin.to_string();
        Box::pin(async move { Ok(rooms.get(&pin).map(|record| record.clone())) })
    }

    fn load_questions(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, RepositoryResult<Vec<QuestionRecord>>> {
        let questions = Arc::clone(&self.questions);
        Box::pin(async move {
            Ok(questions
                .get(&game_id)
                .map(|list| list.clone())
                .unwrap_or_default())
        })
    }

    fn save_result(&self, result: GameResultRecord) -> BoxFuture<'static, RepositoryResult<()>> {
        let results = Arc::clone(&self.results);
        Box::pin(async move {
            results.lock().await.push(result);
            Ok(())
        })
    }
}
