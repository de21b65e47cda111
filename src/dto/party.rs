use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    plugins::liar_game::{self, PHASE_RESULT},
    state::party::{PartyData, PartyPlayer, SessionState},
};

/// Party action as received from a client, before normalization.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct GameActionRequest {
    /// Action type string, e.g. `give-hint`.
    #[serde(rename = "type")]
    pub action_type: String,
    /// Action-specific payload, deserialized by the target plugin.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub payload: serde_json::Value,
}

/// One participant as shown in session snapshots.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PartyPlayerSummary {
    /// Stable participant id.
    pub id: Uuid,
    /// Display name.
    pub nickname: String,
}

impl From<&PartyPlayer> for PartyPlayerSummary {
    fn from(player: &PartyPlayer) -> Self {
        Self {
            id: player.id,
            nickname: player.nickname.clone(),
        }
    }
}

/// Round outcome shown once a liar-game round reaches `result`.
///
/// The win condition lives here, in presentation, rather than in the plugin:
/// the plugin only records the guess, and this layer decides what it means.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LiarOutcome {
    /// Who the liar was.
    pub liar_id: Uuid,
    /// The keyword everyone else shared.
    pub keyword: String,
    /// The liar's guess, when one was made.
    pub guess: Option<String>,
    /// Whether the liar won the round.
    pub liar_wins: bool,
}

/// Broadcast view of a party session.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionSnapshot {
    /// Round counter.
    pub round: u32,
    /// Plugin-defined phase string.
    pub phase: String,
    /// Participants in the session.
    pub players: Vec<PartyPlayerSummary>,
    /// Plugin-owned payload, serialized as-is.
    #[schema(value_type = Object)]
    pub data: PartyData,
    /// Round outcome, present only in the `result` phase.
    pub outcome: Option<LiarOutcome>,
}

impl From<&SessionState> for SessionSnapshot {
    fn from(session: &SessionState) -> Self {
        Self {
            round: session.round,
            phase: session.phase.clone(),
            players: session.players.iter().map(Into::into).collect(),
            data: session.data.clone(),
            outcome: liar_outcome(session),
        }
    }
}

/// Evaluate the liar-game win condition for a finished round.
///
/// The liar wins either by never being cornered (no sole plurality of votes
/// against them) or by guessing the keyword, compared case-insensitively
/// after trimming.
fn liar_outcome(session: &SessionState) -> Option<LiarOutcome> {
    if session.phase != PHASE_RESULT {
        return None;
    }
    let PartyData::LiarGame(data) = &session.data else {
        return None;
    };

    let liar_wins = match &data.guess {
        Some(guess) => guess.trim().to_lowercase() == data.keyword.trim().to_lowercase(),
        None => liar_game::sole_plurality(&data.votes) != Some(data.liar_id),
    };

    Some(LiarOutcome {
        liar_id: data.liar_id,
        keyword: data.keyword.clone(),
        guess: data.guess.clone(),
        liar_wins,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::liar_game::LiarData;
    use indexmap::IndexMap;

    fn result_session(guess: Option<&str>, votes: IndexMap<Uuid, Uuid>, liar_id: Uuid) -> SessionState {
        SessionState {
            round: 1,
            phase: PHASE_RESULT.into(),
            players: Vec::new(),
            data: PartyData::LiarGame(LiarData {
                liar_id,
                category: "food".into(),
                keyword: "Pizza".into(),
                hint_order: Vec::new(),
                hints: IndexMap::new(),
                votes,
                guess: guess.map(Into::into),
            }),
        }
    }

    #[test]
    fn no_outcome_before_result_phase() {
        let liar = Uuid::new_v4();
        let mut session = result_session(None, IndexMap::new(), liar);
        session.phase = "vote".into();
        let snapshot = SessionSnapshot::from(&session);
        assert!(snapshot.outcome.is_none());
    }

    #[test]
    fn correct_guess_wins_case_insensitively() {
        let liar = Uuid::new_v4();
        let session = result_session(Some("  pizza "), IndexMap::new(), liar);
        let outcome = SessionSnapshot::from(&session).outcome.unwrap();
        assert!(outcome.liar_wins);
    }

    #[test]
    fn wrong_guess_loses() {
        let liar = Uuid::new_v4();
        let session = result_session(Some("sushi"), IndexMap::new(), liar);
        let outcome = SessionSnapshot::from(&session).outcome.unwrap();
        assert!(!outcome.liar_wins);
    }

    #[test]
    fn uncornered_liar_wins_without_a_guess() {
        let liar = Uuid::new_v4();
        let scapegoat = Uuid::new_v4();
        let mut votes = IndexMap::new();
        votes.insert(Uuid::new_v4(), scapegoat);
        votes.insert(Uuid::new_v4(), scapegoat);
        votes.insert(Uuid::new_v4(), liar);

        let outcome = SessionSnapshot::from(&result_session(None, votes, liar))
            .outcome
            .unwrap();
        assert!(outcome.liar_wins);
    }
}
