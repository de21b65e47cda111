//! Liar-game party plugin: phase transitions driven by player actions.
//!
//! One player is secretly the liar; everyone else shares a keyword. Players
//! give hints, vote on who the liar is, and the liar gets a last-chance
//! keyword guess when cornered. The plugin owns the phase flow only; whether
//! the liar's guess wins the round is evaluated by the presentation layer,
//! not here.

use indexmap::IndexMap;
use rand::seq::{IndexedRandom, SliceRandom};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ServiceError,
    plugins::{
        GameTypePlugin,
        question::{AnswerValue, QuestionData},
    },
    state::party::{GameAction, PHASE_LOBBY, PartyData, SessionState},
};

/// Players reveal their role and give hints.
pub const PHASE_REVEAL: &str = "reveal";
/// Players vote on who they think the liar is.
pub const PHASE_VOTE: &str = "vote";
/// The cornered liar gets one keyword guess.
pub const PHASE_GUESS: &str = "guess";
/// Round over, results shown.
pub const PHASE_RESULT: &str = "result";

/// Minimum players required to start a round.
const MIN_PLAYERS: usize = 4;

/// Built-in keyword pool, grouped by category.
const KEYWORD_POOL: &[(&str, &[&str])] = &[
    (
        "food",
        &["kimchi", "pizza", "sushi", "taco", "croissant", "ramen"],
    ),
    (
        "animal",
        &["penguin", "giraffe", "octopus", "hedgehog", "flamingo"],
    ),
    (
        "place",
        &["library", "airport", "sauna", "lighthouse", "subway"],
    ),
    (
        "object",
        &["umbrella", "typewriter", "telescope", "accordion", "compass"],
    ),
];

/// Round data owned by the liar-game plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiarData {
    /// The player secretly designated as liar.
    pub liar_id: Uuid,
    /// Category shown to everyone, liar included.
    pub category: String,
    /// Keyword shared by everyone except the liar.
    pub keyword: String,
    /// Shuffled order in which players present their hints.
    pub hint_order: Vec<Uuid>,
    /// Hints given so far, one per player, in arrival order.
    pub hints: IndexMap<Uuid, String>,
    /// Votes cast so far: voter id to accused id.
    pub votes: IndexMap<Uuid, Uuid>,
    /// The liar's keyword guess, recorded in the `guess` phase.
    pub guess: Option<String>,
}

#[derive(Deserialize)]
struct GiveHintPayload {
    hint: String,
}

#[derive(Deserialize)]
struct SubmitVotePayload {
    target_id: Uuid,
}

#[derive(Deserialize)]
struct GuessKeywordPayload {
    guess: String,
}

/// Phase-driven party plugin. Implements `process_action` only; liar-game
/// rounds have no question data and no per-answer scoring.
pub struct LiarGamePlugin;

impl GameTypePlugin for LiarGamePlugin {
    fn game_type(&self) -> &'static str {
        "liar-game"
    }

    fn validate_question_data(&self, data: &QuestionData) -> bool {
        // Party games carry no question payload beyond the type tag.
        data.question_type == self.game_type()
            && data.options.is_empty()
            && data.correct_answer.is_none()
    }

    fn check_answer(&self, _data: &QuestionData, _answer: &AnswerValue) -> bool {
        false
    }

    fn default_question_data(&self) -> QuestionData {
        QuestionData::new(self.game_type())
    }

    fn process_action(
        &self,
        session: SessionState,
        action: &GameAction,
    ) -> Result<SessionState, ServiceError> {
        match action.action_type.as_str() {
            "start-game" => start_game(session),
            "give-hint" => give_hint(session, action),
            "submit-vote" => submit_vote(session, action),
            "guess-keyword" => guess_keyword(session, action),
            "next-phase" => force_next_phase(session),
            other => Err(ServiceError::InvalidState(format!(
                "liar-game does not handle action `{other}`"
            ))),
        }
    }
}

fn start_game(mut session: SessionState) -> Result<SessionState, ServiceError> {
    if session.phase != PHASE_LOBBY && session.phase != PHASE_RESULT {
        return Err(ServiceError::InvalidState(format!(
            "cannot start a round from phase `{}`",
            session.phase
        )));
    }
    if session.players.len() < MIN_PLAYERS {
        return Err(ServiceError::InvalidState(format!(
            "liar-game needs at least {MIN_PLAYERS} players, got {}",
            session.players.len()
        )));
    }

    let mut rng = rand::rng();
    let liar = session
        .players
        .choose(&mut rng)
        .ok_or_else(|| ServiceError::InvalidState("no players in session".into()))?;
    let (category, keywords) = KEYWORD_POOL
        .choose(&mut rng)
        .ok_or_else(|| ServiceError::Internal(anyhow::anyhow!("empty keyword pool")))?;
    let keyword = keywords
        .choose(&mut rng)
        .ok_or_else(|| ServiceError::Internal(anyhow::anyhow!("empty keyword category")))?;

    let mut hint_order: Vec<Uuid> = session.players.iter().map(|player| player.id).collect();
    hint_order.shuffle(&mut rng);

    session.round += 1;
    session.phase = PHASE_REVEAL.into();
    session.data = PartyData::LiarGame(LiarData {
        liar_id: liar.id,
        category: (*category).into(),
        keyword: (*keyword).into(),
        hint_order,
        hints: IndexMap::new(),
        votes: IndexMap::new(),
        guess: None,
    });
    Ok(session)
}

fn give_hint(mut session: SessionState, action: &GameAction) -> Result<SessionState, ServiceError> {
    require_phase(&session, PHASE_REVEAL)?;
    let player_id = acting_player(&session, action)?;
    let payload: GiveHintPayload = parse_payload(action)?;

    let player_count = session.players.len();
    let data = liar_data_mut(&mut session)?;
    if data.hints.contains_key(&player_id) {
        return Err(ServiceError::InvalidState(
            "player already gave a hint this round".into(),
        ));
    }
    data.hints.insert(player_id, payload.hint);

    if data.hints.len() == player_count {
        session.phase = PHASE_VOTE.into();
    }
    Ok(session)
}

fn submit_vote(
    mut session: SessionState,
    action: &GameAction,
) -> Result<SessionState, ServiceError> {
    require_phase(&session, PHASE_VOTE)?;
    let voter_id = acting_player(&session, action)?;
    let payload: SubmitVotePayload = parse_payload(action)?;
    if !session
        .players
        .iter()
        .any(|player| player.id == payload.target_id)
    {
        return Err(ServiceError::InvalidState(
            "vote target is not in the session".into(),
        ));
    }

    let player_count = session.players.len();
    let data = liar_data_mut(&mut session)?;
    data.votes.insert(voter_id, payload.target_id);

    if data.votes.len() == player_count {
        // The liar escapes to a last-chance guess only when they alone hold
        // the plurality of votes.
        let liar_cornered = sole_plurality(&data.votes) == Some(data.liar_id);
        session.phase = if liar_cornered {
            PHASE_GUESS.into()
        } else {
            PHASE_RESULT.into()
        };
    }
    Ok(session)
}

fn guess_keyword(
    mut session: SessionState,
    action: &GameAction,
) -> Result<SessionState, ServiceError> {
    require_phase(&session, PHASE_GUESS)?;
    let player_id = acting_player(&session, action)?;
    let payload: GuessKeywordPayload = parse_payload(action)?;

    let data = liar_data_mut(&mut session)?;
    if player_id != data.liar_id {
        return Err(ServiceError::InvalidState(
            "only the liar may guess the keyword".into(),
        ));
    }
    data.guess = Some(payload.guess);
    session.phase = PHASE_RESULT.into();
    Ok(session)
}

/// Organizer-driven fallback when a round stalls.
fn force_next_phase(mut session: SessionState) -> Result<SessionState, ServiceError> {
    let next = match session.phase.as_str() {
        PHASE_REVEAL => PHASE_VOTE,
        PHASE_VOTE => PHASE_RESULT,
        PHASE_GUESS => PHASE_RESULT,
        other => {
            return Err(ServiceError::InvalidState(format!(
                "cannot force-advance from phase `{other}`"
            )));
        }
    };
    session.phase = next.into();
    Ok(session)
}

/// The accused id holding a strict plurality of votes, if any.
pub(crate) fn sole_plurality(votes: &IndexMap<Uuid, Uuid>) -> Option<Uuid> {
    let mut counts: IndexMap<Uuid, usize> = IndexMap::new();
    for accused in votes.values() {
        *counts.entry(*accused).or_default() += 1;
    }
    let max = counts.values().copied().max()?;
    let mut leaders = counts.iter().filter(|(_, count)| **count == max);
    let leader = *leaders.next()?.0;
    match leaders.next() {
        Some(_) => None,
        None => Some(leader),
    }
}

fn require_phase(session: &SessionState, expected: &str) -> Result<(), ServiceError> {
    if session.phase != expected {
        return Err(ServiceError::InvalidState(format!(
            "action requires phase `{expected}`, session is in `{}`",
            session.phase
        )));
    }
    Ok(())
}

fn acting_player(session: &SessionState, action: &GameAction) -> Result<Uuid, ServiceError> {
    let player_id = action.player_id.ok_or(ServiceError::PlayerNotFound)?;
    if !session.players.iter().any(|player| player.id == player_id) {
        return Err(ServiceError::PlayerNotFound);
    }
    Ok(player_id)
}

fn parse_payload<T: serde::de::DeserializeOwned>(action: &GameAction) -> Result<T, ServiceError> {
    serde_json::from_value(action.payload.clone()).map_err(|err| {
        ServiceError::InvalidState(format!(
            "malformed payload for `{}`: {err}",
            action.action_type
        ))
    })
}

fn liar_data_mut(session: &mut SessionState) -> Result<&mut LiarData, ServiceError> {
    match &mut session.data {
        PartyData::LiarGame(data) => Ok(data),
        PartyData::Unset => Err(ServiceError::InvalidState(
            "round has not been started".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::party::PartyPlayer;

    fn session(count: usize) -> SessionState {
        let players = (0..count)
            .map(|n| PartyPlayer {
                id: Uuid::new_v4(),
                nickname: format!("player-{n}"),
            })
            .collect();
        SessionState::new(players)
    }

    fn action(action_type: &str, player_id: Option<Uuid>, payload: serde_json::Value) -> GameAction {
        GameAction::new(action_type, player_id, payload)
    }

    fn data(session: &SessionState) -> &LiarData {
        match &session.data {
            PartyData::LiarGame(data) => data,
            PartyData::Unset => panic!("round not started"),
        }
    }

    #[test]
    fn start_game_picks_one_liar_and_enters_reveal() {
        let session = session(4);
        let started = LiarGamePlugin
            .process_action(session.clone(), &action("start-game", None, serde_json::json!({})))
            .unwrap();

        assert_eq!(started.phase, PHASE_REVEAL);
        assert_eq!(started.round, 1);

        let round = data(&started);
        assert!(session.players.iter().any(|p| p.id == round.liar_id));
        assert!(round.hints.is_empty());
        assert!(round.votes.is_empty());
        assert!(round.guess.is_none());

        // Hint order is a permutation of the players.
        let mut expected: Vec<Uuid> = session.players.iter().map(|p| p.id).collect();
        let mut order = round.hint_order.clone();
        expected.sort();
        order.sort();
        assert_eq!(order, expected);
    }

    #[test]
    fn start_game_requires_four_players() {
        let err = LiarGamePlugin
            .process_action(session(3), &action("start-game", None, serde_json::json!({})))
            .unwrap_err();
        assert_eq!(err.code(), "invalid-state");
    }

    #[test]
    fn hints_from_everyone_advance_to_vote() {
        let mut state = LiarGamePlugin
            .process_action(session(4), &action("start-game", None, serde_json::json!({})))
            .unwrap();

        let ids: Vec<Uuid> = state.players.iter().map(|p| p.id).collect();
        for (n, id) in ids.iter().enumerate() {
            state = LiarGamePlugin
                .process_action(
                    state,
                    &action(
                        "give-hint",
                        Some(*id),
                        serde_json::json!({"hint": format!("hint-{n}")}),
                    ),
                )
                .unwrap();
        }

        assert_eq!(state.phase, PHASE_VOTE);
        assert_eq!(data(&state).hints.len(), 4);
    }

    #[test]
    fn duplicate_hint_is_rejected() {
        let state = LiarGamePlugin
            .process_action(session(4), &action("start-game", None, serde_json::json!({})))
            .unwrap();
        let first = state.players[0].id;

        let state = LiarGamePlugin
            .process_action(
                state,
                &action("give-hint", Some(first), serde_json::json!({"hint": "one"})),
            )
            .unwrap();
        let err = LiarGamePlugin
            .process_action(
                state,
                &action("give-hint", Some(first), serde_json::json!({"hint": "two"})),
            )
            .unwrap_err();
        assert_eq!(err.code(), "invalid-state");
    }

    fn voted_state(accuse_liar_count: usize) -> (SessionState, Uuid) {
        let mut state = LiarGamePlugin
            .process_action(session(4), &action("start-game", None, serde_json::json!({})))
            .unwrap();
        state.phase = PHASE_VOTE.into();

        let liar_id = data(&state).liar_id;
        let ids: Vec<Uuid> = state.players.iter().map(|p| p.id).collect();
        let scapegoat = *ids.iter().find(|id| **id != liar_id).unwrap();

        for (n, voter) in ids.iter().enumerate() {
            let target = if n < accuse_liar_count { liar_id } else { scapegoat };
            state = LiarGamePlugin
                .process_action(
                    state,
                    &action(
                        "submit-vote",
                        Some(*voter),
                        serde_json::json!({"target_id": target}),
                    ),
                )
                .unwrap();
        }
        (state, liar_id)
    }

    #[test]
    fn liar_with_sole_plurality_gets_a_guess() {
        let (state, liar_id) = voted_state(3);
        assert_eq!(state.phase, PHASE_GUESS);

        let finished = LiarGamePlugin
            .process_action(
                state,
                &action(
                    "guess-keyword",
                    Some(liar_id),
                    serde_json::json!({"guess": "pizza"}),
                ),
            )
            .unwrap();
        assert_eq!(finished.phase, PHASE_RESULT);
        assert_eq!(data(&finished).guess.as_deref(), Some("pizza"));
    }

    #[test]
    fn split_vote_goes_straight_to_result() {
        // 2 votes liar, 2 votes scapegoat: no sole plurality.
        let (state, _) = voted_state(2);
        assert_eq!(state.phase, PHASE_RESULT);
    }

    #[test]
    fn only_the_liar_may_guess() {
        let (state, liar_id) = voted_state(3);
        let honest = state
            .players
            .iter()
            .map(|p| p.id)
            .find(|id| *id != liar_id)
            .unwrap();
        let err = LiarGamePlugin
            .process_action(
                state,
                &action(
                    "guess-keyword",
                    Some(honest),
                    serde_json::json!({"guess": "pizza"}),
                ),
            )
            .unwrap_err();
        assert_eq!(err.code(), "invalid-state");
    }

    #[test]
    fn next_phase_forces_progress() {
        let state = LiarGamePlugin
            .process_action(session(4), &action("start-game", None, serde_json::json!({})))
            .unwrap();
        let state = LiarGamePlugin
            .process_action(state, &action("next-phase", None, serde_json::json!({})))
            .unwrap();
        assert_eq!(state.phase, PHASE_VOTE);
        let state = LiarGamePlugin
            .process_action(state, &action("next-phase", None, serde_json::json!({})))
            .unwrap();
        assert_eq!(state.phase, PHASE_RESULT);
    }

    #[test]
    fn unknown_action_is_rejected() {
        let err = LiarGamePlugin
            .process_action(session(4), &action("deal-cards", None, serde_json::json!({})))
            .unwrap_err();
        assert_eq!(err.code(), "invalid-state");
    }
}
