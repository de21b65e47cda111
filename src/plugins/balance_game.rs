use crate::plugins::{
    GameTypePlugin,
    question::{AnswerValue, BalanceScoring, QuestionData},
    scoring::ScoreBreakdown,
};

/// Flat award for `none`-mode voting when the question does not override it.
const DEFAULT_PARTICIPATION_POINTS: u32 = 500;

/// Voting question with two labeled choices and no objectively correct answer.
///
/// Either choice is a valid vote. How votes turn into points depends on the
/// scoring mode: `none` hands every voter a flat participation amount at
/// submission; `majority` defers to the orchestrator, which tallies the room
/// at question end and applies the standard formula to majority voters only.
/// Correctness for `majority` therefore lives outside this plugin.
pub struct BalanceGamePlugin;

impl BalanceGamePlugin {
    /// Breakdown for a flat participation award in `none` scoring mode.
    pub fn participation_breakdown(data: &QuestionData) -> ScoreBreakdown {
        let points = data
            .settings
            .participation_points
            .unwrap_or(DEFAULT_PARTICIPATION_POINTS);
        ScoreBreakdown {
            is_correct: true,
            base_points: points,
            speed_bonus: 0,
            total: points,
        }
    }

    /// Scoring mode for a balance question, defaulting to `none`.
    pub fn scoring_mode(data: &QuestionData) -> BalanceScoring {
        data.settings.scoring.unwrap_or_default()
    }
}

impl GameTypePlugin for BalanceGamePlugin {
    fn game_type(&self) -> &'static str {
        "balance-game"
    }

    fn validate_question_data(&self, data: &QuestionData) -> bool {
        data.options.len() == 2
            && data.options.iter().all(|option| !option.trim().is_empty())
            && data.correct_answer.is_none()
    }

    fn check_answer(&self, data: &QuestionData, answer: &AnswerValue) -> bool {
        match answer.as_text() {
            Some(choice) => data.options.iter().any(|option| option == choice),
            None => false,
        }
    }

    fn default_question_data(&self) -> QuestionData {
        let mut data = QuestionData::new(self.game_type());
        data.options = vec!["Choice A".into(), "Choice B".into()];
        data
    }
}
