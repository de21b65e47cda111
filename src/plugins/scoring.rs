//! Point calculation shared by every question plugin.
//!
//! The formula is fixed: a correct answer earns `base_points` plus a speed
//! bonus of `floor(base_points * speed_bonus_multiplier * time_ratio)`, where
//! `time_ratio` linearly decays from 1 at instant answers to 0 at (or past)
//! the question deadline. Incorrect answers always score zero.

use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;

use crate::plugins::{
    PluginRegistry,
    question::{AnswerValue, QuestionData},
};

/// Inputs to the scoring formula.
#[derive(Debug, Clone, Copy)]
pub struct ScoreOptions {
    /// Whether the answer was judged correct.
    pub is_correct: bool,
    /// Time between `question-started` and the submission.
    pub response_time_ms: u64,
    /// Allowed answering time for the question.
    pub question_duration_secs: u32,
    /// Points awarded before the speed bonus.
    pub base_points: u32,
    /// Fraction of the base points available as speed bonus.
    pub speed_bonus_multiplier: f64,
}

/// Point award with its breakdown, sent back to the submitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct ScoreBreakdown {
    /// Whether the answer was judged correct.
    pub is_correct: bool,
    /// Base component of the award.
    pub base_points: u32,
    /// Speed component of the award.
    pub speed_bonus: u32,
    /// Total points awarded.
    pub total: u32,
}

impl ScoreBreakdown {
    /// All-zero breakdown for an incorrect answer.
    pub fn incorrect() -> Self {
        Self {
            is_correct: false,
            base_points: 0,
            speed_bonus: 0,
            total: 0,
        }
    }
}

/// The default scoring algorithm used by every built-in question plugin.
pub fn default_score(options: &ScoreOptions) -> ScoreBreakdown {
    if !options.is_correct {
        return ScoreBreakdown::incorrect();
    }

    let duration_secs = f64::from(options.question_duration_secs);
    let speed_bonus = if duration_secs > 0.0 {
        let response_secs = options.response_time_ms as f64 / 1000.0;
        let remaining = (duration_secs - response_secs).clamp(0.0, duration_secs);
        let time_ratio = remaining / duration_secs;
        (f64::from(options.base_points) * options.speed_bonus_multiplier * time_ratio).floor()
            as u32
    } else {
        0
    };

    ScoreBreakdown {
        is_correct: true,
        base_points: options.base_points,
        speed_bonus,
        total: options.base_points + speed_bonus,
    }
}

/// Registry-backed calculator resolving correctness and points per question type.
pub struct ScoreCalculator {
    registry: Arc<PluginRegistry>,
    base_points: u32,
    speed_bonus_multiplier: f64,
}

impl ScoreCalculator {
    /// Wrap a plugin registry with the configured scoring defaults.
    pub fn new(registry: Arc<PluginRegistry>, base_points: u32, speed_bonus_multiplier: f64) -> Self {
        Self {
            registry,
            base_points,
            speed_bonus_multiplier,
        }
    }

    /// Judge an answer by dispatching to the plugin matching the question type.
    ///
    /// An unregistered type is treated as incorrect rather than an error, so a
    /// malformed question can never fail a submission mid-game.
    pub fn check_answer(&self, data: &QuestionData, answer: &AnswerValue) -> bool {
        match self.registry.get(&data.question_type) {
            Some(plugin) => plugin.check_answer(data, answer),
            None => false,
        }
    }

    /// Judge and score an answer in one step, returning the full breakdown.
    pub fn score(
        &self,
        data: &QuestionData,
        answer: &AnswerValue,
        response_time_ms: u64,
        question_duration_secs: u32,
    ) -> ScoreBreakdown {
        let options = ScoreOptions {
            is_correct: self.check_answer(data, answer),
            response_time_ms,
            question_duration_secs,
            base_points: self.base_points,
            speed_bonus_multiplier: self.speed_bonus_multiplier,
        };

        match self.registry.get(&data.question_type) {
            Some(plugin) => plugin.calculate_score(&options),
            None => ScoreBreakdown::incorrect(),
        }
    }

    /// Score with an externally decided correctness, bypassing `check_answer`.
    ///
    /// Used for balance-game majority settlement, where correctness is a
    /// room-wide tally the plugin cannot see.
    pub fn score_with_verdict(
        &self,
        data: &QuestionData,
        is_correct: bool,
        response_time_ms: u64,
        question_duration_secs: u32,
    ) -> ScoreBreakdown {
        let options = ScoreOptions {
            is_correct,
            response_time_ms,
            question_duration_secs,
            base_points: self.base_points,
            speed_bonus_multiplier: self.speed_bonus_multiplier,
        };

        match self.registry.get(&data.question_type) {
            Some(plugin) => plugin.calculate_score(&options),
            None => ScoreBreakdown::incorrect(),
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(is_correct: bool, response_time_ms: u64) -> ScoreOptions {
        ScoreOptions {
            is_correct,
            response_time_ms,
            question_duration_secs: 30,
            base_points: 1000,
            speed_bonus_multiplier: 0.5,
        }
    }

    #[test]
    fn incorrect_answers_score_zero_regardless_of_timing() {
        for response_time_ms in [0, 1, 15_000, 30_000, 60_000] {
            let breakdown = default_score(&options(false, response_time_ms));
            assert_eq!(breakdown, ScoreBreakdown::incorrect());
        }
    }

    #[test]
    fn instant_answer_gets_full_speed_bonus() {
        let breakdown = default_score(&options(true, 0));
        assert_eq!(breakdown.base_points, 1000);
        assert_eq!(breakdown.speed_bonus, 500);
        assert_eq!(breakdown.total, 1500);
    }

    #[test]
    fn answer_at_deadline_gets_no_bonus() {
        let breakdown = default_score(&options(true, 30_000));
        assert_eq!(breakdown.speed_bonus, 0);
        assert_eq!(breakdown.total, 1000);
    }

    #[test]
    fn answer_past_deadline_clamps_to_no_bonus() {
        let breakdown = default_score(&options(true, 45_000));
        assert_eq!(breakdown.speed_bonus, 0);
        assert_eq!(breakdown.total, 1000);
    }

    #[test]
    fn bonus_uses_floor_rounding() {
        // 10s into 30s leaves ratio 2/3: 1000 * 0.5 * 2/3 = 333.33 -> 333.
        let breakdown = default_score(&options(true, 10_000));
        assert_eq!(breakdown.speed_bonus, 333);
        assert_eq!(breakdown.total, 1333);
    }

    #[test]
    fn zero_duration_question_awards_base_only() {
        let breakdown = default_score(&ScoreOptions {
            question_duration_secs: 0,
            ..options(true, 0)
        });
        assert_eq!(breakdown.total, 1000);
    }

    #[test]
    fn custom_base_points_scale_the_bonus() {
        let breakdown = default_score(&ScoreOptions {
            base_points: 2000,
            ..options(true, 0)
        });
        assert_eq!(breakdown.base_points, 2000);
        assert_eq!(breakdown.speed_bonus, 1000);
        assert_eq!(breakdown.total, 3000);
    }
}
