use std::collections::HashSet;

use crate::plugins::{
    GameTypePlugin,
    question::{AnswerKey, AnswerValue, QuestionData},
};

/// Allowed option count range.
const MIN_OPTIONS: usize = 2;
const MAX_OPTIONS: usize = 6;

/// Multiple-choice question with 2 to 6 options.
///
/// `correct_answer` may be a single option or an array (multi-select); array
/// comparison is order-independent set equality, not subset-tolerant.
pub struct MultipleChoicePlugin;

impl GameTypePlugin for MultipleChoicePlugin {
    fn game_type(&self) -> &'static str {
        "multiple-choice"
    }

    fn validate_question_data(&self, data: &QuestionData) -> bool {
        if data.options.len() < MIN_OPTIONS || data.options.len() > MAX_OPTIONS {
            return false;
        }

        match &data.correct_answer {
            Some(AnswerKey::One(answer)) => data.options.contains(answer),
            Some(AnswerKey::Many(answers)) => {
                !answers.is_empty() && answers.iter().all(|answer| data.options.contains(answer))
            }
            None => false,
        }
    }

    fn check_answer(&self, data: &QuestionData, answer: &AnswerValue) -> bool {
        match &data.correct_answer {
            Some(AnswerKey::One(correct)) => answer.as_text() == Some(correct.as_str()),
            Some(AnswerKey::Many(correct)) => match answer.as_selection() {
                Some(submitted) => set_equal(correct, submitted),
                None => false,
            },
            None => false,
        }
    }

    fn default_question_data(&self) -> QuestionData {
        let mut data = QuestionData::new(self.game_type());
        data.options = (1..=4).map(|n| format!("Option {n}")).collect();
        data.correct_answer = Some(AnswerKey::One("Option 1".into()));
        data
    }
}

/// Order-independent equality between two answer lists.
fn set_equal(a: &[String], b: &[String]) -> bool {
    let a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let b: HashSet<&str> = b.iter().map(String::as_str).collect();
    a == b
}

#[cfg(test)]
mod tests {
    use super::*;

    fn multi_select() -> QuestionData {
        let mut data = MultipleChoicePlugin.default_question_data();
        data.correct_answer = Some(AnswerKey::Many(vec!["Option 1".into(), "Option 2".into()]));
        data
    }

    #[test]
    fn option_count_bounds_are_enforced() {
        let mut data = MultipleChoicePlugin.default_question_data();
        data.options.truncate(1);
        assert!(!MultipleChoicePlugin.validate_question_data(&data));

        let mut data = MultipleChoicePlugin.default_question_data();
        data.options = (1..=7).map(|n| format!("Option {n}")).collect();
        assert!(!MultipleChoicePlugin.validate_question_data(&data));
    }

    #[test]
    fn correct_answer_must_be_an_option() {
        let mut data = MultipleChoicePlugin.default_question_data();
        data.correct_answer = Some(AnswerKey::One("Option 9".into()));
        assert!(!MultipleChoicePlugin.validate_question_data(&data));
    }

    #[test]
    fn single_answer_matches_by_equality() {
        let data = MultipleChoicePlugin.default_question_data();
        assert!(MultipleChoicePlugin.check_answer(&data, &AnswerValue::Text("Option 1".into())));
        assert!(!MultipleChoicePlugin.check_answer(&data, &AnswerValue::Text("Option 2".into())));
    }

    #[test]
    fn array_comparison_is_order_independent() {
        let data = multi_select();
        let submitted = AnswerValue::Selection(vec!["Option 2".into(), "Option 1".into()]);
        assert!(MultipleChoicePlugin.check_answer(&data, &submitted));
    }

    #[test]
    fn array_comparison_is_not_subset_tolerant() {
        let data = multi_select();

        let missing = AnswerValue::Selection(vec!["Option 1".into()]);
        assert!(!MultipleChoicePlugin.check_answer(&data, &missing));

        let extra = AnswerValue::Selection(vec![
            "Option 1".into(),
            "Option 2".into(),
            "Option 3".into(),
        ]);
        assert!(!MultipleChoicePlugin.check_answer(&data, &extra));
    }

    #[test]
    fn shape_mismatch_is_incorrect() {
        let data = multi_select();
        assert!(!MultipleChoicePlugin.check_answer(&data, &AnswerValue::Text("Option 1".into())));
    }
}
