use crate::plugins::{
    GameTypePlugin,
    question::{AnswerKey, AnswerValue, QuestionData},
};

/// Fixed option labels for O/X questions.
const OPTIONS: [&str; 2] = ["O", "X"];

/// Two-option O/X question: the answer must string-equal the correct label.
pub struct TrueFalsePlugin;

impl GameTypePlugin for TrueFalsePlugin {
    fn game_type(&self) -> &'static str {
        "true-false"
    }

    fn validate_question_data(&self, data: &QuestionData) -> bool {
        let options_fixed = data.options == OPTIONS;
        let answer_valid = matches!(
            data.correct_answer,
            Some(AnswerKey::One(ref answer)) if OPTIONS.contains(&answer.as_str())
        );
        options_fixed && answer_valid
    }

    fn check_answer(&self, data: &QuestionData, answer: &AnswerValue) -> bool {
        match (&data.correct_answer, answer.as_text()) {
            (Some(AnswerKey::One(correct)), Some(submitted)) => submitted == correct,
            _ => false,
        }
    }

    fn default_question_data(&self) -> QuestionData {
        let mut data = QuestionData::new(self.game_type());
        data.options = OPTIONS.iter().map(ToString::to_string).collect();
        data.correct_answer = Some(AnswerKey::One("O".into()));
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question() -> QuestionData {
        TrueFalsePlugin.default_question_data()
    }

    #[test]
    fn default_data_is_valid() {
        assert!(TrueFalsePlugin.validate_question_data(&question()));
    }

    #[test]
    fn options_must_be_exactly_o_and_x() {
        let mut data = question();
        data.options = vec!["Yes".into(), "No".into()];
        assert!(!TrueFalsePlugin.validate_question_data(&data));

        let mut data = question();
        data.options.push("Maybe".into());
        assert!(!TrueFalsePlugin.validate_question_data(&data));
    }

    #[test]
    fn exact_match_is_correct() {
        let data = question();
        assert!(TrueFalsePlugin.check_answer(&data, &AnswerValue::Text("O".into())));
        assert!(!TrueFalsePlugin.check_answer(&data, &AnswerValue::Text("X".into())));
    }

    #[test]
    fn non_text_submission_is_incorrect() {
        let data = question();
        assert!(!TrueFalsePlugin.check_answer(&data, &AnswerValue::Selection(vec!["O".into()])));
        assert!(!TrueFalsePlugin.check_answer(&data, &AnswerValue::Other(serde_json::json!(1))));
    }
}
