use crate::plugins::{
    GameTypePlugin,
    question::{AnswerKey, AnswerValue, QuestionData},
};

/// Free-text question accepting one or several answer strings.
///
/// Comparison trims surrounding whitespace and ignores case unless the
/// question sets `case_sensitive`. Non-string submissions are always
/// incorrect.
pub struct ShortAnswerPlugin;

impl GameTypePlugin for ShortAnswerPlugin {
    fn game_type(&self) -> &'static str {
        "short-answer"
    }

    fn validate_question_data(&self, data: &QuestionData) -> bool {
        match &data.correct_answer {
            Some(AnswerKey::One(answer)) => !answer.trim().is_empty(),
            Some(AnswerKey::Many(answers)) => {
                !answers.is_empty() && answers.iter().all(|answer| !answer.trim().is_empty())
            }
            None => false,
        }
    }

    fn check_answer(&self, data: &QuestionData, answer: &AnswerValue) -> bool {
        let Some(submitted) = answer.as_text() else {
            return false;
        };

        let accepted: &[String] = match &data.correct_answer {
            Some(AnswerKey::One(answer)) => std::slice::from_ref(answer),
            Some(AnswerKey::Many(answers)) => answers.as_slice(),
            None => return false,
        };

        let case_sensitive = data.settings.case_sensitive;
        accepted
            .iter()
            .any(|candidate| matches(candidate, submitted, case_sensitive))
    }

    fn default_question_data(&self) -> QuestionData {
        let mut data = QuestionData::new(self.game_type());
        data.correct_answer = Some(AnswerKey::One(String::new()));
        data
    }
}

fn matches(accepted: &str, submitted: &str, case_sensitive: bool) -> bool {
    let accepted = accepted.trim();
    let submitted = submitted.trim();
    if case_sensitive {
        accepted == submitted
    } else {
        accepted.to_lowercase() == submitted.to_lowercase()
    }
}
