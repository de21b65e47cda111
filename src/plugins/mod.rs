//! Game type plugins: answer validation, scoring, and phase handling per question type.

/// Voting question without an objectively correct answer.
pub mod balance_game;
/// Phase-driven party game plugin.
pub mod liar_game;
/// Multiple-choice question plugin.
pub mod multiple_choice;
/// Question payload types shared by all plugins.
pub mod question;
/// Point calculation and the registry-backed score calculator.
pub mod scoring;
/// Free-text answer plugin.
pub mod short_answer;
/// Two-option O/X question plugin.
pub mod true_false;

use std::{collections::HashMap, sync::Arc};

use thiserror::Error;

use crate::{
    error::ServiceError,
    plugins::{
        question::{AnswerValue, QuestionData},
        scoring::{ScoreBreakdown, ScoreOptions, default_score},
    },
    state::party::{GameAction, SessionState},
};

/// Behavior bundle for one question or party game type.
///
/// Question plugins implement [`validate_question_data`] and [`check_answer`]
/// and inherit the default scoring algorithm; party plugins override
/// [`process_action`] instead and never score.
///
/// [`validate_question_data`]: GameTypePlugin::validate_question_data
/// [`check_answer`]: GameTypePlugin::check_answer
/// [`process_action`]: GameTypePlugin::process_action
pub trait GameTypePlugin: Send + Sync {
    /// Type string this plugin handles, matched against `QuestionData::question_type`.
    fn game_type(&self) -> &'static str;

    /// Schema check for authored question data of this type.
    fn validate_question_data(&self, data: &QuestionData) -> bool;

    /// Judge a submitted answer against the question data.
    fn check_answer(&self, data: &QuestionData, answer: &AnswerValue) -> bool;

    /// Compute the point award for a judged answer.
    fn calculate_score(&self, options: &ScoreOptions) -> ScoreBreakdown {
        default_score(options)
    }

    /// Skeleton question data used when authoring a new question of this type.
    fn default_question_data(&self) -> QuestionData;

    /// Apply a party-game action to the session, returning the new session.
    ///
    /// Question plugins keep the default, which rejects phase actions.
    fn process_action(
        &self,
        _session: SessionState,
        action: &GameAction,
    ) -> Result<SessionState, ServiceError> {
        Err(ServiceError::InvalidState(format!(
            "game type `{}` does not handle action `{}`",
            self.game_type(),
            action.action_type
        )))
    }
}

/// Error raised when registering a plugin fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A plugin with the same type string is already registered.
    #[error("game type `{0}` is already registered")]
    DuplicateType(String),
}

/// Explicit plugin registry, built once at startup and injected through
/// `AppState`. Registration happens before traffic is served; afterwards the
/// registry is only read.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: HashMap<String, Arc<dyn GameTypePlugin>>,
}

impl PluginRegistry {
    /// Empty registry, mostly useful in tests.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with every built-in plugin.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for plugin in builtin_plugins() {
            // Built-in type strings are distinct, so this cannot fail.
            registry
                .register(plugin)
                .unwrap_or_else(|err| panic!("built-in plugin registration failed: {err}"));
        }
        registry
    }

    /// Register a plugin, refusing silent overwrites of an existing type.
    pub fn register(&mut self, plugin: Arc<dyn GameTypePlugin>) -> Result<(), RegistryError> {
        let game_type = plugin.game_type().to_string();
        if self.plugins.contains_key(&game_type) {
            return Err(RegistryError::DuplicateType(game_type));
        }
        self.plugins.insert(game_type, plugin);
        Ok(())
    }

    /// Look up the plugin for a type string.
    pub fn get(&self, game_type: &str) -> Option<Arc<dyn GameTypePlugin>> {
        self.plugins.get(game_type).cloned()
    }

    /// Remove a plugin, returning it when present. For test isolation.
    pub fn unregister(&mut self, game_type: &str) -> Option<Arc<dyn GameTypePlugin>> {
        self.plugins.remove(game_type)
    }

    /// Drop every registered plugin. For test isolation.
    pub fn clear(&mut self) {
        self.plugins.clear();
    }

    /// Registered type strings, unordered.
    pub fn types(&self) -> Vec<&str> {
        self.plugins.keys().map(String::as_str).collect()
    }
}

/// The set of plugins shipped with the engine.
fn builtin_plugins() -> Vec<Arc<dyn GameTypePlugin>> {
    vec![
        Arc::new(true_false::TrueFalsePlugin),
        Arc::new(multiple_choice::MultipleChoicePlugin),
        Arc::new(short_answer::ShortAnswerPlugin),
        Arc::new(balance_game::BalanceGamePlugin),
        Arc::new(liar_game::LiarGamePlugin),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_all_registered() {
        let registry = PluginRegistry::with_builtins();
        for game_type in [
            "true-false",
            "multiple-choice",
            "short-answer",
            "balance-game",
            "liar-game",
        ] {
            assert!(registry.get(game_type).is_some(), "missing {game_type}");
        }
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = PluginRegistry::with_builtins();
        let err = registry
            .register(Arc::new(true_false::TrueFalsePlugin))
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateType("true-false".into()));
        // The original plugin is untouched.
        assert!(registry.get("true-false").is_some());
    }

    #[test]
    fn unregister_and_clear_support_test_isolation() {
        let mut registry = PluginRegistry::with_builtins();
        assert!(registry.unregister("short-answer").is_some());
        assert!(registry.get("short-answer").is_none());

        registry.clear();
        assert!(registry.types().is_empty());
    }

    #[test]
    fn unknown_type_lookup_returns_none() {
        let registry = PluginRegistry::with_builtins();
        assert!(registry.get("karaoke").is_none());
    }
}
