//! User confirmation seam
//!
//! The core never reads the console. Interactive questions (version
//! conflicts, license agreements) go through this callback, supplied at
//! initialization; under unattended operation the built-in
//! [`Unattended`] implementation answers every question with its
//! suggested default.

/// Callback for yes/no questions raised during resolution.
pub trait UserInput: Send + Sync {
    fn confirm(&self, question: &str, default_answer: bool) -> bool;
}

/// Answers every question with the default and logs that it did so.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unattended;

impl UserInput for Unattended {
    fn confirm(&self, question: &str, default_answer: bool) -> bool {
        tracing::warn!(
            question,
            answer = default_answer,
            "unattended mode, using default answer"
        );
        default_answer
    }
}
