//! Interactive confirmation through the terminal

use dialoguer::Confirm;
use uppm_core::UserInput;

/// Asks yes/no questions with dialoguer.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsolePrompt;

impl UserInput for ConsolePrompt {
    fn confirm(&self, question: &str, default_answer: bool) -> bool {
        Confirm::new()
            .with_prompt(question)
            .default(default_answer)
            .interact()
            .unwrap_or_else(|error| {
                tracing::warn!(%error, "prompt failed, using default answer");
                default_answer
            })
    }
}
