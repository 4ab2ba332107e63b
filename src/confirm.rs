use crate::trace::TraceSink;
use crate::{Error, Result};

use std::fmt::Debug;

/// How disruptive an action is.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum ImpactLevel {
    None,
    #[default]
    Low,
    Medium,
    High,
}

/// Per-request confirmation behavior.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum ConfirmMode {
    /// Prompt only when the action's impact reaches the configured threshold.
    #[default]
    Default,
    /// Always prompt.
    Prompt,
    /// Never prompt.
    Force,
    /// Describe the action and decline it.
    WhatIf,
}

/// What the confirmer is asked to approve.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct ConfirmPrompt {
    /// Action verb, e.g. `Stop-ScheduledTask`.
    pub action: String,
    /// Human description of the object, e.g. `\Backup\Nightly on srv01`.
    pub target: String,
    pub impact: ImpactLevel,
}

/// Answers confirmation prompts.
pub trait Confirmer: Send + Sync + Debug {
    /// `Ok(true)` to proceed, `Ok(false)` to decline.
    fn confirm(&self, prompt: &ConfirmPrompt) -> Result<bool>;
}

/// Confirmer for unattended use: any prompt is an error.
#[derive(Clone, Copy, Debug, Default)]
pub struct NonInteractive;

impl Confirmer for NonInteractive {
    fn confirm(&self, prompt: &ConfirmPrompt) -> Result<bool> {
        Err(Error::ConfirmationUnavailable {
            action: prompt.action.clone(),
            target: prompt.target.clone(),
        })
    }
}

/// Outcome of the confirmation gate.
#[derive(Debug)]
pub enum Gate {
    Proceed,
    /// Declined or previewed: the action does nothing and reports success.
    Declined,
    Failed(Error),
}

pub(crate) fn gate(
    mode: ConfirmMode,
    threshold: ImpactLevel,
    prompt: &ConfirmPrompt,
    confirmer: &dyn Confirmer,
    trace: &dyn TraceSink,
) -> Gate {
    let ask = match mode {
        ConfirmMode::WhatIf => {
            trace.verbose(&format!(
                "What if: Performing the operation \"{}\" on target \"{}\".",
                prompt.action, prompt.target
            ));
            return Gate::Declined;
        }
        ConfirmMode::Force => false,
        ConfirmMode::Prompt => true,
        ConfirmMode::Default => prompt.impact != ImpactLevel::None && prompt.impact >= threshold,
    };

    if !ask {
        return Gate::Proceed;
    }

    match confirmer.confirm(prompt) {
        Ok(true) => Gate::Proceed,
        Ok(false) => {
            trace.verbose(&format!(
                "Declined: \"{}\" on target \"{}\".",
                prompt.action, prompt.target
            ));
            Gate::Declined
        }
        Err(e) => Gate::Failed(e),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::trace::TracingSink;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Answer {
        yes: bool,
        asked: AtomicUsize,
    }

    impl Answer {
        fn new(yes: bool) -> Self {
            Self {
                yes,
                asked: AtomicUsize::new(0),
            }
        }
    }

    impl Confirmer for Answer {
        fn confirm(&self, _prompt: &ConfirmPrompt) -> Result<bool> {
            self.asked.fetch_add(1, Ordering::SeqCst);
            Ok(self.yes)
        }
    }

    fn prompt(impact: ImpactLevel) -> ConfirmPrompt {
        ConfirmPrompt {
            action: "Stop-ScheduledTask".to_string(),
            target: "\\Backup on localhost".to_string(),
            impact,
        }
    }

    #[test]
    fn what_if_declines_without_asking() {
        let c = Answer::new(true);
        let out = gate(
            ConfirmMode::WhatIf,
            ImpactLevel::High,
            &prompt(ImpactLevel::Medium),
            &c,
            &TracingSink,
        );
        assert!(matches!(out, Gate::Declined));
        assert_eq!(c.asked.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn default_mode_skips_prompt_below_threshold() {
        let c = Answer::new(false);
        let out = gate(
            ConfirmMode::Default,
            ImpactLevel::High,
            &prompt(ImpactLevel::Medium),
            &c,
            &TracingSink,
        );
        assert!(matches!(out, Gate::Proceed));
        assert_eq!(c.asked.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn default_mode_prompts_at_threshold() {
        let c = Answer::new(false);
        let out = gate(
            ConfirmMode::Default,
            ImpactLevel::Medium,
            &prompt(ImpactLevel::Medium),
            &c,
            &TracingSink,
        );
        assert!(matches!(out, Gate::Declined));
        assert_eq!(c.asked.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn force_never_prompts() {
        let out = gate(
            ConfirmMode::Force,
            ImpactLevel::Low,
            &prompt(ImpactLevel::High),
            &NonInteractive,
            &TracingSink,
        );
        assert!(matches!(out, Gate::Proceed));
    }

    #[test]
    fn non_interactive_prompt_fails() {
        let out = gate(
            ConfirmMode::Prompt,
            ImpactLevel::High,
            &prompt(ImpactLevel::Medium),
            &NonInteractive,
            &TracingSink,
        );
        let Gate::Failed(Error::ConfirmationUnavailable { action, .. }) = out else {
            panic!("unexpected gate: {out:?}");
        };
        assert_eq!(action, "Stop-ScheduledTask");
    }
}
