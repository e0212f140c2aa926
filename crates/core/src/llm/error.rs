use crate::llm::Provider;
use std::fmt;

const SNIPPET_MAX_CHARS: usize = 400;

/// Failure taxonomy for the generator client. Store-layer faults never reach
/// this type; these all surface to the caller verbatim.
#[derive(Debug, Clone)]
pub enum GeneratorError {
    /// Response was not valid JSON, or parsed but broke the report contract.
    /// Carries a truncated snippet of the raw output for diagnosis.
    SchemaViolation {
        provider: Provider,
        detail: String,
        snippet: String,
    },
    /// Backend signalled the generation was blocked or incomplete (safety
    /// stop, truncation). User-actionable: try a different date.
    BackendRefusal { provider: Provider, reason: String },
    /// Network or backend-unavailable failure.
    Transport { provider: Provider, detail: String },
}

impl GeneratorError {
    pub fn snippet_of(raw: &str) -> String {
        if raw.chars().count() <= SNIPPET_MAX_CHARS {
            return raw.to_string();
        }
        let truncated: String = raw.chars().take(SNIPPET_MAX_CHARS).collect();
        format!("{truncated}…")
    }
}

impl fmt::Display for GeneratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SchemaViolation {
                provider, detail, ..
            } => write!(
                f,
                "generator returned an invalid report (provider={provider:?}): {detail}"
            ),
            Self::BackendRefusal { provider, reason } => write!(
                f,
                "generation was blocked or incomplete (provider={provider:?}): {reason}; \
                 try a different date"
            ),
            Self::Transport { provider, detail } => write!(
                f,
                "generator backend unavailable (provider={provider:?}): {detail}"
            ),
        }
    }
}

impl std::error::Error for GeneratorError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_truncates_long_output() {
        let raw = "x".repeat(1000);
        let snippet = GeneratorError::snippet_of(&raw);
        assert!(snippet.chars().count() <= SNIPPET_MAX_CHARS + 1);
        assert!(snippet.ends_with('…'));
    }

    #[test]
    fn snippet_keeps_short_output_intact() {
        assert_eq!(GeneratorError::snippet_of("{\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn refusal_message_is_user_actionable() {
        let err = GeneratorError::BackendRefusal {
            provider: Provider::Anthropic,
            reason: "safety stop".to_string(),
        };
        assert!(err.to_string().contains("try a different date"));
    }
}
