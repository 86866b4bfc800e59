//! LLM second opinion on well readings
//!
//! The judge describes the measurement in a prompt and parses the reply by
//! substring, since vision-style verdicts rarely come back as clean JSON.
//! A judge failure is a labeled data point ("error"), never a run abort.

use crate::classifier::WellMeasurement;
use platecheck_llm::{truncate_safe, ChatProvider, CompletionRequest, Message};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// Rationale text is capped at this many bytes.
const MAX_RATIONALE_BYTES: usize = 200;

const JUDGE_SYSTEM: &str = "\
You are a microbiologist reviewing optical readings of culture plate wells. \
Given turbidity and texture variance for a well, state whether the well looks \
clean or contaminated and briefly explain why.";

/// LLM verdict label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JudgeLabel {
    /// Reply indicated no growth
    Clean,
    /// Reply indicated contamination
    Contaminated,
    /// Reply gave no recognizable verdict
    Uncertain,
    /// The model call itself failed
    Error,
}

/// One LLM opinion about a well.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeVerdict {
    /// Parsed label
    pub label: JudgeLabel,
    /// Model's reasoning, capped at 200 bytes
    pub rationale: String,
}

/// LLM-backed well judge.
pub struct WellJudge {
    provider: Arc<dyn ChatProvider>,
    model: String,
}

impl WellJudge {
    /// Create a judge on top of a chat provider.
    pub fn new(provider: Arc<dyn ChatProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// Judge one measurement. Infallible by contract: a failed model call
    /// becomes an `error`-labeled verdict carrying the reason.
    pub async fn judge(&self, measurement: &WellMeasurement) -> JudgeVerdict {
        let prompt = format!(
            "Well {}: turbidity {:.3}, texture variance {:.3}. \
             Is this well clean or contaminated?",
            measurement.well_id, measurement.turbidity, measurement.texture_variance
        );
        let request = CompletionRequest::new(self.model.clone())
            .with_system(JUDGE_SYSTEM)
            .with_message(Message::user(prompt))
            .with_temperature(0.2);

        match self.provider.complete(request).await {
            Ok(response) => parse_verdict(&response.content),
            Err(e) => {
                warn!(well = %measurement.well_id, error = %e, "well judge call failed");
                JudgeVerdict {
                    label: JudgeLabel::Error,
                    rationale: truncate_safe(&e.to_string(), MAX_RATIONALE_BYTES).to_string(),
                }
            }
        }
    }
}

/// Parse a free-text reply into a verdict.
///
/// "contaminat" wins over the clean markers when both appear, so hedged
/// replies ("clean wells never look like this, it is contaminated") read as
/// contaminated.
#[must_use]
pub fn parse_verdict(reply: &str) -> JudgeVerdict {
    let lowered = reply.to_lowercase();
    let label = if lowered.contains("contaminat") {
        JudgeLabel::Contaminated
    } else if ["clean", "pure", "healthy"]
        .iter()
        .any(|marker| lowered.contains(marker))
    {
        JudgeLabel::Clean
    } else {
        JudgeLabel::Uncertain
    };
    JudgeVerdict {
        label,
        rationale: truncate_safe(reply.trim(), MAX_RATIONALE_BYTES).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platecheck_llm::{CompletionResponse, Error as LlmError};

    struct StaticProvider {
        reply: Option<String>,
    }

    #[async_trait::async_trait]
    impl ChatProvider for StaticProvider {
        fn name(&self) -> &str {
            "static"
        }

        fn default_model(&self) -> &str {
            "static-model"
        }

        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> platecheck_llm::Result<CompletionResponse> {
            match &self.reply {
                Some(content) => Ok(CompletionResponse {
                    content: content.clone(),
                    usage: None,
                    finish_reason: Some("stop".to_string()),
                    model: "static-model".to_string(),
                }),
                None => Err(LlmError::Api("provider down".to_string())),
            }
        }
    }

    fn measurement() -> WellMeasurement {
        WellMeasurement {
            well_id: "A2".to_string(),
            turbidity: 0.8,
            texture_variance: 0.6,
        }
    }

    #[test]
    fn test_parse_contaminated() {
        let verdict = parse_verdict("This well is clearly CONTAMINATED, heavy growth.");
        assert_eq!(verdict.label, JudgeLabel::Contaminated);
        assert!(verdict.rationale.contains("heavy growth"));
    }

    #[test]
    fn test_parse_clean_markers() {
        for reply in ["Looks clean to me.", "The well is pure.", "Healthy culture."] {
            assert_eq!(parse_verdict(reply).label, JudgeLabel::Clean);
        }
    }

    #[test]
    fn test_contamination_wins_over_clean_marker() {
        let verdict = parse_verdict("Clean wells never look like this, it is contaminated.");
        assert_eq!(verdict.label, JudgeLabel::Contaminated);
    }

    #[test]
    fn test_parse_uncertain() {
        let verdict = parse_verdict("I cannot tell from these numbers.");
        assert_eq!(verdict.label, JudgeLabel::Uncertain);
    }

    #[test]
    fn test_rationale_truncated() {
        let long = "contaminated ".repeat(50);
        let verdict = parse_verdict(&long);
        assert!(verdict.rationale.len() <= 200);
    }

    #[tokio::test]
    async fn test_judge_happy_path() {
        let judge = WellJudge::new(
            Arc::new(StaticProvider {
                reply: Some("Contaminated: turbidity is far above baseline.".to_string()),
            }),
            "static-model",
        );
        let verdict = judge.judge(&measurement()).await;
        assert_eq!(verdict.label, JudgeLabel::Contaminated);
    }

    #[tokio::test]
    async fn test_judge_failure_is_error_label() {
        let judge = WellJudge::new(Arc::new(StaticProvider { reply: None }), "static-model");
        let verdict = judge.judge(&measurement()).await;
        assert_eq!(verdict.label, JudgeLabel::Error);
        assert!(verdict.rationale.contains("provider down"));
    }
}
