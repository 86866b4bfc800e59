//! Checklist types and the strict parsing/reconciliation boundary
//!
//! Model output is validated here, at the edge; nothing downstream ever
//! touches unvalidated structure. Checkpoint ids are assigned sequentially
//! at generation time and stay stable for the life of the session, so
//! repeated verification attempts are comparable id-by-id.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Verdict for a single checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// Requirement visibly satisfied
    Pass,
    /// Requirement not satisfied (or not confirmable)
    Fail,
    /// Not yet verified
    Unset,
}

/// Aggregate verdict over a whole checklist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallResult {
    /// Every checkpoint passed
    Pass,
    /// At least one checkpoint failed
    Fail,
}

/// A single verifiable claim about the physical setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Sequential id, unique within the checklist, stable across retries
    pub id: u32,
    /// Checkpoint category (labware_position, labware_condition, ...)
    #[serde(default)]
    pub category: String,
    /// Human-readable description of what to check
    pub description: String,
    /// Expected physical state
    #[serde(default)]
    pub expected: String,
}

/// A checkpoint paired with its verdict from one verification attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointResult {
    /// Checkpoint id
    pub id: u32,
    /// Checkpoint description (carried for display)
    pub description: String,
    /// Verdict
    pub result: Verdict,
    /// Free-text detail; non-empty on fail
    #[serde(default)]
    pub details: String,
}

/// Result of verifying one image against a checklist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Per-checkpoint verdicts, in checklist order
    pub checkpoints: Vec<CheckpointResult>,
    /// Aggregate verdict
    pub overall_result: OverallResult,
}

impl VerificationResult {
    /// Whether the whole checklist passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.overall_result == OverallResult::Pass
    }
}

// ============================================================================
// Model-boundary parsing
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawChecklist {
    checkpoints: Vec<RawCheckpoint>,
}

#[derive(Debug, Deserialize)]
struct RawCheckpoint {
    #[serde(default)]
    category: String,
    description: String,
    #[serde(default)]
    expected: String,
}

/// Parse a phase-1 model reply into a checklist.
///
/// Ids are assigned sequentially here, regardless of what the model claims;
/// an empty checklist is a parse error, never a vacuous pass.
pub fn parse_checklist(value: &serde_json::Value) -> Result<Vec<Checkpoint>> {
    let raw: RawChecklist = serde_json::from_value(value.clone())
        .map_err(|e| Error::Parse(format!("checklist schema mismatch: {}", e)))?;

    if raw.checkpoints.is_empty() {
        return Err(Error::Parse("model returned an empty checklist".to_string()));
    }

    Ok(raw
        .checkpoints
        .into_iter()
        .enumerate()
        .map(|(index, cp)| Checkpoint {
            id: index as u32 + 1,
            category: cp.category,
            description: cp.description,
            expected: cp.expected,
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct RawResults {
    results: Vec<RawVerdict>,
}

#[derive(Debug, Deserialize)]
struct RawVerdict {
    id: u32,
    result: String,
    #[serde(default)]
    details: String,
}

/// Parse a phase-2 model reply and reconcile it against the checklist.
///
/// Guarantees exactly one verdict per original checkpoint id: a checkpoint
/// the model skipped becomes a fail with a generic detail (silently dropping
/// it would be worse than an over-conservative fail), verdicts for unknown
/// ids are discarded, and any verdict other than "pass" counts as fail.
pub fn parse_and_reconcile(
    checklist: &[Checkpoint],
    value: &serde_json::Value,
) -> Result<VerificationResult> {
    let raw: RawResults = serde_json::from_value(value.clone())
        .map_err(|e| Error::Parse(format!("verification schema mismatch: {}", e)))?;

    Ok(reconcile(checklist, &raw.results))
}

fn reconcile(checklist: &[Checkpoint], raw: &[RawVerdict]) -> VerificationResult {
    let checkpoints: Vec<CheckpointResult> = checklist
        .iter()
        .map(|cp| match raw.iter().find(|v| v.id == cp.id) {
            Some(verdict) if verdict.result.eq_ignore_ascii_case("pass") => CheckpointResult {
                id: cp.id,
                description: cp.description.clone(),
                result: Verdict::Pass,
                details: verdict.details.clone(),
            },
            Some(verdict) => CheckpointResult {
                id: cp.id,
                description: cp.description.clone(),
                result: Verdict::Fail,
                details: if verdict.details.is_empty() {
                    format!("reported \"{}\" without detail", verdict.result)
                } else {
                    verdict.details.clone()
                },
            },
            None => CheckpointResult {
                id: cp.id,
                description: cp.description.clone(),
                result: Verdict::Fail,
                details: "not addressed by verifier".to_string(),
            },
        })
        .collect();

    // Absolute aggregation: any fail fails the whole attempt.
    let overall = if checkpoints.iter().all(|r| r.result == Verdict::Pass) {
        OverallResult::Pass
    } else {
        OverallResult::Fail
    };

    VerificationResult {
        checkpoints,
        overall_result: overall,
    }
}

/// Render a checklist as the canonical JSON the model is held to.
#[must_use]
pub fn checklist_to_json(checklist: &[Checkpoint]) -> String {
    serde_json::to_string_pretty(&serde_json::json!({ "checkpoints": checklist }))
        .unwrap_or_else(|_| "{\"checkpoints\": []}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_checklist() -> Vec<Checkpoint> {
        parse_checklist(&json!({
            "checkpoints": [
                {"category": "labware_position", "description": "Tip rack at C2",
                 "expected": "96-tip rack present at C2"},
                {"category": "trash", "description": "Trash bin at A3",
                 "expected": "Trash bin present at A3"},
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_checklist_assigns_sequential_ids() {
        let checklist = sample_checklist();
        assert_eq!(checklist.len(), 2);
        assert_eq!(checklist[0].id, 1);
        assert_eq!(checklist[1].id, 2);
        assert!(checklist[0].description.contains("C2"));
        assert!(checklist[1].description.contains("A3"));
    }

    #[test]
    fn test_parse_checklist_empty_is_parse_error() {
        let err = parse_checklist(&json!({"checkpoints": []})).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_parse_checklist_schema_mismatch() {
        let err = parse_checklist(&json!({"items": [1, 2]})).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_reconcile_all_pass() {
        let checklist = sample_checklist();
        let result = parse_and_reconcile(
            &checklist,
            &json!({"results": [
                {"id": 1, "result": "pass", "details": "tip rack visible at C2"},
                {"id": 2, "result": "PASS", "details": "trash bin at A3"},
            ]}),
        )
        .unwrap();
        assert_eq!(result.overall_result, OverallResult::Pass);
        assert!(result.passed());
    }

    #[test]
    fn test_reconcile_single_fail_fails_overall() {
        let checklist = sample_checklist();
        let result = parse_and_reconcile(
            &checklist,
            &json!({"results": [
                {"id": 1, "result": "fail", "details": "C2 is empty"},
                {"id": 2, "result": "pass", "details": ""},
            ]}),
        )
        .unwrap();
        assert_eq!(result.overall_result, OverallResult::Fail);
        assert_eq!(result.checkpoints[0].result, Verdict::Fail);
        assert!(!result.checkpoints[0].details.is_empty());
    }

    #[test]
    fn test_reconcile_missing_id_becomes_fail() {
        let checklist = sample_checklist();
        let result = parse_and_reconcile(
            &checklist,
            &json!({"results": [
                {"id": 1, "result": "pass", "details": "ok"},
            ]}),
        )
        .unwrap();
        // Every checkpoint id appears exactly once, skipped one fails.
        assert_eq!(result.checkpoints.len(), 2);
        assert_eq!(result.checkpoints[1].id, 2);
        assert_eq!(result.checkpoints[1].result, Verdict::Fail);
        assert_eq!(result.checkpoints[1].details, "not addressed by verifier");
        assert_eq!(result.overall_result, OverallResult::Fail);
    }

    #[test]
    fn test_reconcile_unknown_ids_dropped() {
        let checklist = sample_checklist();
        let result = parse_and_reconcile(
            &checklist,
            &json!({"results": [
                {"id": 1, "result": "pass"},
                {"id": 2, "result": "pass"},
                {"id": 99, "result": "fail", "details": "phantom"},
            ]}),
        )
        .unwrap();
        assert_eq!(result.checkpoints.len(), 2);
        assert_eq!(result.overall_result, OverallResult::Pass);
    }

    #[test]
    fn test_reconcile_unknown_verdict_counts_as_fail() {
        let checklist = sample_checklist();
        let result = parse_and_reconcile(
            &checklist,
            &json!({"results": [
                {"id": 1, "result": "unclear"},
                {"id": 2, "result": "pass"},
            ]}),
        )
        .unwrap();
        assert_eq!(result.checkpoints[0].result, Verdict::Fail);
        assert!(result.checkpoints[0].details.contains("unclear"));
    }

    #[test]
    fn test_ids_stable_across_attempts() {
        let checklist = sample_checklist();
        let first = parse_and_reconcile(
            &checklist,
            &json!({"results": [{"id": 1, "result": "fail", "details": "empty"}]}),
        )
        .unwrap();
        let second = parse_and_reconcile(
            &checklist,
            &json!({"results": [
                {"id": 1, "result": "pass"}, {"id": 2, "result": "pass"},
            ]}),
        )
        .unwrap();
        let first_ids: Vec<u32> = first.checkpoints.iter().map(|c| c.id).collect();
        let second_ids: Vec<u32> = second.checkpoints.iter().map(|c| c.id).collect();
        assert_eq!(first_ids, second_ids);
    }

    #[test]
    fn test_checklist_json_roundtrip() {
        let checklist = sample_checklist();
        let json = checklist_to_json(&checklist);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["checkpoints"][0]["id"], 1);
    }
}
