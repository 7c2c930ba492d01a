//! Per-item outcomes and the aggregate summary of a bulk run.

use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::time::Duration;

use crate::client::ServiceModel;

/// Result of retrieving one identifier.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(ServiceModel),
    Failure(String),
}

/// An identifier paired with its outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemOutcome {
    pub service_id: String,
    pub outcome: Outcome,
}

impl ItemOutcome {
    pub fn success(service_id: String, data: ServiceModel) -> Self {
        Self {
            service_id,
            outcome: Outcome::Success(data),
        }
    }

    pub fn failure(service_id: String, error: impl Into<String>) -> Self {
        Self {
            service_id,
            outcome: Outcome::Failure(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success(_))
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Failure(e) => Some(e),
            Outcome::Success(_) => None,
        }
    }
}

/// Serialized as `{serviceId, success, data?, error?}`.
impl Serialize for ItemOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("BulkResult", 3)?;
        s.serialize_field("serviceId", &self.service_id)?;
        s.serialize_field("success", &self.is_success())?;
        match &self.outcome {
            Outcome::Success(data) => s.serialize_field("data", data)?,
            Outcome::Failure(error) => s.serialize_field("error", error)?,
        }
        s.end()
    }
}

/// Aggregate counters for a bulk run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSummary {
    pub total_requests: usize,
    pub successful_count: usize,
    pub failed_count: usize,
    pub processing_time_ms: u64,
}

impl BulkSummary {
    pub fn from_outcomes(outcomes: &[ItemOutcome], elapsed: Duration) -> Self {
        let successful_count = outcomes.iter().filter(|o| o.is_success()).count();
        Self {
            total_requests: outcomes.len(),
            successful_count,
            failed_count: outcomes.len() - successful_count,
            processing_time_ms: elapsed.as_millis() as u64,
        }
    }
}

/// Everything a bulk run produces.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkReport {
    /// One entry per input identifier, in input order.
    pub outcomes: Vec<ItemOutcome>,
    pub summary: BulkSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(id: &str) -> ServiceModel {
        ServiceModel {
            id: id.to_string(),
            resources: Vec::new(),
        }
    }

    #[test]
    fn test_summary_counts() {
        let outcomes = vec![
            ItemOutcome::success("a".into(), model("a")),
            ItemOutcome::failure("b".into(), "unexpected response status: 503"),
            ItemOutcome::success("c".into(), model("c")),
        ];
        let summary = BulkSummary::from_outcomes(&outcomes, Duration::from_millis(42));
        assert_eq!(
            summary,
            BulkSummary {
                total_requests: 3,
                successful_count: 2,
                failed_count: 1,
                processing_time_ms: 42,
            }
        );
    }

    #[test]
    fn test_serialized_shape() {
        let ok = serde_json::to_value(ItemOutcome::success("a".into(), model("a"))).unwrap();
        assert_eq!(ok["serviceId"], "a");
        assert_eq!(ok["success"], true);
        assert_eq!(ok["data"]["id"], "a");
        assert!(ok.get("error").is_none());

        let failed = serde_json::to_value(ItemOutcome::failure("b".into(), "boom")).unwrap();
        assert_eq!(failed["success"], false);
        assert_eq!(failed["error"], "boom");
        assert!(failed.get("data").is_none());

        let summary = serde_json::to_value(BulkSummary::default()).unwrap();
        assert_eq!(summary["totalRequests"], 0);
        assert_eq!(summary["processingTimeMs"], 0);
    }
}
