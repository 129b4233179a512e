//! Validation metrics.
//!
//! Only the `metrics` facade is used here; installing an exporter is left to
//! the application.

use metrics::{counter, describe_counter};

/// Failed request regions, labelled by `region`.
pub const REQUEST_VALIDATION_FAILURES: &str = "warden_request_validation_failures_total";

/// Response validations, labelled by `status` and `outcome`.
pub const RESPONSE_VALIDATIONS: &str = "warden_response_validation_total";

/// Registers descriptions for the validation metrics.
pub fn describe_metrics() {
    describe_counter!(
        REQUEST_VALIDATION_FAILURES,
        "Total request regions that failed validation"
    );
    describe_counter!(
        RESPONSE_VALIDATIONS,
        "Total response emissions seen by the response interceptor, by outcome"
    );
}

/// Outcome label of a response validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// Body validated and forwarded
    Valid,
    /// Body failed validation
    Invalid,
    /// Status exempt or bypassed
    Exempt,
    /// No rule for the status
    Unchecked,
    /// Adapter fault or missing adapter
    Fault,
}

impl ResponseOutcome {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Invalid => "invalid",
            Self::Exempt => "exempt",
            Self::Unchecked => "unchecked",
            Self::Fault => "fault",
        }
    }
}

/// Records a failed request region.
pub fn record_request_failure(region: &str) {
    counter!(REQUEST_VALIDATION_FAILURES, "region" => region.to_string()).increment(1);
}

/// Records one response validation.
pub fn record_response(status: u16, outcome: ResponseOutcome) {
    counter!(
        RESPONSE_VALIDATIONS,
        "status" => status.to_string(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        describe_metrics();
        record_request_failure("body");
        record_response(200, ResponseOutcome::Valid);
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(ResponseOutcome::Unchecked.as_str(), "unchecked");
        assert_eq!(ResponseOutcome::Exempt.as_str(), "exempt");
    }
}
