use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Wire body for the collector. Field order is part of the contract.
#[derive(Debug, Serialize)]
pub struct OccupancyReport<'a> {
    pub node_id: &'a str,
    pub free_seats: u8,
    pub total_seats: u8,
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("collector rejected report: HTTP {0}")]
    Status(u16),
}

/// Fire-and-forget occupancy uploads. One bounded-timeout POST per call;
/// the caller logs the outcome and moves on. No retry, no queueing.
pub struct OccupancyReporter {
    endpoint: String,
    node_id: String,
    timeout: Duration,
}

impl OccupancyReporter {
    pub fn new(endpoint: String, node_id: String, timeout: Duration) -> Self {
        Self {
            endpoint,
            node_id,
            timeout,
        }
    }

    /// POST the current counts; returns the HTTP status on success.
    pub fn post_occupancy(&self, free_seats: u8, total_seats: u8) -> Result<u16, UploadError> {
        let report = OccupancyReport {
            node_id: &self.node_id,
            free_seats,
            total_seats,
        };
        let response = ureq::post(&self.endpoint)
            .timeout(self.timeout)
            .set("Content-Type", "application/json")
            .send_json(&report)
            .map_err(|err| match err {
                ureq::Error::Status(code, _) => UploadError::Status(code),
                ureq::Error::Transport(transport) => {
                    UploadError::Transport(transport.to_string())
                }
            })?;
        Ok(response.status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_body_matches_the_wire_contract_exactly() {
        let report = OccupancyReport {
            node_id: "n1",
            free_seats: 3,
            total_seats: 4,
        };

        let body = serde_json::to_string(&report).expect("serialize report");

        assert_eq!(body, r#"{"node_id":"n1","free_seats":3,"total_seats":4}"#);
    }

    #[test]
    fn transport_failure_maps_to_upload_error() {
        // Reserved TEST-NET-1 address, nothing listens there.
        let reporter = OccupancyReporter::new(
            "http://192.0.2.1:9/api/occupancy".to_string(),
            "n1".to_string(),
            Duration::from_millis(200),
        );

        let err = reporter.post_occupancy(3, 4).unwrap_err();

        assert!(matches!(err, UploadError::Transport(_)));
    }
}
