use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct OccupancySuccessResponse {
    pub node_id: String,
    pub free_seats: u8,
    pub total_seats: u8,
    pub seats: Vec<SeatStatusResponse>,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SeatStatusResponse {
    pub seat: usize,
    pub occupied: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct OccupancyErrorResponse {
    pub error_code: OccupancyErrorCode,
    pub error_message: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OccupancyErrorCode {
    NoData,
    InternalError,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum NodeHealth {
    Ok,
    Starting,
    Error,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct HealthResponseBody {
    pub status: NodeHealth,
    pub state: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct CalibrateAcceptedResponse {
    pub requested: bool,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn occupancy_success_response_serializes_seats_in_order() {
        let response = OccupancySuccessResponse {
            node_id: "node-1".to_string(),
            free_seats: 3,
            total_seats: 4,
            seats: vec![
                SeatStatusResponse {
                    seat: 0,
                    occupied: true,
                },
                SeatStatusResponse {
                    seat: 1,
                    occupied: false,
                },
            ],
            timestamp: "2026-01-11T12:30:00Z".to_string(),
        };

        let value = serde_json::to_value(response).expect("serialize occupancy response");
        assert_eq!(
            value,
            json!({
                "node_id": "node-1",
                "free_seats": 3,
                "total_seats": 4,
                "seats": [
                    {"seat": 0, "occupied": true},
                    {"seat": 1, "occupied": false}
                ],
                "timestamp": "2026-01-11T12:30:00Z"
            })
        );
    }

    #[test]
    fn occupancy_error_uses_screaming_snake_case_code() {
        let response = OccupancyErrorResponse {
            error_code: OccupancyErrorCode::NoData,
            error_message: "no completed scan yet".to_string(),
            timestamp: "2026-01-11T12:31:00Z".to_string(),
        };

        let value = serde_json::to_value(response).expect("serialize error response");
        assert_eq!(
            value,
            json!({
                "error_code": "NO_DATA",
                "error_message": "no completed scan yet",
                "timestamp": "2026-01-11T12:31:00Z"
            })
        );
    }

    #[test]
    fn health_response_serializes_status_lowercase() {
        let response = HealthResponseBody {
            status: NodeHealth::Starting,
            state: "init".to_string(),
            timestamp: "2026-01-11T12:32:00Z".to_string(),
        };

        let value = serde_json::to_value(response).expect("serialize health response");
        assert_eq!(
            value,
            json!({
                "status": "starting",
                "state": "init",
                "timestamp": "2026-01-11T12:32:00Z"
            })
        );
    }

    #[test]
    fn calibrate_response_reports_the_request() {
        let response = CalibrateAcceptedResponse {
            requested: true,
            timestamp: "2026-01-11T12:33:00Z".to_string(),
        };

        let value = serde_json::to_value(response).expect("serialize calibrate response");
        assert_eq!(
            value,
            json!({
                "requested": true,
                "timestamp": "2026-01-11T12:33:00Z"
            })
        );
    }
}
