//! Sync data models: the wire format exchanged with the attendance
//! backend. Flat records, snake_case field names, no validation or
//! transformation beyond field presence.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direction of a punch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PunchType {
    In,
    Out,
}

impl PunchType {
    /// Convert a punch type to its string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }

    /// Parse a punch type from its string representation.
    pub fn parse(s: &str) -> Self {
        match s {
            "out" => Self::Out,
            _ => Self::In,
        }
    }
}

/// Request body for registering this terminal with the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterDeviceRequest {
    pub device_id: Uuid,
    pub device_name: String,
    pub device_model: String,
    pub app_version: String,
}

/// Backend response after device registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterDeviceResponse {
    pub device_token: String,
    pub token_expires_at: i64,
    pub approved: bool,
}

/// Request body for refreshing the device token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenRequest {
    pub device_id: Uuid,
    pub device_token: String,
}

/// Backend response carrying a fresh device token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenResponse {
    pub device_token: String,
    pub token_expires_at: i64,
}

/// Backend view of this device's registration state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceStatusResponse {
    pub device_id: Uuid,
    pub approved: bool,
    pub active: bool,
    pub last_seen_at: Option<i64>,
}

/// A single attendance punch for sync transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecord {
    /// Stable identifier across devices (not the local row id).
    pub record_id: Uuid,
    pub employee_id: i64,
    /// Unix timestamp of the punch.
    pub punch_time: i64,
    pub punch_type: PunchType,
    /// How the employee was verified (e.g. "face").
    pub verify_method: String,
    /// Device that recorded this punch.
    pub origin_device_id: Uuid,
}

/// Request body for uploading attendance deltas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceSyncRequest {
    pub device_id: Uuid,
    pub records: Vec<AttendanceRecord>,
}

/// Backend response after an attendance upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceSyncResponse {
    pub accepted: u64,
    pub rejected: u64,
    pub server_timestamp: i64,
}

/// Backend response for update polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceUpdatesResponse {
    pub records: Vec<AttendanceRecord>,
    pub server_timestamp: i64,
    pub has_more: bool,
}

/// A single audit trail entry for sync transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub event: String,
    pub severity: u8,
    pub context: String,
    /// Unix timestamp of the event.
    pub occurred_at: i64,
}

/// Request body for uploading audit trail entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSyncRequest {
    pub device_id: Uuid,
    pub entries: Vec<AuditRecord>,
}

/// Backend response after an audit upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSyncResponse {
    pub accepted: u64,
    pub server_timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn punch_type_roundtrip() {
        for punch in [PunchType::In, PunchType::Out] {
            assert_eq!(PunchType::parse(punch.as_str()), punch);
        }
    }

    #[test]
    fn attendance_record_uses_snake_case_wire_names() {
        let record = AttendanceRecord {
            record_id: Uuid::new_v4(),
            employee_id: 17,
            punch_time: 1700000000,
            punch_type: PunchType::In,
            verify_method: "face".to_string(),
            origin_device_id: Uuid::new_v4(),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("record_id").is_some());
        assert!(json.get("employee_id").is_some());
        assert!(json.get("punch_time").is_some());
        assert_eq!(json["punch_type"], "in");
        assert_eq!(json["verify_method"], "face");
    }

    #[test]
    fn attendance_record_serialization_roundtrip() {
        let record = AttendanceRecord {
            record_id: Uuid::new_v4(),
            employee_id: 5,
            punch_time: 1700000001,
            punch_type: PunchType::Out,
            verify_method: "face".to_string(),
            origin_device_id: Uuid::new_v4(),
        };

        let json = serde_json::to_string(&record).unwrap();
        let deserialized: AttendanceRecord = serde_json::from_str(&json).unwrap();

        assert_eq!(record.record_id, deserialized.record_id);
        assert_eq!(record.punch_type, deserialized.punch_type);
        assert_eq!(record.punch_time, deserialized.punch_time);
    }

    #[test]
    fn register_response_parses_from_backend_json() {
        let body = r#"{"device_token":"tok-1","token_expires_at":1700003600,"approved":true}"#;
        let response: RegisterDeviceResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.device_token, "tok-1");
        assert!(response.approved);
    }

    #[test]
    fn device_status_absent_last_seen() {
        let body = format!(
            r#"{{"device_id":"{}","approved":false,"active":false,"last_seen_at":null}}"#,
            Uuid::new_v4()
        );
        let status: DeviceStatusResponse = serde_json::from_str(&body).unwrap();
        assert!(!status.approved);
        assert!(status.last_seen_at.is_none());
    }
}
