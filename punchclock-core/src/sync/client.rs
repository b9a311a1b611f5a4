//! HTTP sync client for communicating with the attendance backend.

use crate::sync::models::{
    AttendanceRecord, AttendanceSyncRequest, AttendanceSyncResponse, AttendanceUpdatesResponse,
    AuditRecord, AuditSyncRequest, AuditSyncResponse, DeviceStatusResponse, RefreshTokenRequest,
    RefreshTokenResponse, RegisterDeviceRequest, RegisterDeviceResponse,
};
use crate::{AttendanceError, Result};
use uuid::Uuid;

/// Tenant isolation header required by the multi-tenant backend.
pub const TENANT_HEADER: &str = "X-Tenant-Code";

/// HTTP client for the attendance backend.
pub struct SyncClient {
    client: reqwest::Client,
    server_url: String,
    tenant_code: String,
    device_token: Option<String>,
}

impl SyncClient {
    /// Create a new sync client.
    pub fn new(server_url: &str, tenant_code: &str, device_token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| AttendanceError::Network(e.to_string()))?;

        Ok(Self {
            client,
            server_url: server_url.trim_end_matches('/').to_string(),
            tenant_code: tenant_code.to_string(),
            device_token,
        })
    }

    /// Replace the bearer token after a refresh.
    pub fn set_device_token(&mut self, token: String) {
        self.device_token = Some(token);
    }

    /// Register this terminal with the backend.
    pub async fn register_device(
        &self,
        request: &RegisterDeviceRequest,
    ) -> Result<RegisterDeviceResponse> {
        let response = self.post("/api/v1/devices/register", request).await?;
        Self::parse(response, "register response")
    }

    /// Exchange the current device token for a fresh one.
    pub async fn refresh_token(
        &self,
        request: &RefreshTokenRequest,
    ) -> Result<RefreshTokenResponse> {
        let response = self.post("/api/v1/devices/token/refresh", request).await?;
        Self::parse(response, "token refresh response")
    }

    /// Fetch the backend's view of this device.
    pub async fn get_device_status(&self, device_id: &Uuid) -> Result<DeviceStatusResponse> {
        let path = format!("/api/v1/devices/{}/status", device_id);
        let response = self.get(&path).await?;
        Self::parse(response, "device status response")
    }

    /// Upload attendance deltas recorded on this terminal.
    pub async fn sync_attendance(
        &self,
        device_id: Uuid,
        records: Vec<AttendanceRecord>,
    ) -> Result<AttendanceSyncResponse> {
        let request = AttendanceSyncRequest { device_id, records };
        let response = self.post("/api/v1/attendance/sync", &request).await?;
        Self::parse(response, "attendance sync response")
    }

    /// Poll for attendance updates newer than the given server timestamp.
    pub async fn get_updates_since(&self, since: i64) -> Result<AttendanceUpdatesResponse> {
        let path = format!("/api/v1/attendance/updates?since={}", since);
        let response = self.get(&path).await?;
        Self::parse(response, "attendance updates response")
    }

    /// Upload audit trail entries.
    pub async fn sync_audit(
        &self,
        device_id: Uuid,
        entries: Vec<AuditRecord>,
    ) -> Result<AuditSyncResponse> {
        let request = AuditSyncRequest { device_id, entries };
        let response = self.post("/api/v1/audit/sync", &request).await?;
        Self::parse(response, "audit sync response")
    }

    // --- Internal helpers ---

    fn parse<T: serde::de::DeserializeOwned>(body: Vec<u8>, what: &str) -> Result<T> {
        serde_json::from_slice(&body)
            .map_err(|e| AttendanceError::InvalidInput(format!("Invalid {}: {}", what, e)))
    }

    async fn post<B: serde::Serialize>(&self, path: &str, body: &B) -> Result<Vec<u8>> {
        let url = format!("{}{}", self.server_url, path);
        let mut request = self
            .client
            .post(&url)
            .header(TENANT_HEADER, &self.tenant_code)
            .json(body);

        if let Some(ref token) = self.device_token {
            request = request.bearer_auth(token);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| AttendanceError::Network(e.to_string()))?;

        Self::read_body(resp).await
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        let url = format!("{}{}", self.server_url, path);
        let mut request = self.client.get(&url).header(TENANT_HEADER, &self.tenant_code);

        if let Some(ref token) = self.device_token {
            request = request.bearer_auth(token);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| AttendanceError::Network(e.to_string()))?;

        Self::read_body(resp).await
    }

    async fn read_body(resp: reqwest::Response) -> Result<Vec<u8>> {
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_else(|_| "unknown".to_string());
            return Err(AttendanceError::Backend { status, body });
        }

        resp.bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| AttendanceError::Network(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_stripped() {
        let client = SyncClient::new("https://api.example.com/", "acme", None).unwrap();
        assert_eq!(client.server_url, "https://api.example.com");
    }

    #[test]
    fn token_can_be_replaced() {
        let mut client = SyncClient::new("https://api.example.com", "acme", None).unwrap();
        assert!(client.device_token.is_none());
        client.set_device_token("tok".to_string());
        assert_eq!(client.device_token.as_deref(), Some("tok"));
    }
}
