//! Domain types for the scaler.
//!
//! The alert types mirror the Alertmanager webhook payload closely enough
//! to decode it; everything except the status and the `service`
//! annotation is carried through untouched.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Annotation key naming the service an alert refers to.
pub const SERVICE_ANNOTATION: &str = "service";

// ── Alerts ─────────────────────────────────────────────────────────

/// Status shared by every alert in one webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AlertStatus {
    Firing,
    Resolved,
    /// Anything else the sender put in `status`, kept verbatim.
    Unknown(String),
}

impl Default for AlertStatus {
    fn default() -> Self {
        AlertStatus::Unknown(String::new())
    }
}

impl From<String> for AlertStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "firing" => AlertStatus::Firing,
            "resolved" => AlertStatus::Resolved,
            _ => AlertStatus::Unknown(s),
        }
    }
}

impl From<AlertStatus> for String {
    fn from(status: AlertStatus) -> Self {
        match status {
            AlertStatus::Firing => "firing".to_string(),
            AlertStatus::Resolved => "resolved".to_string(),
            AlertStatus::Unknown(s) => s,
        }
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertStatus::Firing => f.write_str("firing"),
            AlertStatus::Resolved => f.write_str("resolved"),
            AlertStatus::Unknown(s) => f.write_str(s),
        }
    }
}

/// One webhook delivery.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertBatch {
    #[serde(default, alias = "Status")]
    pub status: AlertStatus,
    #[serde(default, alias = "Alerts")]
    pub alerts: Vec<Alert>,
}

/// A single alert inside a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(default, alias = "Labels")]
    pub labels: HashMap<String, String>,
    #[serde(default, alias = "Annotations")]
    pub annotations: HashMap<String, String>,
    #[serde(default, rename = "startsAt", skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<String>,
    #[serde(default, rename = "endsAt", skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<String>,
}

impl Alert {
    /// Alert carrying only a `service` annotation.
    pub fn for_service(name: &str) -> Self {
        let mut annotations = HashMap::new();
        annotations.insert(SERVICE_ANNOTATION.to_string(), name.to_string());
        Self {
            annotations,
            ..Self::default()
        }
    }

    /// The raw `service` annotation, or `""` when absent.
    pub fn service(&self) -> &str {
        self.annotations
            .get(SERVICE_ANNOTATION)
            .map(String::as_str)
            .unwrap_or("")
    }
}

// ── Services ───────────────────────────────────────────────────────

/// A validated orchestrator service name.
///
/// Names end up as process arguments to the orchestrator CLI, so only
/// ASCII alphanumerics, `_`, `-` and `.` are accepted, and a leading `-`
/// is refused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceName(String);

impl ServiceName {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let valid = !raw.is_empty()
            && !raw.starts_with('-')
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(ValidationError::InvalidServiceName(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ServiceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Point-in-time replica counts reported by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplicaState {
    /// Running replicas right now.
    pub current: u32,
    /// Desired replicas the orchestrator is converging to.
    pub target: u32,
}

impl ReplicaState {
    pub fn new(current: u32, target: u32) -> Self {
        Self { current, target }
    }
}

impl fmt::Display for ReplicaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.current, self.target)
    }
}

/// Inclusive replica range a decision must stay within.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleBounds {
    pub min: u32,
    pub max: u32,
}

impl ScaleBounds {
    pub const DEFAULT: ScaleBounds = ScaleBounds { min: 1, max: 50 };

    pub fn new(min: u32, max: u32) -> Result<Self, ValidationError> {
        if min >= 1 && min <= max {
            Ok(Self { min, max })
        } else {
            Err(ValidationError::InvalidBounds { min, max })
        }
    }
}

impl Default for ScaleBounds {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// What the executor is asked to do for one service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleCommand {
    /// New desired replica count.
    pub replicas: u32,
    /// Pull the service's image and force a rolling update after scaling.
    pub refresh_image: bool,
}

// ── Response ───────────────────────────────────────────────────────

/// Outcome for one alert in a batch. `scale` is 0 when nothing was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceResult {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Scale")]
    pub scale: u32,
    #[serde(rename = "Error", default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServiceResult {
    pub fn no_action(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scale: 0,
            error: None,
        }
    }

    pub fn scaled(name: impl Into<String>, scale: u32) -> Self {
        Self {
            name: name.into(),
            scale,
            error: None,
        }
    }

    pub fn failed(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scale: 0,
            error: Some(error.into()),
        }
    }

    /// The scale took effect but a follow-up step of the action failed.
    pub fn scaled_with_error(name: impl Into<String>, scale: u32, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scale,
            error: Some(error.into()),
        }
    }
}

/// Body returned to the webhook sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicesResponse {
    #[serde(rename = "Service")]
    pub service: Vec<ServiceResult>,
    #[serde(rename = "Status")]
    pub status: String,
}

impl ServicesResponse {
    pub fn ok(service: Vec<ServiceResult>) -> Self {
        Self {
            service,
            status: "OK".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_alertmanager_payload() {
        let body = r#"{"version": "4",
            "groupKey": "1",
            "status": "resolved",
            "receiver": "test",
            "groupLabels": "",
            "externalURL": "test",
            "alerts": [{
                "labels": {"summary": "test"},
                "annotations": {"service": "docker-tools_cadvisor", "summary": "test"},
                "startsAt": "2018-03-01T22:08:41+00:00"
            }]}"#;

        let batch: AlertBatch = serde_json::from_str(body).unwrap();
        assert_eq!(batch.status, AlertStatus::Resolved);
        assert_eq!(batch.alerts.len(), 1);
        assert_eq!(batch.alerts[0].service(), "docker-tools_cadvisor");
        assert_eq!(
            batch.alerts[0].starts_at.as_deref(),
            Some("2018-03-01T22:08:41+00:00")
        );
    }

    #[test]
    fn unknown_or_missing_status_is_not_an_error() {
        let batch: AlertBatch = serde_json::from_str(r#"{"status": "pending"}"#).unwrap();
        assert_eq!(batch.status, AlertStatus::Unknown("pending".to_string()));
        assert!(batch.alerts.is_empty());

        let batch: AlertBatch = serde_json::from_str("{}").unwrap();
        assert_eq!(batch.status, AlertStatus::default());
    }

    #[test]
    fn capitalized_annotations_key_is_accepted() {
        let alert: Alert =
            serde_json::from_str(r#"{"Annotations": {"service": "web"}}"#).unwrap();
        assert_eq!(alert.service(), "web");
    }

    #[test]
    fn capitalized_batch_keys_are_accepted() {
        let batch: AlertBatch = serde_json::from_str(
            r#"{"Status": "firing", "Alerts": [{"Annotations": {"service": "web"}}]}"#,
        )
        .unwrap();
        assert_eq!(batch.status, AlertStatus::Firing);
        assert_eq!(batch.alerts.len(), 1);
        assert_eq!(batch.alerts[0].service(), "web");
    }

    #[test]
    fn missing_service_annotation_is_empty() {
        assert_eq!(Alert::default().service(), "");
    }

    #[test]
    fn service_name_validation() {
        assert!(ServiceName::parse("stack_web-1.v2").is_ok());
        assert!(ServiceName::parse("").is_err());
        assert!(ServiceName::parse("-rm").is_err());
        assert!(ServiceName::parse("web; rm -rf /").is_err());
        assert!(ServiceName::parse("web=3").is_err());
    }

    #[test]
    fn bounds_validation() {
        assert_eq!(ScaleBounds::default(), ScaleBounds { min: 1, max: 50 });
        assert!(ScaleBounds::new(1, 1).is_ok());
        assert_eq!(
            ScaleBounds::new(0, 5),
            Err(ValidationError::InvalidBounds { min: 0, max: 5 })
        );
        assert!(ScaleBounds::new(6, 5).is_err());
    }

    #[test]
    fn response_wire_format() {
        let resp = ServicesResponse::ok(vec![ServiceResult::scaled("svc-a", 2)]);
        assert_eq!(
            serde_json::to_string(&resp).unwrap(),
            r#"{"Service":[{"Name":"svc-a","Scale":2}],"Status":"OK"}"#
        );

        let resp = ServicesResponse::ok(vec![ServiceResult::failed("svc-b", "boom")]);
        assert_eq!(
            serde_json::to_string(&resp).unwrap(),
            r#"{"Service":[{"Name":"svc-b","Scale":0,"Error":"boom"}],"Status":"OK"}"#
        );

        let resp = ServicesResponse::ok(vec![ServiceResult::scaled_with_error("svc-c", 4, "pull failed")]);
        assert_eq!(
            serde_json::to_string(&resp).unwrap(),
            r#"{"Service":[{"Name":"svc-c","Scale":4,"Error":"pull failed"}],"Status":"OK"}"#
        );
    }
}
