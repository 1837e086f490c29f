use std::fmt;

use serde::{Deserialize, Serialize};

use crate::gateway::resource::Resource;

/// Every kind the fetch path can produce is a soft failure: callers keep the
/// last-known snapshot and wait for the next poll tick or push event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorKind {
    Network,
    Timeout,
    Status,
    Decode,
}

#[derive(Debug, Clone)]
pub struct GatewayError {
    pub kind: GatewayErrorKind,
    pub message: String,
    pub resource: Option<Resource>,
    pub http_status: Option<u16>,
}

impl GatewayError {
    pub fn new(kind: GatewayErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            resource: None,
            http_status: None,
        }
    }

    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resource = Some(resource);
        self
    }

    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.resource, &self.http_status) {
            (Some(resource), Some(status)) => {
                write!(f, "{} (resource={}, status={})", self.message, resource, status)
            }
            (Some(resource), None) => write!(f, "{} (resource={})", self.message, resource),
            (None, Some(status)) => write!(f, "{} (status={})", self.message, status),
            (None, None) => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for GatewayError {}

pub fn network_error(message: impl Into<String>) -> GatewayError {
    GatewayError::new(GatewayErrorKind::Network, message)
}

pub fn timeout_error(message: impl Into<String>) -> GatewayError {
    GatewayError::new(GatewayErrorKind::Timeout, message)
}

pub fn decode_error(message: impl Into<String>) -> GatewayError {
    GatewayError::new(GatewayErrorKind::Decode, message)
}
