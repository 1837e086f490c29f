use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::store::snapshot::{
    AgencySnapshot, BackendHealth, LimbicSnapshot, SkillsSnapshot, TrustSnapshot,
};

/// One mirrored backend resource. Each maps to a GET endpoint returning a
/// JSON snapshot of that resource's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Trust,
    Agency,
    Skills,
    Limbic,
    Health,
}

impl Resource {
    pub const ALL: [Resource; 5] = [
        Resource::Trust,
        Resource::Agency,
        Resource::Skills,
        Resource::Limbic,
        Resource::Health,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Resource::Trust => "trust",
            Resource::Agency => "agency",
            Resource::Skills => "skills",
            Resource::Limbic => "limbic",
            Resource::Health => "health",
        }
    }

    pub fn default_path(&self) -> &'static str {
        match self {
            Resource::Trust => "/api/agency/trust",
            Resource::Agency => "/api/agency/status",
            Resource::Skills => "/api/learning/overview",
            Resource::Limbic => "/api/limbic/state",
            Resource::Health => "/health",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotData {
    Trust(TrustSnapshot),
    Agency(AgencySnapshot),
    Skills(SkillsSnapshot),
    Limbic(LimbicSnapshot),
    Health(BackendHealth),
}

impl SnapshotData {
    pub fn resource(&self) -> Resource {
        match self {
            SnapshotData::Trust(_) => Resource::Trust,
            SnapshotData::Agency(_) => Resource::Agency,
            SnapshotData::Skills(_) => Resource::Skills,
            SnapshotData::Limbic(_) => Resource::Limbic,
            SnapshotData::Health(_) => Resource::Health,
        }
    }
}

/// A decoded snapshot plus the instant it describes. `observed_at` is the
/// server's `last_updated` field when present, else the client receive time,
/// and drives the store's recency check.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotPayload {
    pub data: SnapshotData,
    pub observed_at: OffsetDateTime,
}

impl SnapshotPayload {
    pub fn decode(resource: Resource, body: &[u8]) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_slice(body)?;
        let observed_at = value
            .get("last_updated")
            .and_then(Value::as_str)
            .and_then(|raw| OffsetDateTime::parse(raw, &Rfc3339).ok())
            .unwrap_or_else(OffsetDateTime::now_utc);

        let data = match resource {
            Resource::Trust => SnapshotData::Trust(serde_json::from_value(value)?),
            Resource::Agency => SnapshotData::Agency(serde_json::from_value(value)?),
            Resource::Skills => SnapshotData::Skills(serde_json::from_value(value)?),
            Resource::Limbic => SnapshotData::Limbic(serde_json::from_value(value)?),
            Resource::Health => SnapshotData::Health(serde_json::from_value(value)?),
        };

        Ok(Self { data, observed_at })
    }

    pub fn resource(&self) -> Resource {
        self.data.resource()
    }
}
