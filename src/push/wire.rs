//! Push channel wire format.
//!
//! The backend emits ad hoc tagged JSON frames with no schema or versioning.
//! The tags are preserved byte-exact (including the mixed snake/kebab casing
//! the backend actually sends) and payloads are validated into typed structs
//! here, at the boundary. Unknown tags must stay ignorable so the backend can
//! grow new tags without breaking mirrors in the field.

use std::collections::BTreeMap;

use serde::Deserialize;
use time::OffsetDateTime;

use crate::{gateway::resource::Resource, store::snapshot::AgencyAction};

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateEvent {
    LimbicUpdate {
        variables: BTreeMap<String, f64>,
        mode: Option<String>,
        occurred_at: Option<OffsetDateTime>,
    },
    AgencyUpdate {
        actions: Option<Vec<AgencyAction>>,
        occurred_at: Option<OffsetDateTime>,
    },
    TierChanged {
        tier: String,
        score: Option<f64>,
        occurred_at: Option<OffsetDateTime>,
    },
    ActionCompleted {
        action_id: String,
        occurred_at: Option<OffsetDateTime>,
    },
    ActionFailed {
        action_id: String,
        reason: Option<String>,
        occurred_at: Option<OffsetDateTime>,
    },
    ThoughtsLogUpdate {
        entry: String,
        occurred_at: Option<OffsetDateTime>,
    },
}

impl UpdateEvent {
    /// Wire tag, as sent by the backend.
    pub fn tag(&self) -> &'static str {
        match self {
            UpdateEvent::LimbicUpdate { .. } => "limbic_update",
            UpdateEvent::AgencyUpdate { .. } => "agency_update",
            UpdateEvent::TierChanged { .. } => "tier-changed",
            UpdateEvent::ActionCompleted { .. } => "action-completed",
            UpdateEvent::ActionFailed { .. } => "action-failed",
            UpdateEvent::ThoughtsLogUpdate { .. } => "thoughts-log-update",
        }
    }

    /// The snapshot this event mutates. Thoughts-log entries only feed the
    /// history buffer.
    pub fn resource(&self) -> Option<Resource> {
        match self {
            UpdateEvent::LimbicUpdate { .. } => Some(Resource::Limbic),
            UpdateEvent::AgencyUpdate { .. }
            | UpdateEvent::ActionCompleted { .. }
            | UpdateEvent::ActionFailed { .. } => Some(Resource::Agency),
            UpdateEvent::TierChanged { .. } => Some(Resource::Trust),
            UpdateEvent::ThoughtsLogUpdate { .. } => None,
        }
    }

    pub fn occurred_at(&self) -> Option<OffsetDateTime> {
        match self {
            UpdateEvent::LimbicUpdate { occurred_at, .. }
            | UpdateEvent::AgencyUpdate { occurred_at, .. }
            | UpdateEvent::TierChanged { occurred_at, .. }
            | UpdateEvent::ActionCompleted { occurred_at, .. }
            | UpdateEvent::ActionFailed { occurred_at, .. }
            | UpdateEvent::ThoughtsLogUpdate { occurred_at, .. } => *occurred_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecodeOutcome {
    Event(UpdateEvent),
    UnknownTag(String),
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    tag: String,
}

#[derive(Debug, Deserialize)]
struct LimbicUpdatePayload {
    #[serde(default)]
    variables: BTreeMap<String, f64>,
    #[serde(default)]
    mode: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    occurred_at: Option<OffsetDateTime>,
}

#[derive(Debug, Deserialize)]
struct AgencyUpdatePayload {
    #[serde(default)]
    actions: Option<Vec<AgencyAction>>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    occurred_at: Option<OffsetDateTime>,
}

#[derive(Debug, Deserialize)]
struct TierChangedPayload {
    tier: String,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    occurred_at: Option<OffsetDateTime>,
}

#[derive(Debug, Deserialize)]
struct ActionOutcomePayload {
    action_id: String,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    occurred_at: Option<OffsetDateTime>,
}

#[derive(Debug, Deserialize)]
struct ThoughtsLogPayload {
    entry: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    occurred_at: Option<OffsetDateTime>,
}

/// Decode one text frame. `Err` means the frame is malformed (bad JSON or a
/// known tag with an invalid payload); the listener logs and drops it.
pub fn decode_frame(text: &str) -> Result<DecodeOutcome, serde_json::Error> {
    let envelope: Envelope = serde_json::from_str(text)?;

    let event = match envelope.tag.as_str() {
        "limbic_update" => {
            let payload: LimbicUpdatePayload = serde_json::from_str(text)?;
            UpdateEvent::LimbicUpdate {
                variables: payload.variables,
                mode: payload.mode,
                occurred_at: payload.occurred_at,
            }
        }
        "agency_update" => {
            let payload: AgencyUpdatePayload = serde_json::from_str(text)?;
            UpdateEvent::AgencyUpdate {
                actions: payload.actions,
                occurred_at: payload.occurred_at,
            }
        }
        "tier-changed" => {
            let payload: TierChangedPayload = serde_json::from_str(text)?;
            UpdateEvent::TierChanged {
                tier: payload.tier,
                score: payload.score,
                occurred_at: payload.occurred_at,
            }
        }
        "action-completed" => {
            let payload: ActionOutcomePayload = serde_json::from_str(text)?;
            UpdateEvent::ActionCompleted {
                action_id: payload.action_id,
                occurred_at: payload.occurred_at,
            }
        }
        "action-failed" => {
            let payload: ActionOutcomePayload = serde_json::from_str(text)?;
            UpdateEvent::ActionFailed {
                action_id: payload.action_id,
                reason: payload.reason,
                occurred_at: payload.occurred_at,
            }
        }
        "thoughts-log-update" => {
            let payload: ThoughtsLogPayload = serde_json::from_str(text)?;
            UpdateEvent::ThoughtsLogUpdate {
                entry: payload.entry,
                occurred_at: payload.occurred_at,
            }
        }
        other => return Ok(DecodeOutcome::UnknownTag(other.to_string())),
    };

    Ok(DecodeOutcome::Event(event))
}
