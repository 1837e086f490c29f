use std::collections::BTreeMap;

use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::watch;

use crate::{
    gateway::resource::{Resource, SnapshotData, SnapshotPayload},
    observability::metrics,
    push::wire::UpdateEvent,
    store::{
        history::{HistoryBuffer, HistoryEntry},
        snapshot::{
            ActionStatus, AgencySnapshot, BackendHealth, LimbicSnapshot, SkillsSnapshot,
            TrustSnapshot,
        },
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ChannelState {
    pub fn name(&self) -> &'static str {
        match self {
            ChannelState::Disconnected => "disconnected",
            ChannelState::Connecting => "connecting",
            ChannelState::Connected => "connected",
        }
    }
}

/// The merged view model readers render from. Published wholesale through a
/// watch channel after every apply, so a reader can never observe a torn
/// write.
#[derive(Debug, Clone, PartialEq)]
pub struct MirrorState {
    pub channel: ChannelState,
    pub trust: TrustSnapshot,
    pub agency: AgencySnapshot,
    pub limbic: LimbicSnapshot,
    pub skills: SkillsSnapshot,
    pub health: BackendHealth,
    pub last_updated: BTreeMap<Resource, OffsetDateTime>,
    pub last_thought_at: Option<OffsetDateTime>,
    pub history: HistoryBuffer,
}

impl MirrorState {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            channel: ChannelState::Disconnected,
            trust: TrustSnapshot::default(),
            agency: AgencySnapshot::default(),
            limbic: LimbicSnapshot::default(),
            skills: SkillsSnapshot::default(),
            health: BackendHealth::default(),
            last_updated: BTreeMap::new(),
            last_thought_at: None,
            history: HistoryBuffer::new(history_capacity),
        }
    }

    pub fn last_updated(&self, resource: Resource) -> Option<OffsetDateTime> {
        self.last_updated.get(&resource).copied()
    }

    /// True once at least one resource snapshot has landed.
    pub fn is_populated(&self) -> bool {
        !self.last_updated.is_empty()
    }
}

/// The one message type both producers (push listener, poll loop) feed into
/// the consumer queue.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreWrite {
    Snapshot(SnapshotPayload),
    Event {
        event: UpdateEvent,
        received_at: OffsetDateTime,
    },
    Channel(ChannelState),
}

/// Single merge point for all writes. Writes are applied in arrival order;
/// last-writer-wins is decided by event recency, so an event or snapshot
/// older than what the resource already shows is a no-op. Re-applying the
/// same event leaves the snapshot unchanged beyond the first application.
pub struct ViewModelStore {
    state: MirrorState,
    publisher: watch::Sender<MirrorState>,
}

impl ViewModelStore {
    pub fn new(history_capacity: usize) -> Self {
        let state = MirrorState::new(history_capacity);
        let (publisher, _reader) = watch::channel(state.clone());
        Self { state, publisher }
    }

    pub fn subscribe(&self) -> watch::Receiver<MirrorState> {
        self.publisher.subscribe()
    }

    pub fn state(&self) -> MirrorState {
        self.state.clone()
    }

    pub fn apply(&mut self, write: StoreWrite) {
        match write {
            StoreWrite::Channel(next) => self.apply_channel(next),
            StoreWrite::Snapshot(payload) => self.apply_snapshot(payload),
            StoreWrite::Event { event, received_at } => self.apply_event(event, received_at),
        }
        self.publisher.send_replace(self.state.clone());
    }

    fn apply_channel(&mut self, next: ChannelState) {
        if self.state.channel == next {
            return;
        }
        tracing::info!(
            target: "store",
            from = self.state.channel.name(),
            to = next.name(),
            "push_channel_state_changed"
        );
        metrics::record_channel_state(next == ChannelState::Connected);
        self.state.channel = next;
    }

    fn apply_snapshot(&mut self, payload: SnapshotPayload) {
        let resource = payload.resource();
        if let Some(last) = self.state.last_updated(resource)
            && payload.observed_at < last
        {
            tracing::debug!(target: "store", resource = %resource, "stale_snapshot_skipped");
            metrics::record_write_ignored("stale_snapshot");
            return;
        }

        match payload.data {
            SnapshotData::Trust(trust) => self.state.trust = trust,
            SnapshotData::Agency(agency) => self.state.agency = agency,
            SnapshotData::Skills(skills) => self.state.skills = skills,
            SnapshotData::Limbic(limbic) => self.state.limbic = limbic,
            SnapshotData::Health(health) => self.state.health = health,
        }
        self.state.last_updated.insert(resource, payload.observed_at);
        metrics::record_snapshot_applied(resource, payload.observed_at);
    }

    fn apply_event(&mut self, event: UpdateEvent, received_at: OffsetDateTime) {
        let effective_at = event.occurred_at().unwrap_or(received_at);
        let tag = event.tag();

        let Some(resource) = event.resource() else {
            self.apply_thought(event, effective_at);
            return;
        };

        if let Some(last) = self.state.last_updated(resource)
            && effective_at < last
        {
            tracing::debug!(target: "store", tag, resource = %resource, "stale_event_skipped");
            metrics::record_write_ignored("stale_event");
            return;
        }

        let detail = self.merge_event(event);
        self.state.last_updated.insert(resource, effective_at);

        if let Some(detail) = detail {
            self.state.history.push(HistoryEntry {
                at: effective_at,
                kind: tag.to_string(),
                detail,
            });
            metrics::record_event_applied(tag);
        }
    }

    fn apply_thought(&mut self, event: UpdateEvent, effective_at: OffsetDateTime) {
        let UpdateEvent::ThoughtsLogUpdate { entry, .. } = event else {
            return;
        };
        // <= dedupes an at-least-once redelivery of the same entry.
        if let Some(last) = self.state.last_thought_at
            && effective_at <= last
        {
            metrics::record_write_ignored("duplicate_thought");
            return;
        }
        self.state.last_thought_at = Some(effective_at);
        self.state.history.push(HistoryEntry {
            at: effective_at,
            kind: "thoughts-log-update".to_string(),
            detail: entry,
        });
        metrics::record_event_applied("thoughts-log-update");
    }

    /// Field-merge one event into its snapshot. Returns a history detail when
    /// the merge changed anything, `None` for no-op re-deliveries.
    fn merge_event(&mut self, event: UpdateEvent) -> Option<String> {
        match event {
            UpdateEvent::LimbicUpdate { variables, mode, .. } => {
                let before = self.state.limbic.clone();
                let variable_count = variables.len();
                self.state.limbic.variables.extend(variables);
                if mode.is_some() {
                    self.state.limbic.mode = mode;
                }
                (self.state.limbic != before)
                    .then(|| format!("limbic variables updated ({variable_count})"))
            }
            UpdateEvent::AgencyUpdate { actions, .. } => {
                let before = self.state.agency.clone();
                if let Some(actions) = actions {
                    self.state.agency.actions = actions;
                }
                (self.state.agency != before).then(|| {
                    format!("agency actions updated ({})", self.state.agency.actions.len())
                })
            }
            UpdateEvent::TierChanged { tier, score, .. } => {
                let before = self.state.trust.clone();
                self.state.trust.tier = tier;
                if let Some(score) = score {
                    self.state.trust.score = score;
                }
                (self.state.trust != before)
                    .then(|| format!("trust tier changed to {}", self.state.trust.tier))
            }
            UpdateEvent::ActionCompleted { action_id, .. } => {
                self.set_action_status(&action_id, ActionStatus::Completed, None)
                    .then(|| format!("action {action_id} completed"))
            }
            UpdateEvent::ActionFailed { action_id, reason, .. } => self
                .set_action_status(&action_id, ActionStatus::Failed, reason)
                .then(|| format!("action {action_id} failed")),
            UpdateEvent::ThoughtsLogUpdate { .. } => None,
        }
    }

    fn set_action_status(
        &mut self,
        action_id: &str,
        status: ActionStatus,
        detail: Option<String>,
    ) -> bool {
        let Some(action) = self
            .state
            .agency
            .actions
            .iter_mut()
            .find(|action| action.id == action_id)
        else {
            tracing::debug!(target: "store", action_id, "action_outcome_for_unknown_action");
            return false;
        };

        if action.status == status && action.detail == detail {
            return false;
        }
        action.status = status;
        if detail.is_some() {
            action.detail = detail;
        }
        true
    }
}
