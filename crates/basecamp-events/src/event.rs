//! The event record type published on the orchestrator's event bus.
//!
//! Unlike a free-form event enum, [`EventRecord`] is the single concrete
//! struct every event is published through: a closed [`EventKind`], a
//! [`SubjectType`] plus subject id, a timestamp, an opaque JSON payload,
//! and the component that produced it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The kind of thing that happened. A closed set — new event kinds are
/// added here, never represented as free-form strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A workspace launch was accepted and persisted.
    WorkspaceRequested,
    /// A workspace began provisioning.
    WorkspaceProvisioning,
    /// A workspace reached the running state.
    WorkspaceRunning,
    /// A workspace is running but degraded (e.g. a volume attach failed).
    WorkspaceDegraded,
    /// A workspace was stopped.
    WorkspaceStopped,
    /// A workspace was hibernated.
    WorkspaceHibernated,
    /// A workspace began terminating.
    WorkspaceTerminating,
    /// A workspace reached the terminated state.
    WorkspaceTerminated,
    /// Provisioning failed and the workspace is terminal.
    WorkspaceProvisioningFailed,
    /// A workspace command exceeded its deadline without reaching a
    /// recognized terminal or stable state.
    WorkspaceStuck,
    /// The provider reports the workspace terminated outside the
    /// orchestrator's control.
    WorkspaceTerminatedUnexpectedly,
    /// A template layer was applied to a running workspace.
    TemplateApplied,
    /// A workspace was rolled back to an earlier applied-layer checkpoint.
    TemplateRolledBack,
    /// A storage volume was created.
    VolumeCreated,
    /// A storage volume was deleted.
    VolumeDeleted,
    /// A workspace volume was attached to a workspace.
    VolumeAttached,
    /// A workspace volume was detached from a workspace.
    VolumeDetached,
    /// A shared volume was mounted onto a workspace.
    VolumeMounted,
    /// A shared volume was unmounted from a workspace.
    VolumeUnmounted,
    /// An idle-policy scan completed.
    IdleScanCompleted,
    /// A budget alert or auto-action threshold was crossed upward.
    BudgetThresholdCrossed,
    /// A budget alert fired.
    BudgetAlertFired,
    /// A budget auto-action was triggered.
    BudgetAutoActionTriggered,
    /// A member was added to a project.
    ProjectMemberAdded,
    /// A member was removed from a project.
    ProjectMemberRemoved,
    /// Accumulated cost was reconciled against the provider's cost API.
    CostReconciled,
    /// The daemon is starting up.
    DaemonStarting,
    /// The daemon is shutting down gracefully.
    DaemonShuttingDown,
}

impl EventKind {
    /// The wire/log string for this kind, e.g. `"workspace_running"`.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WorkspaceRequested => "workspace_requested",
            Self::WorkspaceProvisioning => "workspace_provisioning",
            Self::WorkspaceRunning => "workspace_running",
            Self::WorkspaceDegraded => "workspace_degraded",
            Self::WorkspaceStopped => "workspace_stopped",
            Self::WorkspaceHibernated => "workspace_hibernated",
            Self::WorkspaceTerminating => "workspace_terminating",
            Self::WorkspaceTerminated => "workspace_terminated",
            Self::WorkspaceProvisioningFailed => "workspace_provisioning_failed",
            Self::WorkspaceStuck => "workspace_stuck",
            Self::WorkspaceTerminatedUnexpectedly => "workspace_terminated_unexpectedly",
            Self::TemplateApplied => "template_applied",
            Self::TemplateRolledBack => "template_rolled_back",
            Self::VolumeCreated => "volume_created",
            Self::VolumeDeleted => "volume_deleted",
            Self::VolumeAttached => "volume_attached",
            Self::VolumeDetached => "volume_detached",
            Self::VolumeMounted => "volume_mounted",
            Self::VolumeUnmounted => "volume_unmounted",
            Self::IdleScanCompleted => "idle_scan_completed",
            Self::BudgetThresholdCrossed => "budget_threshold_crossed",
            Self::BudgetAlertFired => "budget_alert_fired",
            Self::BudgetAutoActionTriggered => "budget_auto_action_triggered",
            Self::ProjectMemberAdded => "project_member_added",
            Self::ProjectMemberRemoved => "project_member_removed",
            Self::CostReconciled => "cost_reconciled",
            Self::DaemonStarting => "daemon_starting",
            Self::DaemonShuttingDown => "daemon_shutting_down",
        }
    }

    /// True for events that indicate a budget- or hibernation-sensitive
    /// security-relevant transition (used to filter audit-adjacent
    /// subscribers without hardcoding a string list at every call site).
    #[must_use]
    pub fn is_budget_event(&self) -> bool {
        matches!(
            self,
            Self::BudgetThresholdCrossed | Self::BudgetAlertFired | Self::BudgetAutoActionTriggered
        )
    }
}

/// What kind of entity an [`EventRecord`] is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectType {
    /// A [`Workspace`].
    Workspace,
    /// A [`Project`].
    Project,
    /// A shared or workspace storage volume.
    Volume,
    /// A [`Template`].
    Template,
    /// An [`IdlePolicy`].
    IdlePolicy,
    /// A [`Budget`].
    Budget,
    /// The daemon process itself.
    Daemon,
}

/// An append-only pub/sub envelope describing something that happened.
///
/// Fields kept intentionally flat for stable JSON serialization: `kind`,
/// `subject_type`, `subject_id`, `at`, `payload`, `producer`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// A surrogate id for this event, distinct from the subject's id.
    pub event_id: Uuid,
    /// What happened.
    pub kind: EventKind,
    /// What kind of entity this event is about.
    pub subject_type: SubjectType,
    /// The subject's surrogate id, as a string (entity-kind-specific
    /// newtypes all `Display` to their UUID).
    pub subject_id: String,
    /// When this event was produced.
    pub at: DateTime<Utc>,
    /// Opaque, kind-specific event payload.
    pub payload: serde_json::Value,
    /// The component that produced this event, e.g. `"lifecycle"`,
    /// `"idle"`, `"budget"`.
    pub producer: &'static str,
}

impl EventRecord {
    /// Construct a new event record stamped with the current time.
    #[must_use]
    pub fn new(
        kind: EventKind,
        subject_type: SubjectType,
        subject_id: impl Into<String>,
        producer: &'static str,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            kind,
            subject_type,
            subject_id: subject_id.into(),
            at: Utc::now(),
            payload,
            producer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_as_str_is_snake_case() {
        assert_eq!(EventKind::WorkspaceRunning.as_str(), "workspace_running");
        assert_eq!(
            EventKind::BudgetAutoActionTriggered.as_str(),
            "budget_auto_action_triggered"
        );
    }

    #[test]
    fn budget_event_classification() {
        assert!(EventKind::BudgetAlertFired.is_budget_event());
        assert!(!EventKind::WorkspaceRunning.is_budget_event());
    }

    #[test]
    fn serde_roundtrip() {
        let record = EventRecord::new(
            EventKind::WorkspaceRunning,
            SubjectType::Workspace,
            "w-1",
            "lifecycle",
            serde_json::json!({"region": "us-east-1"}),
        );
        let json = serde_json::to_string(&record).unwrap();
        let back: EventRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind, EventKind::WorkspaceRunning);
        assert_eq!(back.subject_id, "w-1");
    }
}
