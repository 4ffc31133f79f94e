//! Handlers for every [`crate::types::LifecycleCommand`] other than
//! `Launch`, which [`crate::launch`] owns end to end since it has no
//! existing workspace record to load first.
//!
//! `Stop`/`Start`/`Hibernate`/`Resume` call a provider operation that
//! resolves synchronously, so each
//! handler here persists the transient state, makes the call, and either
//! settles into the resting state or reverts — there is no durable
//! "stuck mid-stop" state to recover on restart. `Terminate` is the one
//! exception: its state persists as `terminating` even on a provider
//! failure, since termination is expected to be retried rather than
//! rolled back.

use basecamp_core::ids::{CheckpointId, TemplateId, WorkspaceId};
use basecamp_events::{EventBus, EventKind, EventRecord, SubjectType};
use basecamp_provider::CloudProvider;
use basecamp_storage::{StateStore, Workspace, WorkspaceState};
use basecamp_template::TemplateResolver;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{LifecycleError, LifecycleResult};
use crate::transitions::{self, LifecycleEvent};
use crate::types::{ApplyRequest, LifecycleOutcome};

fn require_transition(
    workspace: &Workspace,
    event: LifecycleEvent,
) -> LifecycleResult<WorkspaceState> {
    transitions::next_state(workspace.state, event).ok_or(LifecycleError::IllegalTransition {
        workspace: workspace.id,
        from: workspace.state,
        command: event.label(),
    })
}

/// Stop a running workspace. Billing stops accruing once `stopped` is
/// persisted (`WorkspaceState::is_billable_idle`). Idempotent: a workspace
/// already `stopped` is a no-op success rather than an illegal
/// transition, mirroring the provider's own idempotent `StopVM`.
pub async fn stop(
    store: &dyn StateStore,
    provider: &dyn CloudProvider,
    events: &EventBus,
    workspace_id: WorkspaceId,
) -> LifecycleResult<LifecycleOutcome> {
    let mut workspace = store.get_workspace(workspace_id).await?;
    if workspace.state == WorkspaceState::Stopped {
        return Ok(LifecycleOutcome::Stopped);
    }
    require_transition(&workspace, LifecycleEvent::Stop)?;
    let original_state = workspace.state;

    workspace.state = WorkspaceState::Stopping;
    store.put_workspace(&workspace).await?;

    let instance_id = workspace.provider_instance_id.clone().unwrap_or_default();
    let cancel = CancellationToken::new();
    match provider.stop_vm(&instance_id, &cancel).await {
        Ok(()) => {
            workspace.state = WorkspaceState::Stopped;
            workspace.hourly_rate = 0.0;
            store.put_workspace(&workspace).await?;
            events.publish(EventRecord::new(
                EventKind::WorkspaceStopped,
                SubjectType::Workspace,
                workspace_id.to_string(),
                "lifecycle",
                serde_json::json!({}),
            ));
            Ok(LifecycleOutcome::Stopped)
        },
        Err(err) => {
            workspace.state = original_state;
            store.put_workspace(&workspace).await?;
            Err(LifecycleError::Provider(err))
        },
    }
}

/// Start a stopped workspace.
pub async fn start(
    store: &dyn StateStore,
    provider: &dyn CloudProvider,
    events: &EventBus,
    workspace_id: WorkspaceId,
) -> LifecycleResult<LifecycleOutcome> {
    let mut workspace = store.get_workspace(workspace_id).await?;
    require_transition(&workspace, LifecycleEvent::Start)?;

    let instance_id = workspace.provider_instance_id.clone().unwrap_or_default();
    let cancel = CancellationToken::new();
    provider.start_vm(&instance_id, &cancel).await.map_err(LifecycleError::Provider)?;

    workspace.state = WorkspaceState::Running;
    store.put_workspace(&workspace).await?;
    events.publish(EventRecord::new(
        EventKind::WorkspaceRunning,
        SubjectType::Workspace,
        workspace_id.to_string(),
        "lifecycle",
        serde_json::json!({ "resumed_from": "stopped" }),
    ));
    Ok(LifecycleOutcome::Started)
}

/// Hibernate a running workspace. Falls back to `Stop` when the provider
/// rejects the hibernate request outright (`ProviderError::InvalidRequest`,
/// e.g. an instance type with no RAM-to-disk hibernation support), rather
/// than failing the command.
pub async fn hibernate(
    store: &dyn StateStore,
    provider: &dyn CloudProvider,
    events: &EventBus,
    workspace_id: WorkspaceId,
) -> LifecycleResult<LifecycleOutcome> {
    let mut workspace = store.get_workspace(workspace_id).await?;
    require_transition(&workspace, LifecycleEvent::Hibernate)?;
    let original_state = workspace.state;

    workspace.state = WorkspaceState::Hibernating;
    store.put_workspace(&workspace).await?;

    let instance_id = workspace.provider_instance_id.clone().unwrap_or_default();
    let cancel = CancellationToken::new();
    match provider.hibernate_vm(&instance_id, &cancel).await {
        Ok(()) => {
            workspace.state = WorkspaceState::Hibernated;
            workspace.hourly_rate = 0.0;
            store.put_workspace(&workspace).await?;
            events.publish(EventRecord::new(
                EventKind::WorkspaceHibernated,
                SubjectType::Workspace,
                workspace_id.to_string(),
                "lifecycle",
                serde_json::json!({ "fallback_to_stop": false }),
            ));
            Ok(LifecycleOutcome::Hibernated { fallback_to_stop: false })
        },
        Err(basecamp_provider::ProviderError::InvalidRequest(reason)) => {
            warn!(%workspace_id, %reason, "provider rejected hibernation, falling back to stop");
            match provider.stop_vm(&instance_id, &cancel).await {
                Ok(()) => {
                    workspace.state = WorkspaceState::Stopped;
                    workspace.hourly_rate = 0.0;
                    workspace.hibernation_fallback = true;
                    store.put_workspace(&workspace).await?;
                    events.publish(EventRecord::new(
                        EventKind::WorkspaceStopped,
                        SubjectType::Workspace,
                        workspace_id.to_string(),
                        "lifecycle",
                        serde_json::json!({ "fallback_to_stop": true }),
                    ));
                    Ok(LifecycleOutcome::Hibernated { fallback_to_stop: true })
                },
                Err(err) => {
                    workspace.state = original_state;
                    store.put_workspace(&workspace).await?;
                    Err(LifecycleError::Provider(err))
                },
            }
        },
        Err(err) => {
            workspace.state = original_state;
            store.put_workspace(&workspace).await?;
            Err(LifecycleError::Provider(err))
        },
    }
}

/// Resume a hibernated workspace.
pub async fn resume(
    store: &dyn StateStore,
    provider: &dyn CloudProvider,
    events: &EventBus,
    workspace_id: WorkspaceId,
) -> LifecycleResult<LifecycleOutcome> {
    let mut workspace = store.get_workspace(workspace_id).await?;
    require_transition(&workspace, LifecycleEvent::Resume)?;

    let instance_id = workspace.provider_instance_id.clone().unwrap_or_default();
    let cancel = CancellationToken::new();
    provider.resume_vm(&instance_id, &cancel).await.map_err(LifecycleError::Provider)?;

    workspace.state = WorkspaceState::Running;
    store.put_workspace(&workspace).await?;
    events.publish(EventRecord::new(
        EventKind::WorkspaceRunning,
        SubjectType::Workspace,
        workspace_id.to_string(),
        "lifecycle",
        serde_json::json!({ "resumed_from": "hibernated" }),
    ));
    Ok(LifecycleOutcome::Resumed)
}

/// Terminate a workspace irreversibly: detach every attached volume, then
/// terminate the instance. A provider failure during the terminate call
/// leaves the workspace in `terminating` rather than reverting — the
/// caller is expected to retry, not treat it as still live.
pub async fn terminate(
    store: &dyn StateStore,
    provider: &dyn CloudProvider,
    events: &EventBus,
    workspace_id: WorkspaceId,
) -> LifecycleResult<LifecycleOutcome> {
    let mut workspace = store.get_workspace(workspace_id).await?;
    require_transition(&workspace, LifecycleEvent::Terminate)?;

    workspace.state = WorkspaceState::Terminating;
    store.put_workspace(&workspace).await?;
    events.publish(EventRecord::new(
        EventKind::WorkspaceTerminating,
        SubjectType::Workspace,
        workspace_id.to_string(),
        "lifecycle",
        serde_json::json!({}),
    ));

    let instance_id = workspace.provider_instance_id.clone().unwrap_or_default();

    for volume_id in workspace.attached_workspace_volumes.clone() {
        if let Err(err) = provider.detach_workspace_volume(&volume_id.to_string(), &instance_id).await
        {
            warn!(%workspace_id, %volume_id, error = %err, "detach failed during termination, continuing");
        }
    }
    for volume_id in workspace.attached_shared_volumes.clone() {
        if let Err(err) = provider.unmount_shared_volume(&volume_id.to_string(), &instance_id).await {
            warn!(%workspace_id, %volume_id, error = %err, "unmount failed during termination, continuing");
        }
    }

    let cancel = CancellationToken::new();
    provider.terminate_vm(&instance_id, &cancel).await.map_err(LifecycleError::Provider)?;

    workspace.state = WorkspaceState::Terminated;
    workspace.hourly_rate = 0.0;
    store.put_workspace(&workspace).await?;
    events.publish(EventRecord::new(
        EventKind::WorkspaceTerminated,
        SubjectType::Workspace,
        workspace_id.to_string(),
        "lifecycle",
        serde_json::json!({}),
    ));
    info!(%workspace_id, "workspace terminated");
    Ok(LifecycleOutcome::Terminating)
}

/// Apply a (possibly different) template over a workspace's current
/// applied layer.
pub async fn apply(
    store: &dyn StateStore,
    templates: &TemplateResolver,
    events: &EventBus,
    workspace_id: WorkspaceId,
    request: ApplyRequest,
) -> LifecycleResult<LifecycleOutcome> {
    let mut workspace = store.get_workspace(workspace_id).await?;
    require_transition(&workspace, LifecycleEvent::SideEffect)?;

    crate::launch::reject_auto_override(request.package_manager_override)?;
    let target = templates.resolve(&request.template_name, request.package_manager_override)?;

    let current = if let Some(layer) = workspace.applied_template_layers.last() {
        let current_template = store.get_template(layer.template_ref).await?;
        Some(templates.resolve(&current_template.name, None)?)
    } else {
        None
    };

    let plan = basecamp_template::apply::apply(
        &target,
        current.as_ref(),
        workspace.architecture,
        basecamp_template::ApplyOptions { dry_run: request.dry_run, force: request.force },
    )?;

    if request.dry_run {
        return Ok(LifecycleOutcome::Applied(plan));
    }

    let template_id = templates
        .get(&request.template_name)
        .map(|t| t.id)
        .unwrap_or_else(TemplateId::new);
    let checkpoint_id =
        plan.checkpoint_id.map(|c| c.to_string()).unwrap_or_else(|| CheckpointId::new().to_string());
    workspace.applied_template_layers.push(basecamp_storage::AppliedTemplateLayer {
        template_ref: template_id,
        applied_at: chrono::Utc::now(),
        package_manager_used: target.package_manager,
        packages_installed_count: u32::try_from(plan.diff.packages_to_install.len()).unwrap_or(0),
        services_configured_count: u32::try_from(plan.diff.services_to_enable.len()).unwrap_or(0),
        users_added_count: u32::try_from(plan.diff.users_to_add.len()).unwrap_or(0),
        rollback_checkpoint_id: checkpoint_id,
    });
    store.put_workspace(&workspace).await?;
    events.publish(EventRecord::new(
        EventKind::TemplateApplied,
        SubjectType::Workspace,
        workspace_id.to_string(),
        "lifecycle",
        serde_json::json!({ "template": request.template_name }),
    ));
    Ok(LifecycleOutcome::Applied(plan))
}

/// Roll back to an earlier applied-template checkpoint: undoes the layer
/// that checkpoint belongs to and everything applied after it, matching
/// [`basecamp_storage::Workspace::rollback_to`]'s truncation semantics.
///
/// `AppliedTemplateLayer` persists only counts, not the package list
/// itself, so the packages a removed layer would uninstall are
/// re-derived by resolving that layer's template again rather than
/// stored redundantly on every layer.
pub async fn rollback(
    store: &dyn StateStore,
    templates: &TemplateResolver,
    events: &EventBus,
    workspace_id: WorkspaceId,
    checkpoint: CheckpointId,
) -> LifecycleResult<LifecycleOutcome> {
    let mut workspace = store.get_workspace(workspace_id).await?;
    require_transition(&workspace, LifecycleEvent::SideEffect)?;

    let checkpoint_str = checkpoint.to_string();
    let removed_pos = workspace
        .applied_template_layers
        .iter()
        .position(|l| l.rollback_checkpoint_id == checkpoint_str)
        .ok_or_else(|| {
            LifecycleError::Template(basecamp_template::TemplateError::CheckpointNotFound(
                checkpoint_str.clone(),
            ))
        })?;
    let removed_layers = workspace.applied_template_layers[removed_pos..].to_vec();

    let mut removed_packages = Vec::new();
    for layer in &removed_layers {
        let layer_template = store.get_template(layer.template_ref).await?;
        if let Ok(resolved) = templates.resolve(&layer_template.name, None) {
            removed_packages.extend(resolved.packages);
        }
    }
    let package_manager = removed_layers
        .last()
        .map_or(basecamp_storage::PackageManager::Auto, |l| l.package_manager_used);

    let outcome = basecamp_template::rollback::rollback(package_manager, &removed_packages);
    workspace.rollback_to(&checkpoint_str);
    store.put_workspace(&workspace).await?;
    events.publish(EventRecord::new(
        EventKind::TemplateRolledBack,
        SubjectType::Workspace,
        workspace_id.to_string(),
        "lifecycle",
        serde_json::json!({ "checkpoint": checkpoint_str }),
    ));
    Ok(LifecycleOutcome::RolledBack(outcome))
}

/// Snapshot a running workspace as a reusable template: stop, image,
/// restart, then register a new template inheriting from the original.
/// Any failure after the stop always attempts to restart the instance
/// before surfacing the error, so a failed snapshot never leaves a
/// workspace down.
pub async fn save_as_template(
    store: &dyn StateStore,
    provider: &dyn CloudProvider,
    events: &EventBus,
    workspace_id: WorkspaceId,
    new_template_name: String,
) -> LifecycleResult<LifecycleOutcome> {
    let mut workspace = store.get_workspace(workspace_id).await?;
    if workspace.state != WorkspaceState::Running {
        return Err(LifecycleError::IllegalTransition {
            workspace: workspace.id,
            from: workspace.state,
            command: "SaveAsTemplate",
        });
    }

    let instance_id = workspace.provider_instance_id.clone().unwrap_or_default();
    let cancel = CancellationToken::new();

    provider.stop_vm(&instance_id, &cancel).await.map_err(LifecycleError::Provider)?;
    workspace.state = WorkspaceState::Stopped;
    store.put_workspace(&workspace).await?;

    let image_result = provider.create_image(&instance_id, &new_template_name).await;

    let restart_result = provider.start_vm(&instance_id, &cancel).await;
    workspace.state = WorkspaceState::Running;
    store.put_workspace(&workspace).await?;
    if let Err(err) = restart_result {
        warn!(%workspace_id, error = %err, "failed to restart workspace after save-as-template snapshot");
        return Err(LifecycleError::Provider(err));
    }

    let image_ref = image_result.map_err(LifecycleError::Provider)?;

    let parent_template = store.get_template(workspace.template_ref).await?;
    let new_template = basecamp_storage::Template {
        schema_version: basecamp_storage::SCHEMA_VERSION,
        id: TemplateId::new(),
        name: new_template_name.clone(),
        description: format!("saved from workspace {}", workspace.name),
        base_image: image_ref,
        inherits: Some(parent_template.name.clone()),
        package_manager: parent_template.package_manager,
        packages: Vec::new(),
        services: Vec::new(),
        users: Vec::new(),
        ports: Vec::new(),
        instance_type_map: parent_template.instance_type_map.clone(),
        cost_per_hour_map: parent_template.cost_per_hour_map.clone(),
    };
    store.put_template(&new_template).await?;

    events.publish(EventRecord::new(
        EventKind::TemplateApplied,
        SubjectType::Workspace,
        workspace_id.to_string(),
        "lifecycle",
        serde_json::json!({ "saved_as_template": new_template_name }),
    ));

    Ok(LifecycleOutcome::SavedAsTemplate { template_id: new_template.id })
}

#[cfg(test)]
mod tests {
    use basecamp_storage::{Database, SurrealStateStore};
    use basecamp_test::{FakeProvider, test_running_workspace};

    use super::*;

    async fn memory_store() -> SurrealStateStore {
        let db = Database::connect_memory().await.unwrap();
        SurrealStateStore::new(db)
    }

    #[tokio::test]
    async fn stop_then_start_round_trips_through_the_store() {
        let store = memory_store().await;
        let provider = FakeProvider::new();
        let events = EventBus::new();

        let mut ws = test_running_workspace();
        ws.provider_instance_id = Some("i-test".to_string());
        store.put_workspace(&ws).await.unwrap();

        stop(&store, &provider, &events, ws.id).await.unwrap();
        let stopped = store.get_workspace(ws.id).await.unwrap();
        assert_eq!(stopped.state, WorkspaceState::Stopped);
        assert_eq!(stopped.hourly_rate, 0.0);

        start(&store, &provider, &events, ws.id).await.unwrap();
        let running = store.get_workspace(ws.id).await.unwrap();
        assert_eq!(running.state, WorkspaceState::Running);
    }

    #[tokio::test]
    async fn stop_on_already_stopped_is_idempotent() {
        let store = memory_store().await;
        let provider = FakeProvider::new();
        let events = EventBus::new();

        let mut ws = test_running_workspace();
        ws.state = WorkspaceState::Stopped;
        store.put_workspace(&ws).await.unwrap();

        let outcome = stop(&store, &provider, &events, ws.id).await.unwrap();
        assert!(matches!(outcome, LifecycleOutcome::Stopped));
        assert!(provider.calls().is_empty());

        let stored = store.get_workspace(ws.id).await.unwrap();
        assert_eq!(stored.state, WorkspaceState::Stopped);
    }

    #[tokio::test]
    async fn terminate_from_stopped_detaches_nothing_and_succeeds() {
        let store = memory_store().await;
        let provider = FakeProvider::new();
        let events = EventBus::new();

        let mut ws = test_running_workspace();
        ws.state = WorkspaceState::Stopped;
        ws.provider_instance_id = Some("i-test".to_string());
        store.put_workspace(&ws).await.unwrap();

        terminate(&store, &provider, &events, ws.id).await.unwrap();
        let terminated = store.get_workspace(ws.id).await.unwrap();
        assert_eq!(terminated.state, WorkspaceState::Terminated);
    }

    #[tokio::test]
    async fn terminate_from_provisioning_is_permitted() {
        let store = memory_store().await;
        let provider = FakeProvider::new();
        let events = EventBus::new();

        let mut ws = test_running_workspace();
        ws.state = WorkspaceState::Provisioning;
        ws.provider_instance_id = Some("i-test".to_string());
        store.put_workspace(&ws).await.unwrap();

        terminate(&store, &provider, &events, ws.id).await.unwrap();
        let terminated = store.get_workspace(ws.id).await.unwrap();
        assert_eq!(terminated.state, WorkspaceState::Terminated);
    }

    #[tokio::test]
    async fn terminate_from_requested_is_permitted() {
        let store = memory_store().await;
        let provider = FakeProvider::new();
        let events = EventBus::new();

        let mut ws = test_running_workspace();
        ws.state = WorkspaceState::Requested;
        ws.provider_instance_id = Some("i-test".to_string());
        store.put_workspace(&ws).await.unwrap();

        terminate(&store, &provider, &events, ws.id).await.unwrap();
        let terminated = store.get_workspace(ws.id).await.unwrap();
        assert_eq!(terminated.state, WorkspaceState::Terminated);
    }
}
