//! The launch algorithm: the one lifecycle command that
//! creates a workspace rather than acting on an existing one, so it is
//! not routed through [`crate::queue::CommandQueue`] for serialization —
//! there is no surrogate id to serialize on until step 6. It still polls
//! the queue's termination marker once that id exists, so a `Terminate`
//! discovered mid-provisioning pre-empts reaching `running`.

use std::time::Duration;

use basecamp_core::ids::WorkspaceId;
use basecamp_events::{EventBus, EventKind, EventRecord, SubjectType};
use basecamp_pricing::PricingEngine;
use basecamp_provider::{CloudProvider, LaunchVmSpec, VmState};
use basecamp_storage::{
    Architecture, PackageManager, SCHEMA_VERSION, SizeClass, StateStore, Workspace, WorkspaceState,
};
use basecamp_template::TemplateResolver;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{LifecycleError, LifecycleResult};
use crate::queue::CommandQueue;
use crate::types::{LaunchPlan, LaunchRequest, LifecycleOutcome};

/// How often `describe_vm` is polled while waiting for a launch to
/// settle.
const POLL_INTERVAL: Duration = Duration::from_secs(2);
/// Default provisioning deadline.
const DEFAULT_PROVISIONING_DEADLINE: Duration = Duration::from_secs(15 * 60);

fn size_class_label(size: SizeClass) -> &'static str {
    match size {
        SizeClass::Xs => "xs",
        SizeClass::S => "s",
        SizeClass::M => "m",
        SizeClass::L => "l",
        SizeClass::Xl => "xl",
        SizeClass::GpuS => "gpu_s",
        SizeClass::GpuM => "gpu_m",
        SizeClass::GpuL => "gpu_l",
    }
}

fn architecture_label(architecture: Architecture) -> &'static str {
    match architecture {
        Architecture::X86_64 => "x86_64",
        Architecture::Arm64 => "arm64",
    }
}

/// `Auto` means "let the template/packages decide" — it is not itself a
/// package manager a caller can ask to switch to, so naming it as an
/// explicit override is the one genuinely invalid value.
pub(crate) fn reject_auto_override(override_manager: Option<PackageManager>) -> LifecycleResult<()> {
    if override_manager == Some(PackageManager::Auto) {
        return Err(LifecycleError::UnsupportedPackageManager {
            declared: PackageManager::Auto,
            requested: PackageManager::Auto,
        });
    }
    Ok(())
}

/// The `instance_type_map` lookup key: instance selection picks from
/// `size_class × architecture × template.instance_type_map`, a three-way
/// product the map's own `String` keys have to encode somehow. Keyed as
/// `"{size_class}:{architecture}"`, e.g. `"m:x86_64"`.
#[must_use]
pub fn instance_type_key(size_class: SizeClass, architecture: Architecture) -> String {
    format!("{}:{}", size_class_label(size_class), architecture_label(architecture))
}

/// Cut a launch short once a concurrent `Terminate` has been recorded for
/// this workspace — discovered, for instance, via a list/describe call
/// against a still-provisioning workspace. Settles the workspace on
/// `terminated` directly rather than ever reaching `running`, tearing down
/// whatever instance already exists first.
async fn terminate_during_launch(
    store: &dyn StateStore,
    provider: &dyn CloudProvider,
    events: &EventBus,
    cancel: &CancellationToken,
    mut workspace: Workspace,
    instance_id: Option<String>,
) -> LifecycleResult<LifecycleOutcome> {
    cancel.cancel();
    let workspace_id = workspace.id;

    workspace.state = WorkspaceState::Terminating;
    store.put_workspace(&workspace).await?;
    events.publish(EventRecord::new(
        EventKind::WorkspaceTerminating,
        SubjectType::Workspace,
        workspace_id.to_string(),
        "lifecycle",
        serde_json::json!({ "during": "launch" }),
    ));

    if let Some(instance_id) = instance_id {
        if let Err(err) = provider.terminate_vm(&instance_id, &CancellationToken::new()).await {
            warn!(%workspace_id, error = %err, "terminate during launch failed, leaving workspace terminating");
            return Ok(LifecycleOutcome::Terminating);
        }
    }

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
    Ok(LifecycleOutcome::Terminating)
}

/// Execute the launch algorithm end to end (or, for `dry_run`, steps 1-4
/// only) and return the resulting outcome.
///
/// # Errors
///
/// Returns [`LifecycleError::NameConflict`], [`LifecycleError::Template`],
/// [`LifecycleError::UnsupportedPackageManager`],
/// [`LifecycleError::LaunchBlocked`], [`LifecycleError::Provider`], or
/// [`LifecycleError::ProvisioningTimeout`] as appropriate.
#[allow(clippy::too_many_arguments)]
pub async fn launch(
    store: &dyn StateStore,
    provider: &dyn CloudProvider,
    templates: &TemplateResolver,
    pricing: &PricingEngine,
    events: &EventBus,
    queue: &CommandQueue,
    request: LaunchRequest,
) -> LifecycleResult<LifecycleOutcome> {
    // Step 1: name uniqueness within the project.
    if store.find_workspace_by_name(request.project, &request.name).await?.is_some() {
        return Err(LifecycleError::NameConflict { project: request.project, name: request.name });
    }

    // Step 2: resolve template + architecture + package_manager. An
    // explicit override takes precedence over the template's own
    // declaration.
    reject_auto_override(request.package_manager_override)?;
    let resolved = templates.resolve(&request.template_name, request.package_manager_override)?;
    let script = basecamp_template::script::generate(&resolved, request.architecture);

    // Step 4 (hoisted ahead of the dry-run short-circuit: the plan a
    // dry run reports must itself name the selected instance type and
    // rate).
    let key = instance_type_key(request.size_class, request.architecture);
    let instance_type = resolved
        .instance_type_map
        .get(&key)
        .cloned()
        .ok_or_else(|| LifecycleError::NoInstanceType { key: key.clone() })?;
    let estimated_hourly_rate =
        pricing.rate_for(&instance_type, &request.region, request.lifecycle)?;

    // Step 3: dry run short-circuits here, with no further side effects.
    if request.dry_run {
        return Ok(LifecycleOutcome::DryRunPlanned(LaunchPlan {
            instance_type,
            estimated_hourly_rate,
            script_digest: script.digest,
            shared_volumes: request.shared_volumes,
            workspace_volumes: request.workspace_volumes,
        }));
    }

    // Step 5: budget precondition.
    let project = store.get_project(request.project).await?;
    if project.launch_blocked {
        return Err(LifecycleError::LaunchBlocked(request.project));
    }

    let template_id = templates
        .get(&request.template_name)
        .map(|t| t.id)
        .ok_or_else(|| LifecycleError::Template(basecamp_template::TemplateError::NotFound(
            request.template_name.clone(),
        )))?;

    // Step 6: persist `requested`, transition to `provisioning`, launch.
    let workspace_id = WorkspaceId::new();
    let mut workspace = Workspace {
        schema_version: SCHEMA_VERSION,
        id: workspace_id,
        name: request.name.clone(),
        template_ref: template_id,
        size_class: request.size_class,
        architecture: request.architecture,
        lifecycle: request.lifecycle,
        state: WorkspaceState::Requested,
        region: request.region.clone(),
        provider_instance_id: None,
        public_ip: None,
        private_ip: None,
        launched_at: None,
        hourly_rate: 0.0,
        accumulated_cost: 0.0,
        attached_shared_volumes: Vec::new(),
        attached_workspace_volumes: Vec::new(),
        applied_template_layers: Vec::new(),
        idle_policy_ref: request.idle_policy_ref,
        project_ref: Some(request.project),
        owner_principal: request.owner_principal.clone(),
        provisioning_script_digest: script.digest.clone(),
        hibernation_fallback: false,
    };
    store.put_workspace(&workspace).await?;

    workspace.state = WorkspaceState::Provisioning;
    store.put_workspace(&workspace).await?;
    events.publish(EventRecord::new(
        EventKind::WorkspaceProvisioning,
        SubjectType::Workspace,
        workspace_id.to_string(),
        "lifecycle",
        serde_json::json!({ "template": request.template_name }),
    ));

    let cancel = CancellationToken::new();

    // A caller may have discovered this workspace (e.g. by listing
    // workspaces by project) and asked to terminate it while it is still
    // provisioning. Honor that now, before an instance even exists.
    if queue.is_terminating(workspace_id) {
        return terminate_during_launch(store, provider, events, &cancel, workspace, None).await;
    }

    let mut tags = std::collections::BTreeMap::new();
    tags.insert("workspace_id".to_string(), workspace_id.to_string());

    let spec = LaunchVmSpec {
        image_ref: resolved.base_image.clone(),
        instance_type: instance_type.clone(),
        lifecycle: request.lifecycle,
        architecture: request.architecture,
        region: request.region.clone(),
        network_placement: None,
        user_data: script.script.clone(),
        tags,
    };

    let launch_result = basecamp_core::retry::retry(
        &basecamp_core::retry::RetryConfig::provider(),
        |_attempt| provider.launch_vm(spec.clone(), &cancel),
        basecamp_provider::ProviderError::is_retryable,
    )
    .await;

    let handle = match launch_result {
        basecamp_core::retry::RetryOutcome::Success(handle) => handle,
        basecamp_core::retry::RetryOutcome::Exhausted { error, .. } => {
            workspace.state = WorkspaceState::ProvisioningFailed;
            store.put_workspace(&workspace).await?;
            events.publish(EventRecord::new(
                EventKind::WorkspaceProvisioningFailed,
                SubjectType::Workspace,
                workspace_id.to_string(),
                "lifecycle",
                serde_json::json!({ "reason": error.to_string() }),
            ));
            return Err(LifecycleError::Provider(error));
        },
        basecamp_core::retry::RetryOutcome::Aborted => {
            workspace.state = WorkspaceState::ProvisioningFailed;
            store.put_workspace(&workspace).await?;
            return Err(LifecycleError::Provider(basecamp_provider::ProviderError::Cancelled));
        },
    };

    // Step 7: poll until running, or the provisioning deadline expires.
    // Checked on every iteration so a `Terminate` that arrives mid-poll
    // pre-empts reaching `running` instead of racing it.
    let deadline = tokio::time::Instant::now() + DEFAULT_PROVISIONING_DEADLINE;
    loop {
        if queue.is_terminating(workspace_id) {
            return terminate_during_launch(
                store,
                provider,
                events,
                &cancel,
                workspace,
                Some(handle.instance_id.clone()),
            )
            .await;
        }

        let description = provider.describe_vm(&handle.instance_id).await?;
        match description.state {
            VmState::Running => break,
            VmState::Error => {
                workspace.state = WorkspaceState::ProvisioningFailed;
                store.put_workspace(&workspace).await?;
                events.publish(EventRecord::new(
                    EventKind::WorkspaceProvisioningFailed,
                    SubjectType::Workspace,
                    workspace_id.to_string(),
                    "lifecycle",
                    serde_json::json!({ "reason": "provider reported error state" }),
                ));
                return Err(LifecycleError::ProvisioningTimeout {
                    workspace: workspace_id,
                    deadline_secs: DEFAULT_PROVISIONING_DEADLINE.as_secs(),
                });
            },
            _ => {},
        }
        if tokio::time::Instant::now() >= deadline {
            workspace.state = WorkspaceState::ProvisioningFailed;
            store.put_workspace(&workspace).await?;
            events.publish(EventRecord::new(
                EventKind::WorkspaceProvisioningFailed,
                SubjectType::Workspace,
                workspace_id.to_string(),
                "lifecycle",
                serde_json::json!({ "reason": "provisioning deadline exceeded" }),
            ));
            return Err(LifecycleError::ProvisioningTimeout {
                workspace: workspace_id,
                deadline_secs: DEFAULT_PROVISIONING_DEADLINE.as_secs(),
            });
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }

    workspace.provider_instance_id = Some(handle.instance_id.clone());
    workspace.public_ip = handle.public_ip.clone();
    workspace.private_ip = handle.private_ip.clone();
    workspace.launched_at = Some(chrono::Utc::now());
    workspace.hourly_rate = estimated_hourly_rate;
    workspace.state = WorkspaceState::Running;
    workspace.applied_template_layers.push(basecamp_storage::AppliedTemplateLayer {
        template_ref: template_id,
        applied_at: workspace.launched_at.expect("just set above"),
        package_manager_used: resolved.package_manager,
        packages_installed_count: u32::try_from(resolved.packages.len()).unwrap_or(u32::MAX),
        services_configured_count: u32::try_from(resolved.services.len()).unwrap_or(u32::MAX),
        users_added_count: u32::try_from(resolved.users.len()).unwrap_or(u32::MAX),
        rollback_checkpoint_id: script.digest.clone(),
    });

    // Step 8: attach volumes, shared first. A failure here degrades the
    // workspace but never fails the launch outright — there is no
    // dedicated `running_degraded` state, so degradation is only
    // surfaced on the event bus, not persisted on the record.
    let mut degraded = false;
    for volume_id in &request.shared_volumes {
        if let Err(err) =
            provider.mount_shared_volume(&volume_id.to_string(), &handle.instance_id, "/mnt/shared").await
        {
            warn!(%workspace_id, %volume_id, error = %err, "shared volume mount failed");
            degraded = true;
        } else {
            workspace.attached_shared_volumes.push(*volume_id);
        }
    }
    for volume_id in &request.workspace_volumes {
        if let Err(err) = provider
            .attach_workspace_volume(&volume_id.to_string(), &handle.instance_id, "/dev/xvdf")
            .await
        {
            warn!(%workspace_id, %volume_id, error = %err, "workspace volume attach failed");
            degraded = true;
        } else {
            workspace.attached_workspace_volumes.push(*volume_id);
        }
    }

    // Step 9: begin cost accrual, persist, publish.
    pricing.workspace_accumulator(workspace_id);
    store.commit_workspace_running(&workspace).await?;

    if degraded {
        events.publish(EventRecord::new(
            EventKind::WorkspaceDegraded,
            SubjectType::Workspace,
            workspace_id.to_string(),
            "lifecycle",
            serde_json::json!({ "reason": "one or more volume attachments failed" }),
        ));
    }
    events.publish(EventRecord::new(
        EventKind::WorkspaceRunning,
        SubjectType::Workspace,
        workspace_id.to_string(),
        "lifecycle",
        serde_json::json!({ "instance_id": handle.instance_id }),
    ));
    info!(%workspace_id, instance_id = %handle.instance_id, "workspace running");

    Ok(LifecycleOutcome::Launched { workspace_id })
}

#[cfg(test)]
mod tests {
    use basecamp_storage::{Database, LifecycleMode, PackageManager, SurrealStateStore};
    use basecamp_template::discovery::TemplateDirectories;
    use basecamp_test::FakeProvider;

    use super::*;

    async fn memory_store() -> SurrealStateStore {
        let db = Database::connect_memory().await.unwrap();
        SurrealStateStore::new(db)
    }

    fn write_template(dir: &std::path::Path, key: &str, instance_type: &str) {
        let mut instance_type_map = std::collections::BTreeMap::new();
        instance_type_map.insert(key.to_string(), instance_type.to_string());
        let template = basecamp_storage::Template {
            schema_version: SCHEMA_VERSION,
            id: basecamp_core::ids::TemplateId::new(),
            name: "base".to_string(),
            description: String::new(),
            base_image: "ubuntu-22.04".to_string(),
            inherits: None,
            package_manager: PackageManager::Apt,
            packages: vec!["curl".to_string()],
            services: Vec::new(),
            users: Vec::new(),
            ports: Vec::new(),
            instance_type_map,
            cost_per_hour_map: std::collections::BTreeMap::new(),
        };
        std::fs::write(dir.join("TEMPLATE.toml"), toml::to_string_pretty(&template).unwrap()).unwrap();
    }

    fn request(project: basecamp_core::ids::ProjectId) -> LaunchRequest {
        LaunchRequest {
            name: "ws-1".to_string(),
            project,
            template_name: "base".to_string(),
            size_class: SizeClass::S,
            architecture: Architecture::X86_64,
            lifecycle: LifecycleMode::OnDemand,
            package_manager_override: None,
            region: "us-east-1".to_string(),
            owner_principal: "researcher@example.com".to_string(),
            shared_volumes: Vec::new(),
            workspace_volumes: Vec::new(),
            idle_policy_ref: None,
            dry_run: false,
        }
    }

    #[tokio::test]
    async fn dry_run_has_no_side_effects() {
        let dir = tempfile::TempDir::new().unwrap();
        write_template(dir.path(), "s:x86_64", "m5.large");
        let templates =
            TemplateResolver::new(TemplateDirectories::new().with_dir(dir.path())).unwrap();

        let store = memory_store().await;
        let provider = FakeProvider::new();
        let mut rates = basecamp_pricing::RateTable::empty();
        rates.insert("m5.large", "us-east-1", LifecycleMode::OnDemand, 0.5);
        let pricing = PricingEngine::new(rates);
        let events = EventBus::new();

        let project = basecamp_test::test_project();
        store.put_project(&project).await.unwrap();

        let mut req = request(project.id);
        req.dry_run = true;

        let queue = CommandQueue::new();
        let outcome =
            launch(&store, &provider, &templates, &pricing, &events, &queue, req).await.unwrap();
        match outcome {
            LifecycleOutcome::DryRunPlanned(plan) => {
                assert_eq!(plan.instance_type, "m5.large");
                assert!((plan.estimated_hourly_rate - 0.5).abs() < 1e-9);
            },
            other => panic!("expected DryRunPlanned, got {other:?}"),
        }
        assert!(provider.calls().is_empty());
        assert!(store.find_workspace_by_name(project.id, "ws-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn full_launch_reaches_running_and_publishes_event() {
        let dir = tempfile::TempDir::new().unwrap();
        write_template(dir.path(), "s:x86_64", "m5.large");
        let templates =
            TemplateResolver::new(TemplateDirectories::new().with_dir(dir.path())).unwrap();

        let store = memory_store().await;
        let provider = FakeProvider::new();
        let mut rates = basecamp_pricing::RateTable::empty();
        rates.insert("m5.large", "us-east-1", LifecycleMode::OnDemand, 0.5);
        let pricing = PricingEngine::new(rates);
        let events = EventBus::new();
        let mut receiver = events.subscribe();

        let project = basecamp_test::test_project();
        store.put_project(&project).await.unwrap();

        let queue = CommandQueue::new();
        let outcome = launch(&store, &provider, &templates, &pricing, &events, &queue, request(project.id))
            .await
            .unwrap();
        let workspace_id = match outcome {
            LifecycleOutcome::Launched { workspace_id } => workspace_id,
            other => panic!("expected Launched, got {other:?}"),
        };

        let stored = store.get_workspace(workspace_id).await.unwrap();
        assert_eq!(stored.state, WorkspaceState::Running);
        assert!(stored.provider_instance_id.is_some());
        assert!((stored.hourly_rate - 0.5).abs() < 1e-9);

        let mut saw_running = false;
        while let Ok(event) = receiver.try_recv() {
            if event.kind == EventKind::WorkspaceRunning {
                saw_running = true;
            }
        }
        assert!(saw_running);
    }

    #[tokio::test]
    async fn duplicate_name_in_project_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        write_template(dir.path(), "s:x86_64", "m5.large");
        let templates =
            TemplateResolver::new(TemplateDirectories::new().with_dir(dir.path())).unwrap();

        let store = memory_store().await;
        let provider = FakeProvider::new();
        let mut rates = basecamp_pricing::RateTable::empty();
        rates.insert("m5.large", "us-east-1", LifecycleMode::OnDemand, 0.5);
        let pricing = PricingEngine::new(rates);
        let events = EventBus::new();

        let project = basecamp_test::test_project();
        store.put_project(&project).await.unwrap();

        let queue = CommandQueue::new();
        launch(&store, &provider, &templates, &pricing, &events, &queue, request(project.id))
            .await
            .unwrap();
        let err = launch(&store, &provider, &templates, &pricing, &events, &queue, request(project.id))
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::NameConflict { .. }));
    }

    #[tokio::test]
    async fn launch_blocked_by_prevent_launch_flag() {
        let dir = tempfile::TempDir::new().unwrap();
        write_template(dir.path(), "s:x86_64", "m5.large");
        let templates =
            TemplateResolver::new(TemplateDirectories::new().with_dir(dir.path())).unwrap();

        let store = memory_store().await;
        let provider = FakeProvider::new();
        let mut rates = basecamp_pricing::RateTable::empty();
        rates.insert("m5.large", "us-east-1", LifecycleMode::OnDemand, 0.5);
        let pricing = PricingEngine::new(rates);
        let events = EventBus::new();

        let mut project = basecamp_test::test_project();
        project.launch_blocked = true;
        store.put_project(&project).await.unwrap();

        let queue = CommandQueue::new();
        let err = launch(&store, &provider, &templates, &pricing, &events, &queue, request(project.id))
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::LaunchBlocked(_)));
    }

    #[tokio::test]
    async fn package_manager_override_wins_over_declared() {
        let dir = tempfile::TempDir::new().unwrap();
        write_template(dir.path(), "s:x86_64", "m5.large");
        let templates =
            TemplateResolver::new(TemplateDirectories::new().with_dir(dir.path())).unwrap();

        let store = memory_store().await;
        let provider = FakeProvider::new();
        let mut rates = basecamp_pricing::RateTable::empty();
        rates.insert("m5.large", "us-east-1", LifecycleMode::OnDemand, 0.5);
        let pricing = PricingEngine::new(rates);
        let events = EventBus::new();
        let queue = CommandQueue::new();

        let project = basecamp_test::test_project();
        store.put_project(&project).await.unwrap();

        // The template declares Apt; an explicit override to Conda must win.
        let mut req = request(project.id);
        req.package_manager_override = Some(PackageManager::Conda);

        let outcome =
            launch(&store, &provider, &templates, &pricing, &events, &queue, req).await.unwrap();
        let workspace_id = match outcome {
            LifecycleOutcome::Launched { workspace_id } => workspace_id,
            other => panic!("expected Launched, got {other:?}"),
        };

        let stored = store.get_workspace(workspace_id).await.unwrap();
        let layer = stored.applied_template_layers.last().unwrap();
        assert_eq!(layer.package_manager_used, PackageManager::Conda);
    }

    #[tokio::test]
    async fn auto_override_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        write_template(dir.path(), "s:x86_64", "m5.large");
        let templates =
            TemplateResolver::new(TemplateDirectories::new().with_dir(dir.path())).unwrap();

        let store = memory_store().await;
        let provider = FakeProvider::new();
        let pricing = PricingEngine::new(basecamp_pricing::RateTable::empty());
        let events = EventBus::new();
        let queue = CommandQueue::new();

        let project = basecamp_test::test_project();
        store.put_project(&project).await.unwrap();

        let mut req = request(project.id);
        req.package_manager_override = Some(PackageManager::Auto);

        let err =
            launch(&store, &provider, &templates, &pricing, &events, &queue, req).await.unwrap_err();
        assert!(matches!(err, LifecycleError::UnsupportedPackageManager { .. }));
    }

    #[tokio::test]
    async fn terminate_during_launch_settles_terminated_without_running() {
        let store = memory_store().await;
        let provider = FakeProvider::new();
        let events = EventBus::new();
        let cancel = CancellationToken::new();

        let mut workspace = basecamp_test::test_running_workspace();
        workspace.state = WorkspaceState::Provisioning;
        let workspace_id = workspace.id;
        store.put_workspace(&workspace).await.unwrap();

        let outcome =
            terminate_during_launch(&store, &provider, &events, &cancel, workspace, None).await.unwrap();
        assert!(matches!(outcome, LifecycleOutcome::Terminating));
        assert!(cancel.is_cancelled());

        let stored = store.get_workspace(workspace_id).await.unwrap();
        assert_eq!(stored.state, WorkspaceState::Terminated);
    }

    #[tokio::test]
    async fn terminate_during_launch_tears_down_partial_instance() {
        let store = memory_store().await;
        let provider = FakeProvider::new();
        let events = EventBus::new();
        let cancel = CancellationToken::new();

        let mut workspace = basecamp_test::test_running_workspace();
        workspace.state = WorkspaceState::Provisioning;
        let workspace_id = workspace.id;
        store.put_workspace(&workspace).await.unwrap();

        let handle = provider.launch_vm(LaunchVmSpec {
            image_ref: "ubuntu-22.04".to_string(),
            instance_type: "m5.large".to_string(),
            lifecycle: LifecycleMode::OnDemand,
            architecture: Architecture::X86_64,
            region: "us-east-1".to_string(),
            network_placement: None,
            user_data: String::new(),
            tags: std::collections::BTreeMap::new(),
        }, &cancel).await.unwrap();

        let outcome = terminate_during_launch(
            &store,
            &provider,
            &events,
            &cancel,
            workspace,
            Some(handle.instance_id.clone()),
        )
        .await
        .unwrap();
        assert!(matches!(outcome, LifecycleOutcome::Terminating));
        assert!(provider.calls().contains(&"terminate_vm".to_string()));

        let stored = store.get_workspace(workspace_id).await.unwrap();
        assert_eq!(stored.state, WorkspaceState::Terminated);
    }

    #[tokio::test]
    async fn auto_override_is_rejected_in_commands_apply_path() {
        // reject_auto_override is shared between launch() and
        // commands::apply(); exercised directly here since apply()'s own
        // test module lives in commands.rs.
        let err = reject_auto_override(Some(PackageManager::Auto)).unwrap_err();
        assert!(matches!(err, LifecycleError::UnsupportedPackageManager { .. }));
        reject_auto_override(Some(PackageManager::Apt)).unwrap();
        reject_auto_override(None).unwrap();
    }
}
