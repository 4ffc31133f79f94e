//! Ties the state store, cloud provider, template resolver, pricing
//! engine, event bus, and per-workspace command queue into the single
//! facade the daemon's API layer calls.

use std::sync::Arc;

use basecamp_core::ids::{CheckpointId, WorkspaceId};
use basecamp_events::EventBus;
use basecamp_pricing::PricingEngine;
use basecamp_provider::CloudProvider;
use basecamp_storage::StateStore;
use basecamp_template::TemplateResolver;

use crate::commands;
use crate::error::LifecycleResult;
use crate::launch::launch as run_launch;
use crate::queue::CommandQueue;
use crate::types::{ApplyRequest, LaunchRequest, LifecycleCommand, LifecycleOutcome};

/// The workspace lifecycle engine: the single entry point the daemon's
/// API layer calls for every workspace operation.
///
/// Cheap to clone — every field is an `Arc`, so handing a clone to each
/// API request handler (or to the idle/budget background loops) shares
/// the same command queue and accumulator state rather than forking it.
#[derive(Clone)]
pub struct LifecycleEngine {
    store: Arc<dyn StateStore>,
    provider: Arc<dyn CloudProvider>,
    templates: Arc<TemplateResolver>,
    pricing: Arc<PricingEngine>,
    events: Arc<EventBus>,
    queue: Arc<CommandQueue>,
}

impl LifecycleEngine {
    /// Build an engine over the given components.
    #[must_use]
    pub fn new(
        store: Arc<dyn StateStore>,
        provider: Arc<dyn CloudProvider>,
        templates: Arc<TemplateResolver>,
        pricing: Arc<PricingEngine>,
        events: Arc<EventBus>,
    ) -> Self {
        Self { store, provider, templates, pricing, events, queue: Arc::new(CommandQueue::new()) }
    }

    /// Launch a new workspace. Not routed through the command queue for
    /// serialization: there is no existing workspace id to serialize on
    /// until the record itself is persisted partway through the
    /// algorithm. It does consult the queue's termination marker once
    /// that id exists, so a `Terminate` against this workspace (issued
    /// once a caller discovers it, e.g. via a list call) still pre-empts
    /// the launch.
    pub async fn launch(&self, request: LaunchRequest) -> LifecycleResult<LifecycleOutcome> {
        run_launch(
            self.store.as_ref(),
            self.provider.as_ref(),
            self.templates.as_ref(),
            self.pricing.as_ref(),
            self.events.as_ref(),
            self.queue.as_ref(),
            request,
        )
        .await
    }

    /// Execute a command against an existing workspace, serialized
    /// against any other in-flight command for the same workspace.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::LifecycleError::Preempted`] if a
    /// `Terminate` for this workspace is already in flight or queued
    /// ahead of this command.
    pub async fn execute(
        &self,
        workspace_id: WorkspaceId,
        command: LifecycleCommand,
    ) -> LifecycleResult<LifecycleOutcome> {
        let is_terminate = command.is_terminate();
        self.queue
            .run(workspace_id, is_terminate, || async move {
                match command {
                    LifecycleCommand::Launch(_) => unreachable!(
                        "Launch is dispatched through LifecycleEngine::launch, never execute"
                    ),
                    LifecycleCommand::Stop => {
                        commands::stop(self.store.as_ref(), self.provider.as_ref(), self.events.as_ref(), workspace_id)
                            .await
                    },
                    LifecycleCommand::Start => {
                        commands::start(self.store.as_ref(), self.provider.as_ref(), self.events.as_ref(), workspace_id)
                            .await
                    },
                    LifecycleCommand::Hibernate => {
                        commands::hibernate(
                            self.store.as_ref(),
                            self.provider.as_ref(),
                            self.events.as_ref(),
                            workspace_id,
                        )
                        .await
                    },
                    LifecycleCommand::Resume => {
                        commands::resume(
                            self.store.as_ref(),
                            self.provider.as_ref(),
                            self.events.as_ref(),
                            workspace_id,
                        )
                        .await
                    },
                    LifecycleCommand::Terminate => {
                        commands::terminate(
                            self.store.as_ref(),
                            self.provider.as_ref(),
                            self.events.as_ref(),
                            workspace_id,
                        )
                        .await
                    },
                    LifecycleCommand::Apply(request) => self.apply(workspace_id, request).await,
                    LifecycleCommand::Rollback { checkpoint } => {
                        self.rollback(workspace_id, checkpoint).await
                    },
                    LifecycleCommand::SaveAsTemplate { new_template_name } => {
                        commands::save_as_template(
                            self.store.as_ref(),
                            self.provider.as_ref(),
                            self.events.as_ref(),
                            workspace_id,
                            new_template_name,
                        )
                        .await
                    },
                }
            })
            .await
    }

    async fn apply(
        &self,
        workspace_id: WorkspaceId,
        request: ApplyRequest,
    ) -> LifecycleResult<LifecycleOutcome> {
        commands::apply(
            self.store.as_ref(),
            self.templates.as_ref(),
            self.events.as_ref(),
            workspace_id,
            request,
        )
        .await
    }

    async fn rollback(
        &self,
        workspace_id: WorkspaceId,
        checkpoint: CheckpointId,
    ) -> LifecycleResult<LifecycleOutcome> {
        commands::rollback(
            self.store.as_ref(),
            self.templates.as_ref(),
            self.events.as_ref(),
            workspace_id,
            checkpoint,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use basecamp_storage::{Database, SurrealStateStore};
    use basecamp_template::discovery::TemplateDirectories;
    use basecamp_test::{FakeProvider, test_running_workspace};

    use super::*;
    use crate::error::LifecycleError;
    use crate::types::LaunchRequest;

    async fn test_engine() -> (LifecycleEngine, Arc<dyn StateStore>) {
        let db = Database::connect_memory().await.unwrap();
        let store: Arc<dyn StateStore> = Arc::new(SurrealStateStore::new(db));
        let provider: Arc<dyn CloudProvider> = Arc::new(FakeProvider::new());
        let templates = Arc::new(TemplateResolver::new(TemplateDirectories::new()).unwrap());
        let pricing = Arc::new(PricingEngine::new(basecamp_pricing::RateTable::bundled_defaults()));
        let events = Arc::new(EventBus::new());
        let engine = LifecycleEngine::new(
            Arc::clone(&store),
            provider,
            templates,
            pricing,
            events,
        );
        (engine, store)
    }

    #[tokio::test]
    async fn stop_on_a_running_workspace_settles_to_stopped() {
        let (engine, store) = test_engine().await;
        let mut ws = test_running_workspace();
        ws.provider_instance_id = Some("i-test".to_string());
        store.put_workspace(&ws).await.unwrap();

        let outcome = engine.execute(ws.id, LifecycleCommand::Stop).await.unwrap();
        assert!(matches!(outcome, LifecycleOutcome::Stopped));
    }

    #[tokio::test]
    async fn launch_does_not_go_through_execute() {
        let (engine, _store) = test_engine().await;
        let request = LaunchRequest {
            name: "ws".to_string(),
            project: basecamp_core::ids::ProjectId::new(),
            template_name: "missing".to_string(),
            size_class: basecamp_storage::SizeClass::S,
            architecture: basecamp_storage::Architecture::X86_64,
            lifecycle: basecamp_storage::LifecycleMode::OnDemand,
            package_manager_override: None,
            region: "us-east-1".to_string(),
            owner_principal: "researcher@example.com".to_string(),
            shared_volumes: Vec::new(),
            workspace_volumes: Vec::new(),
            idle_policy_ref: None,
            dry_run: false,
        };
        let err = engine.launch(request).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Template(_)));
    }
}
