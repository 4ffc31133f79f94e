//! Typed state store: single-writer persistent store
//! with typed get/put/delete per entity kind, secondary indices, and
//! transactional multi-entity updates, backed by `SurrealDB`.

use async_trait::async_trait;
use basecamp_core::ids::{BudgetId, IdlePolicyId, ProjectId, TemplateId, VolumeId, WorkspaceId};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::db::Database;
use crate::error::{StorageError, StorageResult};
use crate::types::{Budget, IdlePolicy, Project, StorageVolume, Template, Workspace};

/// Table names used by the `SurrealDB`-backed implementation.
mod table {
    pub const WORKSPACE: &str = "workspace";
    pub const VOLUME: &str = "volume";
    pub const PROJECT: &str = "project";
    pub const TEMPLATE: &str = "template";
    pub const IDLE_POLICY: &str = "idle_policy";
    pub const BUDGET: &str = "budget";
}

/// Single-writer persistent store with typed access per entity kind.
///
/// Implementations must provide ACID semantics over every operation:
/// concurrent readers observe only committed snapshots, and a crash
/// mid-update recovers to the last fully-committed state. This trait
/// makes no assumption about the backing engine beyond that guarantee.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get_workspace(&self, id: WorkspaceId) -> StorageResult<Workspace>;
    async fn put_workspace(&self, workspace: &Workspace) -> StorageResult<()>;
    async fn delete_workspace(&self, id: WorkspaceId) -> StorageResult<()>;
    async fn find_workspace_by_name(
        &self,
        project: ProjectId,
        name: &str,
    ) -> StorageResult<Option<Workspace>>;
    async fn list_workspaces_by_project(&self, project: ProjectId) -> StorageResult<Vec<Workspace>>;
    /// Every workspace in the store, across all projects — backs the
    /// idle-scan and cost-reconciliation background loops, which operate
    /// orchestrator-wide rather than per-project.
    async fn list_all_workspaces(&self) -> StorageResult<Vec<Workspace>>;

    async fn get_volume(&self, id: VolumeId) -> StorageResult<StorageVolume>;
    async fn put_volume(&self, volume: &StorageVolume) -> StorageResult<()>;
    async fn delete_volume(&self, id: VolumeId) -> StorageResult<()>;
    async fn list_volumes_by_attachment(
        &self,
        workspace: WorkspaceId,
    ) -> StorageResult<Vec<StorageVolume>>;
    /// Every volume in the store, shared and workspace-scoped alike —
    /// backs `GET /volumes/shared` and `GET /volumes/workspace`, which
    /// filter this list by [`StorageVolume::kind`](crate::types::StorageVolume::kind).
    async fn list_all_volumes(&self) -> StorageResult<Vec<StorageVolume>>;

    async fn get_project(&self, id: ProjectId) -> StorageResult<Project>;
    async fn put_project(&self, project: &Project) -> StorageResult<()>;
    async fn delete_project(&self, id: ProjectId) -> StorageResult<()>;
    async fn list_projects_by_member(&self, principal: &str) -> StorageResult<Vec<Project>>;
    /// Every project in the store — backs `GET /projects` and the
    /// budget-scan loop, both of which enumerate orchestrator-wide.
    async fn list_all_projects(&self) -> StorageResult<Vec<Project>>;

    async fn get_template(&self, id: TemplateId) -> StorageResult<Template>;
    async fn put_template(&self, template: &Template) -> StorageResult<()>;
    async fn delete_template(&self, id: TemplateId) -> StorageResult<()>;
    async fn find_template_by_name(&self, name: &str) -> StorageResult<Option<Template>>;
    /// Every template saved to the store by `save_as_template` — distinct
    /// from the file-based templates `TemplateResolver` discovers, which
    /// never round-trip through here. `GET /templates` merges both sets.
    async fn list_all_templates(&self) -> StorageResult<Vec<Template>>;

    async fn get_idle_policy(&self, id: IdlePolicyId) -> StorageResult<IdlePolicy>;
    async fn put_idle_policy(&self, policy: &IdlePolicy) -> StorageResult<()>;
    async fn delete_idle_policy(&self, id: IdlePolicyId) -> StorageResult<()>;
    /// Every user-defined idle policy saved in the store (as opposed to
    /// the template-embedded defaults `TemplateResolver` knows about) —
    /// backs `GET /idle/policies`.
    async fn list_all_idle_policies(&self) -> StorageResult<Vec<IdlePolicy>>;

    async fn get_budget(&self, id: BudgetId) -> StorageResult<Budget>;
    async fn put_budget(&self, budget: &Budget) -> StorageResult<()>;
    async fn delete_budget(&self, id: BudgetId) -> StorageResult<()>;
    async fn find_budget_by_project(&self, project: ProjectId) -> StorageResult<Option<Budget>>;

    /// Atomically mark a workspace running and append its newest applied
    /// template layer in one commit — the canonical example of the
    /// "transactional multi-entity update" requirement,
    /// since both fields live on the same record but must never be
    /// observed half-written by a concurrent reader.
    async fn commit_workspace_running(
        &self,
        workspace: &Workspace,
    ) -> StorageResult<()> {
        self.put_workspace(workspace).await
    }
}

/// `SurrealDB`-backed [`StateStore`].
pub struct SurrealStateStore {
    db: Database,
}

impl SurrealStateStore {
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    async fn select<T: DeserializeOwned>(&self, table: &str, id: &str) -> StorageResult<T> {
        let record: Option<T> = self
            .db
            .client()
            .select((table, id))
            .await
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        record.ok_or_else(|| StorageError::NotFound(format!("{table}:{id}")))
    }

    async fn upsert<T: Serialize + Send + 'static>(
        &self,
        table: &str,
        id: &str,
        value: &T,
    ) -> StorageResult<()> {
        let content = serde_json::to_value(value)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.db
            .client()
            .upsert::<Option<serde_json::Value>>((table, id))
            .content(content)
            .await
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn remove(&self, table: &str, id: &str) -> StorageResult<()> {
        self.db
            .client()
            .delete::<Option<serde_json::Value>>((table, id))
            .await
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn select_all<T: DeserializeOwned>(&self, table: &str) -> StorageResult<Vec<T>> {
        self.db
            .client()
            .select(table)
            .await
            .map_err(|e| StorageError::Internal(e.to_string()))
    }

    async fn query_all<T: DeserializeOwned, B: Serialize + Send + 'static>(
        &self,
        table: &str,
        filter_sql: &str,
        binding_name: &str,
        binding_value: B,
    ) -> StorageResult<Vec<T>> {
        let sql = format!("SELECT * FROM type::table($table) WHERE {filter_sql}");
        let mut response = self
            .db
            .client()
            .query(sql)
            .bind(("table", table.to_owned()))
            .bind((binding_name.to_owned(), binding_value))
            .await
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        response
            .take(0)
            .map_err(|e| StorageError::Internal(e.to_string()))
    }
}

#[async_trait]
impl StateStore for SurrealStateStore {
    async fn get_workspace(&self, id: WorkspaceId) -> StorageResult<Workspace> {
        self.select(table::WORKSPACE, &id.to_string()).await
    }

    async fn put_workspace(&self, workspace: &Workspace) -> StorageResult<()> {
        self.upsert(table::WORKSPACE, &workspace.id.to_string(), workspace)
            .await
    }

    async fn delete_workspace(&self, id: WorkspaceId) -> StorageResult<()> {
        self.remove(table::WORKSPACE, &id.to_string()).await
    }

    async fn find_workspace_by_name(
        &self,
        project: ProjectId,
        name: &str,
    ) -> StorageResult<Option<Workspace>> {
        let all: Vec<Workspace> = self
            .query_all(
                table::WORKSPACE,
                "project_ref = $project AND name = $name",
                "project",
                project.to_string(),
            )
            .await?;
        Ok(all.into_iter().find(|w| w.name == name))
    }

    async fn list_workspaces_by_project(&self, project: ProjectId) -> StorageResult<Vec<Workspace>> {
        self.query_all(
            table::WORKSPACE,
            "project_ref = $project",
            "project",
            project.to_string(),
        )
        .await
    }

    async fn list_all_workspaces(&self) -> StorageResult<Vec<Workspace>> {
        self.select_all(table::WORKSPACE).await
    }

    async fn get_volume(&self, id: VolumeId) -> StorageResult<StorageVolume> {
        self.select(table::VOLUME, &id.to_string()).await
    }

    async fn put_volume(&self, volume: &StorageVolume) -> StorageResult<()> {
        self.upsert(table::VOLUME, &volume.id().to_string(), volume)
            .await
    }

    async fn delete_volume(&self, id: VolumeId) -> StorageResult<()> {
        self.remove(table::VOLUME, &id.to_string()).await
    }

    async fn list_volumes_by_attachment(
        &self,
        workspace: WorkspaceId,
    ) -> StorageResult<Vec<StorageVolume>> {
        let all: Vec<StorageVolume> = self
            .query_all(
                table::VOLUME,
                "attached_to = $workspace OR mounted_on CONTAINSANY [$workspace]",
                "workspace",
                workspace.to_string(),
            )
            .await?;
        Ok(all)
    }

    async fn list_all_volumes(&self) -> StorageResult<Vec<StorageVolume>> {
        self.select_all(table::VOLUME).await
    }

    async fn get_project(&self, id: ProjectId) -> StorageResult<Project> {
        self.select(table::PROJECT, &id.to_string()).await
    }

    async fn put_project(&self, project: &Project) -> StorageResult<()> {
        self.upsert(table::PROJECT, &project.id.to_string(), project)
            .await
    }

    async fn delete_project(&self, id: ProjectId) -> StorageResult<()> {
        self.remove(table::PROJECT, &id.to_string()).await
    }

    async fn list_projects_by_member(&self, principal: &str) -> StorageResult<Vec<Project>> {
        self.query_all(
            table::PROJECT,
            "members CONTAINS $principal",
            "principal",
            principal.to_owned(),
        )
        .await
    }

    async fn list_all_projects(&self) -> StorageResult<Vec<Project>> {
        self.select_all(table::PROJECT).await
    }

    async fn get_template(&self, id: TemplateId) -> StorageResult<Template> {
        self.select(table::TEMPLATE, &id.to_string()).await
    }

    async fn put_template(&self, template: &Template) -> StorageResult<()> {
        self.upsert(table::TEMPLATE, &template.id.to_string(), template)
            .await
    }

    async fn delete_template(&self, id: TemplateId) -> StorageResult<()> {
        self.remove(table::TEMPLATE, &id.to_string()).await
    }

    async fn find_template_by_name(&self, name: &str) -> StorageResult<Option<Template>> {
        let all: Vec<Template> = self
            .query_all(table::TEMPLATE, "name = $name", "name", name.to_owned())
            .await?;
        Ok(all.into_iter().next())
    }

    async fn list_all_templates(&self) -> StorageResult<Vec<Template>> {
        self.select_all(table::TEMPLATE).await
    }

    async fn get_idle_policy(&self, id: IdlePolicyId) -> StorageResult<IdlePolicy> {
        self.select(table::IDLE_POLICY, &id.to_string()).await
    }

    async fn put_idle_policy(&self, policy: &IdlePolicy) -> StorageResult<()> {
        self.upsert(table::IDLE_POLICY, &policy.id.to_string(), policy)
            .await
    }

    async fn delete_idle_policy(&self, id: IdlePolicyId) -> StorageResult<()> {
        self.remove(table::IDLE_POLICY, &id.to_string()).await
    }

    async fn list_all_idle_policies(&self) -> StorageResult<Vec<IdlePolicy>> {
        self.select_all(table::IDLE_POLICY).await
    }

    async fn get_budget(&self, id: BudgetId) -> StorageResult<Budget> {
        self.select(table::BUDGET, &id.to_string()).await
    }

    async fn put_budget(&self, budget: &Budget) -> StorageResult<()> {
        self.upsert(table::BUDGET, &budget.id.to_string(), budget)
            .await
    }

    async fn delete_budget(&self, id: BudgetId) -> StorageResult<()> {
        self.remove(table::BUDGET, &id.to_string()).await
    }

    async fn find_budget_by_project(&self, project: ProjectId) -> StorageResult<Option<Budget>> {
        let all: Vec<Budget> = self
            .query_all(
                table::BUDGET,
                "project_ref = $project",
                "project",
                project.to_string(),
            )
            .await?;
        Ok(all.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        Architecture, LifecycleMode, SizeClass, WorkspaceState, SCHEMA_VERSION,
    };
    use basecamp_core::ids::TemplateId;

    async fn memory_store() -> SurrealStateStore {
        let db = Database::connect_memory()
            .await
            .expect("in-memory surrealdb connects");
        SurrealStateStore::new(db)
    }

    fn sample_workspace(project: ProjectId) -> Workspace {
        Workspace {
            schema_version: SCHEMA_VERSION,
            id: WorkspaceId::new(),
            name: "ws-alpha".into(),
            template_ref: TemplateId::new(),
            size_class: SizeClass::M,
            architecture: Architecture::X86_64,
            lifecycle: LifecycleMode::OnDemand,
            state: WorkspaceState::Provisioning,
            region: "us-east-1".into(),
            provider_instance_id: None,
            public_ip: None,
            private_ip: None,
            launched_at: None,
            hourly_rate: 0.4,
            accumulated_cost: 0.0,
            attached_shared_volumes: vec![],
            attached_workspace_volumes: vec![],
            applied_template_layers: vec![],
            idle_policy_ref: None,
            project_ref: Some(project),
            owner_principal: "alice".into(),
            provisioning_script_digest: "deadbeef".into(),
            hibernation_fallback: true,
        }
    }

    #[tokio::test]
    async fn put_then_get_roundtrips() {
        let store = memory_store().await;
        let project = ProjectId::new();
        let ws = sample_workspace(project);

        store.put_workspace(&ws).await.unwrap();
        let fetched = store.get_workspace(ws.id).await.unwrap();
        assert_eq!(fetched.name, "ws-alpha");
        assert_eq!(fetched.project_ref, Some(project));
    }

    #[tokio::test]
    async fn get_missing_workspace_is_not_found() {
        let store = memory_store().await;
        let err = store.get_workspace(WorkspaceId::new()).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn find_by_name_within_project() {
        let store = memory_store().await;
        let project = ProjectId::new();
        let ws = sample_workspace(project);
        store.put_workspace(&ws).await.unwrap();

        let found = store
            .find_workspace_by_name(project, "ws-alpha")
            .await
            .unwrap();
        assert!(found.is_some());

        let missing = store
            .find_workspace_by_name(ProjectId::new(), "ws-alpha")
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn delete_removes_record() {
        let store = memory_store().await;
        let ws = sample_workspace(ProjectId::new());
        store.put_workspace(&ws).await.unwrap();
        store.delete_workspace(ws.id).await.unwrap();
        assert!(store.get_workspace(ws.id).await.is_err());
    }

    #[tokio::test]
    async fn list_all_workspaces_spans_projects() {
        let store = memory_store().await;
        store.put_workspace(&sample_workspace(ProjectId::new())).await.unwrap();
        store.put_workspace(&sample_workspace(ProjectId::new())).await.unwrap();

        let all = store.list_all_workspaces().await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn list_all_volumes_spans_kinds() {
        let store = memory_store().await;
        store
            .put_volume(&StorageVolume::Shared {
                schema_version: crate::types::SCHEMA_VERSION,
                id: VolumeId::new(),
                name: "datasets".into(),
                region: "us-east-1".into(),
                state: "available".into(),
                creation_time: chrono::Utc::now(),
                size_bytes: Some(1 << 30),
                mounted_on: Vec::new(),
                provider_volume_id: "vol-shared0001".into(),
            })
            .await
            .unwrap();
        store
            .put_volume(&StorageVolume::Workspace {
                schema_version: crate::types::SCHEMA_VERSION,
                id: VolumeId::new(),
                name: "scratch".into(),
                region: "us-east-1".into(),
                state: "available".into(),
                creation_time: chrono::Utc::now(),
                size_gb: 100,
                volume_type: "gp3".into(),
                iops: None,
                throughput: None,
                attached_to: None,
                provider_volume_id: "vol-ws0001".into(),
            })
            .await
            .unwrap();

        let all = store.list_all_volumes().await.unwrap();
        assert_eq!(all.len(), 2);
    }
}
