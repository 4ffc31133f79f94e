//! Project CRUD and membership management.

use std::sync::Arc;

use basecamp_core::ids::ProjectId;
use basecamp_storage::{Member, Project, ProjectRole, StateStore};
use tracing::{info, warn};

use crate::error::{IdentityError, IdentityResult};

/// Project membership and lifecycle operations over a [`StateStore`].
///
/// Holds no state of its own — every call reads and writes through to the
/// shared store, matching the rest of the orchestrator's components.
pub struct ProjectService {
    store: Arc<dyn StateStore>,
}

impl ProjectService {
    /// Build a service over the given state store.
    #[must_use]
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// Create a new project with a single owner.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Storage`] if the write fails.
    pub async fn create_project(
        &self,
        name: impl Into<String>,
        owner: impl Into<String>,
    ) -> IdentityResult<Project> {
        let owner = owner.into();
        let project = Project {
            schema_version: basecamp_storage::SCHEMA_VERSION,
            id: ProjectId::new(),
            name: name.into(),
            owner: owner.clone(),
            members: vec![Member {
                principal: owner.clone(),
                role: ProjectRole::Owner,
            }],
            status: "active".to_owned(),
            budget: None,
            default_idle_policy: None,
            launch_blocked: false,
        };

        self.store.put_project(&project).await?;
        info!(project = %project.id, owner = %owner, "project created");
        Ok(project)
    }

    /// Fetch a project by id.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::ProjectNotFound`] if no such project exists.
    pub async fn get_project(&self, id: ProjectId) -> IdentityResult<Project> {
        self.store
            .get_project(id)
            .await
            .map_err(|_| IdentityError::ProjectNotFound(id))
    }

    /// List every project a principal belongs to, at any role.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Storage`] if the query fails.
    pub async fn list_projects_for(&self, principal: &str) -> IdentityResult<Vec<Project>> {
        Ok(self.store.list_projects_by_member(principal).await?)
    }

    /// Add a member to a project at the given role.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::AlreadyMember`] if the principal already
    /// belongs to the project, or a storage error.
    pub async fn add_member(
        &self,
        project_id: ProjectId,
        principal: impl Into<String>,
        role: ProjectRole,
    ) -> IdentityResult<Project> {
        let principal = principal.into();
        let mut project = self.get_project(project_id).await?;

        if project.members.iter().any(|m| m.principal == principal) {
            return Err(IdentityError::AlreadyMember {
                principal,
                project: project_id,
            });
        }

        project.members.push(Member {
            principal: principal.clone(),
            role,
        });
        self.store.put_project(&project).await?;
        info!(project = %project_id, %principal, ?role, "member added");
        Ok(project)
    }

    /// Change a member's role.
    ///
    /// Role changes take effect immediately for new commands; any command
    /// already in flight retains the authorization it captured at dispatch
    /// time.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::NotMember`] if the principal isn't a
    /// member, or [`IdentityError::LastOwner`] if this change would leave
    /// the project without an owner.
    pub async fn change_role(
        &self,
        project_id: ProjectId,
        principal: &str,
        new_role: ProjectRole,
    ) -> IdentityResult<Project> {
        let mut project = self.get_project(project_id).await?;

        let demoting_sole_owner = new_role != ProjectRole::Owner
            && project
                .members
                .iter()
                .filter(|m| m.role == ProjectRole::Owner)
                .count()
                == 1
            && project
                .members
                .iter()
                .any(|m| m.principal == principal && m.role == ProjectRole::Owner);
        if demoting_sole_owner {
            return Err(IdentityError::LastOwner {
                principal: principal.to_owned(),
                project: project_id,
            });
        }

        let member = project
            .members
            .iter_mut()
            .find(|m| m.principal == principal)
            .ok_or_else(|| IdentityError::NotMember {
                principal: principal.to_owned(),
                project: project_id,
            })?;
        member.role = new_role;

        self.store.put_project(&project).await?;
        info!(project = %project_id, %principal, ?new_role, "member role changed");
        Ok(project)
    }

    /// Remove a member from a project.
    ///
    /// By default, preserves any artifacts the member owns (workspaces
    /// with `owner_principal == principal` are left untouched); pass
    /// `force = true` to bypass this check and remove destructively.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::NotMember`], [`IdentityError::LastOwner`],
    /// or [`IdentityError::OwnedArtifactsRemain`] (unless `force`).
    pub async fn remove_member(
        &self,
        project_id: ProjectId,
        principal: &str,
        force: bool,
    ) -> IdentityResult<Project> {
        let mut project = self.get_project(project_id).await?;

        let member_idx = project
            .members
            .iter()
            .position(|m| m.principal == principal)
            .ok_or_else(|| IdentityError::NotMember {
                principal: principal.to_owned(),
                project: project_id,
            })?;

        if project.members[member_idx].role == ProjectRole::Owner
            && project
                .members
                .iter()
                .filter(|m| m.role == ProjectRole::Owner)
                .count()
                == 1
        {
            return Err(IdentityError::LastOwner {
                principal: principal.to_owned(),
                project: project_id,
            });
        }

        if !force {
            let owns_workspaces = self
                .store
                .list_workspaces_by_project(project_id)
                .await?
                .iter()
                .any(|ws| ws.owner_principal == principal);
            if owns_workspaces {
                return Err(IdentityError::OwnedArtifactsRemain {
                    principal: principal.to_owned(),
                    project: project_id,
                });
            }
        } else {
            warn!(project = %project_id, %principal, "force-removing member with owned artifacts");
        }

        project.members.remove(member_idx);
        self.store.put_project(&project).await?;
        info!(project = %project_id, %principal, "member removed");
        Ok(project)
    }
}

#[cfg(test)]
mod tests {
    use basecamp_storage::{Database, SurrealStateStore};

    use super::*;

    async fn service() -> ProjectService {
        let db = Database::connect_memory().await.unwrap();
        ProjectService::new(Arc::new(SurrealStateStore::new(db)))
    }

    #[tokio::test]
    async fn create_project_has_single_owner() {
        let svc = service().await;
        let project = svc.create_project("genomics", "alice").await.unwrap();
        assert_eq!(project.members.len(), 1);
        assert_eq!(project.members[0].role, ProjectRole::Owner);
    }

    #[tokio::test]
    async fn add_member_then_list_for_principal() {
        let svc = service().await;
        let project = svc.create_project("genomics", "alice").await.unwrap();
        svc.add_member(project.id, "bob", ProjectRole::Member)
            .await
            .unwrap();

        let found = svc.list_projects_for("bob").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, project.id);
    }

    #[tokio::test]
    async fn adding_existing_member_is_rejected() {
        let svc = service().await;
        let project = svc.create_project("genomics", "alice").await.unwrap();
        let err = svc
            .add_member(project.id, "alice", ProjectRole::Member)
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::AlreadyMember { .. }));
    }

    #[tokio::test]
    async fn cannot_demote_sole_owner() {
        let svc = service().await;
        let project = svc.create_project("genomics", "alice").await.unwrap();
        let err = svc
            .change_role(project.id, "alice", ProjectRole::Admin)
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::LastOwner { .. }));
    }

    #[tokio::test]
    async fn cannot_remove_sole_owner() {
        let svc = service().await;
        let project = svc.create_project("genomics", "alice").await.unwrap();
        let err = svc.remove_member(project.id, "alice", false).await.unwrap_err();
        assert!(matches!(err, IdentityError::LastOwner { .. }));
    }

    #[tokio::test]
    async fn removing_nonmember_fails() {
        let svc = service().await;
        let project = svc.create_project("genomics", "alice").await.unwrap();
        let err = svc
            .remove_member(project.id, "carol", false)
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::NotMember { .. }));
    }

    #[tokio::test]
    async fn role_change_takes_effect_for_non_owner() {
        let svc = service().await;
        let project = svc.create_project("genomics", "alice").await.unwrap();
        svc.add_member(project.id, "bob", ProjectRole::Viewer)
            .await
            .unwrap();
        let updated = svc
            .change_role(project.id, "bob", ProjectRole::Admin)
            .await
            .unwrap();
        let bob = updated.members.iter().find(|m| m.principal == "bob").unwrap();
        assert_eq!(bob.role, ProjectRole::Admin);
    }
}
