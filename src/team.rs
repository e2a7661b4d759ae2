//! Team member administration.
//!
//! Registration, role changes, password resets and member removal are
//! admin-gated. The gate here is client-side and advisory only; the
//! two serverless account endpoints verify the admin role again
//! server-side before acting.
//!
//! Member removal is cascade-null-then-delete: the member's tasks and
//! sub-tasks are unassigned and their authored comments deleted before
//! the profile row goes, and finally the account is removed from the
//! authentication system. Earlier revisions of this product deleted or
//! soft-disabled profiles outright; this routine is the settled policy.

use chrono::Utc;
use tracing::info;

use crate::error::{Error, Result};
use crate::fields::Role;
use crate::store::{new_id, AdminResponse, ProfileRow, RemoteStore};
use crate::task::Profile;

const MIN_PASSWORD_LEN: usize = 6;

/// Admin surface over the `profiles` table and the account endpoints.
#[derive(Clone)]
pub struct TeamDirectory<S> {
    store: S,
}

/// Client-side role gate. Advisory: a non-admin caller is stopped
/// before any network traffic, but the server no longer trusts this.
pub fn require_admin(actor: &Profile) -> Result<()> {
    if actor.role != Role::Admin {
        return Err(Error::Authorization(format!(
            "'{}' holds the {:?} role",
            actor.name, actor.role
        )));
    }
    Ok(())
}

impl<S: RemoteStore> TeamDirectory<S> {
    pub fn new(store: S) -> Self {
        TeamDirectory { store }
    }

    /// All team members, sorted by display name.
    pub async fn list(&self) -> Result<Vec<Profile>> {
        let mut profiles: Vec<Profile> = self
            .store
            .fetch_profiles()
            .await?
            .into_iter()
            .map(|row| Profile {
                id: row.id,
                name: row.name,
                role: row.role,
                phone: row.phone,
                created_at: row.created_at,
            })
            .collect();
        profiles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(profiles)
    }

    /// Look up a member by display name.
    pub async fn find_by_name(&self, name: &str) -> Result<Profile> {
        self.list()
            .await?
            .into_iter()
            .find(|p| p.name == name)
            .ok_or_else(|| Error::Validation(format!("no team member named '{name}'")))
    }

    /// Register a new member. Admin only.
    pub async fn register(
        &self,
        actor: &Profile,
        name: &str,
        role: Role,
        phone: Option<&str>,
    ) -> Result<Profile> {
        require_admin(actor)?;
        if name.trim().is_empty() {
            return Err(Error::missing("name"));
        }
        let row = ProfileRow {
            id: new_id(),
            name: name.trim().to_string(),
            role,
            phone: phone.map(str::to_string),
            created_at: Utc::now(),
        };
        self.store.insert_profile(&row).await?;
        info!(name = row.name, "registered team member");
        Ok(Profile {
            id: row.id,
            name: row.name,
            role: row.role,
            phone: row.phone,
            created_at: row.created_at,
        })
    }

    /// Change a member's role. Admin only.
    pub async fn set_role(&self, actor: &Profile, profile_id: &str, role: Role) -> Result<()> {
        require_admin(actor)?;
        self.store.update_profile_role(profile_id, role).await
    }

    /// Reset a member's login credential through the admin endpoint.
    /// Admin only; the endpoint re-verifies the role server-side.
    pub async fn reset_password(
        &self,
        actor: &Profile,
        profile_id: &str,
        new_password: &str,
    ) -> Result<AdminResponse> {
        require_admin(actor)?;
        if new_password.len() < MIN_PASSWORD_LEN {
            return Err(Error::Validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        self.store.reset_password(profile_id, new_password).await
    }

    /// Remove a member completely. Admin only.
    ///
    /// Order matters: references are nulled or deleted first so no task
    /// or comment points at a missing profile, then the profile row and
    /// the account itself go.
    pub async fn remove(&self, actor: &Profile, member: &Profile) -> Result<AdminResponse> {
        require_admin(actor)?;
        info!(name = member.name, "removing team member");
        self.store.unassign_tasks_of(&member.id).await?;
        self.store.unassign_sub_tasks_of(&member.id).await?;
        self.store.delete_comments_by(&member.id).await?;
        self.store.delete_profile(&member.id).await?;
        self.store.delete_account(&member.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{Priority, Status};
    use crate::memory::MemoryStore;
    use crate::repo::{NewTask, TaskRepository};
    use chrono::NaiveDate;

    fn admin() -> Profile {
        Profile {
            id: "admin-1".into(),
            name: "Admin".into(),
            role: Role::Admin,
            phone: None,
            created_at: Utc::now(),
        }
    }

    fn plain_user() -> Profile {
        Profile {
            role: Role::User,
            ..admin()
        }
    }

    #[tokio::test]
    async fn non_admin_is_stopped_before_any_store_call() {
        let store = MemoryStore::new();
        let team = TeamDirectory::new(store.clone());
        let err = team
            .register(&plain_user(), "Park", Role::User, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Authorization(_)));
        assert!(store.profile_rows().is_empty());
    }

    #[tokio::test]
    async fn short_password_is_rejected_client_side() {
        let store = MemoryStore::new();
        let team = TeamDirectory::new(store.clone());
        let err = team
            .reset_password(&admin(), "someone", "abc")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(store.password_resets().is_empty());
    }

    #[tokio::test]
    async fn reset_password_calls_the_endpoint() {
        let store = MemoryStore::new();
        let team = TeamDirectory::new(store.clone());
        let outcome = team
            .reset_password(&admin(), "user-9", "secret99")
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(
            store.password_resets(),
            vec![("user-9".to_string(), "secret99".to_string())]
        );
    }

    #[tokio::test]
    async fn removal_unassigns_work_and_deletes_comments() {
        let store = MemoryStore::new();
        store.seed_profile("Kim", Role::User);
        store.seed_profile("Lee", Role::User);
        let repo = TaskRepository::new(store.clone());
        let team = TeamDirectory::new(store.clone());

        for i in 0..3 {
            let task = repo
                .create_task(&NewTask {
                    title: format!("task {i}"),
                    description: String::new(),
                    status: Status::Todo,
                    priority: Priority::Low,
                    assignee: "Kim".into(),
                    due: NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
                    progress: 0,
                    tags: Vec::new(),
                })
                .await
                .unwrap();
            repo.add_sub_task(&task.id, "step", Some("Kim")).await.unwrap();
            repo.add_comment(&task.id, "Kim", "on it").await.unwrap();
            repo.add_comment(&task.id, "Lee", "ack").await.unwrap();
        }

        let kim = team.find_by_name("Kim").await.unwrap();
        let outcome = team.remove(&admin(), &kim).await.unwrap();
        assert!(outcome.success);

        let tasks = repo.list_all().await.unwrap();
        assert_eq!(tasks.len(), 3);
        for task in &tasks {
            assert_eq!(task.assignee, None);
            assert_eq!(task.assignee_label(), "unassigned");
            for st in &task.sub_tasks {
                assert_eq!(st.assignee, None);
            }
            // Lee's comments survive; Kim's are gone.
            assert_eq!(task.comments.len(), 1);
            assert_eq!(task.comments[0].author.as_deref(), Some("Lee"));
        }
        assert!(team.find_by_name("Kim").await.is_err());
        assert_eq!(store.deleted_accounts(), vec![kim.id]);
    }
}
