//! Remote data store interface.
//!
//! The hosted store exposes four relational tables (`tasks`,
//! `sub_tasks`, `comments`, `profiles`) plus two admin serverless
//! endpoints. This module defines the row types mirroring those tables
//! and the [`RemoteStore`] trait the repository and team directory are
//! generic over. The HTTP implementation lives in [`crate::http`]; an
//! in-memory double for tests lives in [`crate::memory`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::fields::{Priority, Role, Status};

/// Row of the `tasks` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: Status,
    pub priority: Priority,
    pub assignee_id: Option<String>,
    pub due_date: NaiveDate,
    pub progress: u8,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Row of the `sub_tasks` table. `task_id` is a foreign key to
/// `tasks.id`; the remote store cascades the row away with its parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubTaskRow {
    pub id: String,
    pub task_id: String,
    pub title: String,
    pub completed: bool,
    pub assignee_id: Option<String>,
    pub memo: Option<String>,
}

/// Row of the `comments` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentRow {
    pub id: String,
    pub task_id: String,
    pub author_id: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Row of the `profiles` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRow {
    pub id: String,
    pub name: String,
    pub role: Role,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Partial update for a `tasks` row. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Partial update for a `sub_tasks` row.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SubTaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

/// Response of the two admin serverless endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Asynchronous CRUD surface of the hosted store.
///
/// Every call may fail with `Error::Persistence`; there is no retry,
/// batching, or cancellation here. Deleting a task cascades its
/// sub-tasks and comments on the remote side (foreign keys), so no
/// client-side orchestration is required for that case. The `unassign_*`
/// and `delete_comments_by` helpers back the member-removal routine.
#[allow(async_fn_in_trait)]
pub trait RemoteStore {
    async fn fetch_tasks(&self) -> Result<Vec<TaskRow>>;
    async fn fetch_sub_tasks(&self) -> Result<Vec<SubTaskRow>>;
    async fn fetch_comments(&self) -> Result<Vec<CommentRow>>;
    async fn fetch_profiles(&self) -> Result<Vec<ProfileRow>>;

    async fn insert_task(&self, row: &TaskRow) -> Result<()>;
    async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<()>;
    async fn delete_task(&self, id: &str) -> Result<()>;

    async fn insert_sub_task(&self, row: &SubTaskRow) -> Result<()>;
    async fn update_sub_task(&self, id: &str, patch: &SubTaskPatch) -> Result<()>;
    async fn delete_sub_task(&self, id: &str) -> Result<()>;

    async fn insert_comment(&self, row: &CommentRow) -> Result<()>;

    async fn insert_profile(&self, row: &ProfileRow) -> Result<()>;
    async fn update_profile_role(&self, id: &str, role: Role) -> Result<()>;
    async fn delete_profile(&self, id: &str) -> Result<()>;

    /// Null out `assignee_id` on every task assigned to the profile.
    async fn unassign_tasks_of(&self, profile_id: &str) -> Result<()>;
    /// Null out `assignee_id` on every sub-task assigned to the profile.
    async fn unassign_sub_tasks_of(&self, profile_id: &str) -> Result<()>;
    /// Delete every comment authored by the profile.
    async fn delete_comments_by(&self, profile_id: &str) -> Result<()>;

    /// Admin endpoint: update the named account's credential.
    /// Requires the caller to hold the admin role, verified server-side.
    async fn reset_password(&self, user_id: &str, new_password: &str) -> Result<AdminResponse>;
    /// Admin endpoint: irreversibly remove the named account from the
    /// authentication system. Verified server-side as well.
    async fn delete_account(&self, user_id: &str) -> Result<AdminResponse>;
}

/// Generate a fresh row id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
