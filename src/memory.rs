//! In-memory stand-in for the remote store, used by tests.
//!
//! Behaves like the hosted store at the row level: task deletion
//! cascades to sub-tasks and comments, and the admin endpoints record
//! what they were asked to do. A single-shot failure can be armed to
//! simulate a rejected or dropped call.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::fields::Role;
use crate::store::*;

#[derive(Default)]
struct Tables {
    tasks: Vec<TaskRow>,
    sub_tasks: Vec<SubTaskRow>,
    comments: Vec<CommentRow>,
    profiles: Vec<ProfileRow>,
}

#[derive(Default)]
struct Inner {
    tables: Mutex<Tables>,
    fail_next: Mutex<Option<String>>,
    fail_next_fetch: Mutex<Option<String>>,
    deleted_accounts: Mutex<Vec<String>>,
    password_resets: Mutex<Vec<(String, String)>>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Arm a failure for the next store call.
    pub fn fail_next(&self, reason: &str) {
        *self.inner.fail_next.lock() = Some(reason.to_string());
    }

    /// Arm a failure for the next fetch, letting writes through.
    pub fn fail_next_fetch(&self, reason: &str) {
        *self.inner.fail_next_fetch.lock() = Some(reason.to_string());
    }

    fn gate(&self) -> Result<()> {
        if let Some(reason) = self.inner.fail_next.lock().take() {
            return Err(Error::Persistence(reason));
        }
        Ok(())
    }

    fn gate_fetch(&self) -> Result<()> {
        if let Some(reason) = self.inner.fail_next_fetch.lock().take() {
            return Err(Error::Persistence(reason));
        }
        Ok(())
    }

    /// Seed a profile and return its id.
    pub fn seed_profile(&self, name: &str, role: Role) -> String {
        let row = ProfileRow {
            id: new_id(),
            name: name.to_string(),
            role,
            phone: None,
            created_at: chrono::Utc::now(),
        };
        let id = row.id.clone();
        self.inner.tables.lock().profiles.push(row);
        id
    }

    pub fn task_rows(&self) -> Vec<TaskRow> {
        self.inner.tables.lock().tasks.clone()
    }

    pub fn sub_task_rows(&self) -> Vec<SubTaskRow> {
        self.inner.tables.lock().sub_tasks.clone()
    }

    pub fn comment_rows(&self) -> Vec<CommentRow> {
        self.inner.tables.lock().comments.clone()
    }

    pub fn profile_rows(&self) -> Vec<ProfileRow> {
        self.inner.tables.lock().profiles.clone()
    }

    pub fn deleted_accounts(&self) -> Vec<String> {
        self.inner.deleted_accounts.lock().clone()
    }

    pub fn password_resets(&self) -> Vec<(String, String)> {
        self.inner.password_resets.lock().clone()
    }
}

impl RemoteStore for MemoryStore {
    async fn fetch_tasks(&self) -> Result<Vec<TaskRow>> {
        self.gate()?;
        self.gate_fetch()?;
        let mut rows = self.inner.tables.lock().tasks.clone();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(rows)
    }

    async fn fetch_sub_tasks(&self) -> Result<Vec<SubTaskRow>> {
        self.gate()?;
        self.gate_fetch()?;
        Ok(self.inner.tables.lock().sub_tasks.clone())
    }

    async fn fetch_comments(&self) -> Result<Vec<CommentRow>> {
        self.gate()?;
        self.gate_fetch()?;
        let mut rows = self.inner.tables.lock().comments.clone();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(rows)
    }

    async fn fetch_profiles(&self) -> Result<Vec<ProfileRow>> {
        self.gate()?;
        self.gate_fetch()?;
        let mut rows = self.inner.tables.lock().profiles.clone();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn insert_task(&self, row: &TaskRow) -> Result<()> {
        self.gate()?;
        self.inner.tables.lock().tasks.push(row.clone());
        Ok(())
    }

    async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<()> {
        self.gate()?;
        let mut tables = self.inner.tables.lock();
        let row = tables
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::Persistence(format!("no task row {id}")))?;
        if let Some(title) = &patch.title {
            row.title = title.clone();
        }
        if let Some(description) = &patch.description {
            row.description = description.clone();
        }
        if let Some(status) = patch.status {
            row.status = status;
        }
        if let Some(priority) = patch.priority {
            row.priority = priority;
        }
        if let Some(assignee_id) = &patch.assignee_id {
            row.assignee_id = Some(assignee_id.clone());
        }
        if let Some(due_date) = patch.due_date {
            row.due_date = due_date;
        }
        if let Some(progress) = patch.progress {
            row.progress = progress;
        }
        if let Some(tags) = &patch.tags {
            row.tags = tags.clone();
        }
        Ok(())
    }

    async fn delete_task(&self, id: &str) -> Result<()> {
        self.gate()?;
        let mut tables = self.inner.tables.lock();
        tables.tasks.retain(|t| t.id != id);
        // Foreign-key cascade, as the hosted store does it.
        tables.sub_tasks.retain(|st| st.task_id != id);
        tables.comments.retain(|c| c.task_id != id);
        Ok(())
    }

    async fn insert_sub_task(&self, row: &SubTaskRow) -> Result<()> {
        self.gate()?;
        self.inner.tables.lock().sub_tasks.push(row.clone());
        Ok(())
    }

    async fn update_sub_task(&self, id: &str, patch: &SubTaskPatch) -> Result<()> {
        self.gate()?;
        let mut tables = self.inner.tables.lock();
        let row = tables
            .sub_tasks
            .iter_mut()
            .find(|st| st.id == id)
            .ok_or_else(|| Error::Persistence(format!("no sub-task row {id}")))?;
        if let Some(completed) = patch.completed {
            row.completed = completed;
        }
        if let Some(assignee_id) = &patch.assignee_id {
            row.assignee_id = Some(assignee_id.clone());
        }
        if let Some(memo) = &patch.memo {
            row.memo = Some(memo.clone());
        }
        Ok(())
    }

    async fn delete_sub_task(&self, id: &str) -> Result<()> {
        self.gate()?;
        self.inner.tables.lock().sub_tasks.retain(|st| st.id != id);
        Ok(())
    }

    async fn insert_comment(&self, row: &CommentRow) -> Result<()> {
        self.gate()?;
        self.inner.tables.lock().comments.push(row.clone());
        Ok(())
    }

    async fn insert_profile(&self, row: &ProfileRow) -> Result<()> {
        self.gate()?;
        self.inner.tables.lock().profiles.push(row.clone());
        Ok(())
    }

    async fn update_profile_role(&self, id: &str, role: Role) -> Result<()> {
        self.gate()?;
        let mut tables = self.inner.tables.lock();
        let row = tables
            .profiles
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::Persistence(format!("no profile row {id}")))?;
        row.role = role;
        Ok(())
    }

    async fn delete_profile(&self, id: &str) -> Result<()> {
        self.gate()?;
        self.inner.tables.lock().profiles.retain(|p| p.id != id);
        Ok(())
    }

    async fn unassign_tasks_of(&self, profile_id: &str) -> Result<()> {
        self.gate()?;
        for row in &mut self.inner.tables.lock().tasks {
            if row.assignee_id.as_deref() == Some(profile_id) {
                row.assignee_id = None;
            }
        }
        Ok(())
    }

    async fn unassign_sub_tasks_of(&self, profile_id: &str) -> Result<()> {
        self.gate()?;
        for row in &mut self.inner.tables.lock().sub_tasks {
            if row.assignee_id.as_deref() == Some(profile_id) {
                row.assignee_id = None;
            }
        }
        Ok(())
    }

    async fn delete_comments_by(&self, profile_id: &str) -> Result<()> {
        self.gate()?;
        self.inner
            .tables
            .lock()
            .comments
            .retain(|c| c.author_id.as_deref() != Some(profile_id));
        Ok(())
    }

    async fn reset_password(&self, user_id: &str, new_password: &str) -> Result<AdminResponse> {
        self.gate()?;
        self.inner
            .password_resets
            .lock()
            .push((user_id.to_string(), new_password.to_string()));
        Ok(AdminResponse {
            success: true,
            message: Some("password updated".into()),
            error: None,
        })
    }

    async fn delete_account(&self, user_id: &str) -> Result<AdminResponse> {
        self.gate()?;
        self.inner.deleted_accounts.lock().push(user_id.to_string());
        Ok(AdminResponse {
            success: true,
            message: Some("account removed".into()),
            error: None,
        })
    }
}
