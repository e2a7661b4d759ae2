//! Task repository: maps between remote rows and the in-memory task
//! graph, and persists mutations back.
//!
//! `list_all` returns the full collection each time; there is no
//! incremental diffing, and callers must replace their entire local
//! copy with the result. All mutating operations are asynchronous and
//! fail with `Error::Persistence`; rollback of any optimistic display
//! state and user-visible reporting are the caller's responsibility
//! (see [`crate::sync`]).

use std::collections::HashMap;

use chrono::Utc;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::fields::{Priority, Status};
use crate::store::*;
use crate::task::{round_ratio, Comment, SubTask, Task};

/// Fields required to create a task.
///
/// Title, assignee and due date must be present. The repository does
/// not re-check this on `create_task`; validation happens at the call
/// site, before any network traffic, via [`NewTask::validate`].
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub status: Status,
    pub priority: Priority,
    pub assignee: String,
    pub due: chrono::NaiveDate,
    pub progress: u8,
    pub tags: Vec<String>,
}

impl NewTask {
    /// Check the required fields. Call this before
    /// [`TaskRepository::create_task`].
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::missing("title"));
        }
        if self.assignee.trim().is_empty() {
            return Err(Error::missing("assignee"));
        }
        Ok(())
    }
}

/// Data-access layer over a [`RemoteStore`].
#[derive(Clone)]
pub struct TaskRepository<S> {
    store: S,
}

impl<S: RemoteStore> TaskRepository<S> {
    pub fn new(store: S) -> Self {
        TaskRepository { store }
    }

    /// Fetch the full task collection with sub-tasks and comments
    /// joined and assignee/author ids resolved to display names.
    pub async fn list_all(&self) -> Result<Vec<Task>> {
        let profiles = self.store.fetch_profiles().await?;
        let task_rows = self.store.fetch_tasks().await?;
        let sub_task_rows = self.store.fetch_sub_tasks().await?;
        let comment_rows = self.store.fetch_comments().await?;

        let names: HashMap<&str, &str> = profiles
            .iter()
            .map(|p| (p.id.as_str(), p.name.as_str()))
            .collect();
        let resolve = |id: &Option<String>| -> Option<String> {
            id.as_deref().and_then(|i| names.get(i)).map(|n| n.to_string())
        };

        let mut sub_tasks: HashMap<String, Vec<SubTask>> = HashMap::new();
        for row in &sub_task_rows {
            sub_tasks.entry(row.task_id.clone()).or_default().push(SubTask {
                id: row.id.clone(),
                title: row.title.clone(),
                completed: row.completed,
                assignee: resolve(&row.assignee_id),
                memo: row.memo.clone(),
            });
        }
        let mut comments: HashMap<String, Vec<Comment>> = HashMap::new();
        for row in &comment_rows {
            comments.entry(row.task_id.clone()).or_default().push(Comment {
                id: row.id.clone(),
                author: resolve(&row.author_id),
                content: row.content.clone(),
                created_at: row.created_at,
            });
        }

        let tasks = task_rows
            .into_iter()
            .map(|row| Task {
                sub_tasks: sub_tasks.remove(&row.id).unwrap_or_default(),
                comments: comments.remove(&row.id).unwrap_or_default(),
                id: row.id,
                title: row.title,
                description: row.description,
                status: row.status,
                priority: row.priority,
                assignee: resolve(&row.assignee_id),
                due: row.due_date,
                created_at: row.created_at,
                progress: row.progress,
                tags: row.tags,
            })
            .collect();
        debug!("refreshed task collection from remote store");
        Ok(tasks)
    }

    /// Resolve an assignee display name to its profile id. Matching is
    /// by exact name; if two profiles share a display name the first
    /// (by name ordering) wins, which is logged since filtering and
    /// grouping elsewhere depend on the same name matching.
    pub async fn resolve_assignee(&self, name: &str) -> Result<String> {
        let profiles = self.store.fetch_profiles().await?;
        let matches: Vec<&ProfileRow> = profiles.iter().filter(|p| p.name == name).collect();
        if matches.len() > 1 {
            warn!(name, "multiple profiles share this display name; using the first");
        }
        matches
            .first()
            .map(|p| p.id.clone())
            .ok_or_else(|| Error::Validation(format!("no team member named '{name}'")))
    }

    /// Persist a new task. Precondition: `new` passed
    /// [`NewTask::validate`].
    pub async fn create_task(&self, new: &NewTask) -> Result<Task> {
        let assignee_id = self.resolve_assignee(&new.assignee).await?;
        let row = TaskRow {
            id: new_id(),
            title: new.title.clone(),
            description: new.description.clone(),
            status: new.status,
            priority: new.priority,
            assignee_id: Some(assignee_id),
            due_date: new.due,
            progress: new.progress,
            tags: new.tags.clone(),
            created_at: Utc::now(),
        };
        self.store.insert_task(&row).await?;
        Ok(Task {
            id: row.id,
            title: row.title,
            description: row.description,
            status: row.status,
            priority: row.priority,
            assignee: Some(new.assignee.clone()),
            due: row.due_date,
            created_at: row.created_at,
            progress: row.progress,
            sub_tasks: Vec::new(),
            comments: Vec::new(),
            tags: row.tags,
        })
    }

    /// Update task fields.
    pub async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<()> {
        self.store.update_task(id, patch).await
    }

    /// Delete a task. Sub-tasks and comments cascade away at the remote
    /// store; nothing is orchestrated here.
    pub async fn delete_task(&self, id: &str) -> Result<()> {
        self.store.delete_task(id).await
    }

    /// Append a comment authored by the named team member.
    pub async fn add_comment(&self, task_id: &str, author: &str, content: &str) -> Result<Comment> {
        let author_id = self.resolve_assignee(author).await?;
        let row = CommentRow {
            id: new_id(),
            task_id: task_id.to_string(),
            author_id: Some(author_id),
            content: content.to_string(),
            created_at: Utc::now(),
        };
        self.store.insert_comment(&row).await?;
        Ok(Comment {
            id: row.id,
            author: Some(author.to_string()),
            content: row.content,
            created_at: row.created_at,
        })
    }

    /// Create a sub-task under the given task.
    pub async fn add_sub_task(
        &self,
        task_id: &str,
        title: &str,
        assignee: Option<&str>,
    ) -> Result<SubTask> {
        let assignee_id = match assignee {
            Some(name) => Some(self.resolve_assignee(name).await?),
            None => None,
        };
        let row = SubTaskRow {
            id: new_id(),
            task_id: task_id.to_string(),
            title: title.to_string(),
            completed: false,
            assignee_id,
            memo: None,
        };
        self.store.insert_sub_task(&row).await?;
        Ok(SubTask {
            id: row.id,
            title: row.title,
            completed: false,
            assignee: assignee.map(str::to_string),
            memo: None,
        })
    }

    /// Flip a sub-task's completion and persist the parent's progress
    /// as the rounded completed/total percentage.
    pub async fn update_sub_task_completion(
        &self,
        task_id: &str,
        sub_task_id: &str,
        completed: bool,
    ) -> Result<()> {
        let patch = SubTaskPatch {
            completed: Some(completed),
            ..SubTaskPatch::default()
        };
        self.store.update_sub_task(sub_task_id, &patch).await?;

        let siblings: Vec<SubTaskRow> = self
            .store
            .fetch_sub_tasks()
            .await?
            .into_iter()
            .filter(|st| st.task_id == task_id)
            .collect();
        let done = siblings.iter().filter(|st| st.completed).count();
        let progress = round_ratio(done, siblings.len());
        let task_patch = TaskPatch {
            progress: Some(progress),
            ..TaskPatch::default()
        };
        self.store.update_task(task_id, &task_patch).await
    }

    /// Reassign a sub-task to another team member.
    pub async fn update_sub_task_assignee(&self, sub_task_id: &str, assignee: &str) -> Result<()> {
        let assignee_id = self.resolve_assignee(assignee).await?;
        let patch = SubTaskPatch {
            assignee_id: Some(assignee_id),
            ..SubTaskPatch::default()
        };
        self.store.update_sub_task(sub_task_id, &patch).await
    }

    /// Replace a sub-task's memo.
    pub async fn update_sub_task_memo(&self, sub_task_id: &str, memo: &str) -> Result<()> {
        let patch = SubTaskPatch {
            memo: Some(memo.to_string()),
            ..SubTaskPatch::default()
        };
        self.store.update_sub_task(sub_task_id, &patch).await
    }

    /// Delete a sub-task.
    pub async fn delete_sub_task(&self, sub_task_id: &str) -> Result<()> {
        self.store.delete_sub_task(sub_task_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Role;
    use crate::memory::MemoryStore;
    use chrono::NaiveDate;

    fn new_task(title: &str, assignee: &str) -> NewTask {
        NewTask {
            title: title.to_string(),
            description: String::new(),
            status: Status::Todo,
            priority: Priority::Medium,
            assignee: assignee.to_string(),
            due: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            progress: 0,
            tags: Vec::new(),
        }
    }

    #[test]
    fn validation_rejects_missing_required_fields() {
        let mut nt = new_task("", "Kim");
        assert!(nt.validate().is_err());
        nt.title = "Spec review".into();
        nt.assignee = " ".into();
        assert!(nt.validate().is_err());
        nt.assignee = "Kim".into();
        assert!(nt.validate().is_ok());
    }

    #[tokio::test]
    async fn created_task_appears_in_list_all() {
        let store = MemoryStore::new();
        store.seed_profile("Kim", Role::User);
        let repo = TaskRepository::new(store);

        let nt = new_task("Spec review", "Kim");
        nt.validate().unwrap();
        repo.create_task(&nt).await.unwrap();

        let tasks = repo.list_all().await.unwrap();
        assert_eq!(tasks.len(), 1);
        let task = &tasks[0];
        assert_eq!(task.title, "Spec review");
        assert_eq!(task.assignee.as_deref(), Some("Kim"));
        assert_eq!(task.due, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(task.progress, 0);
        assert!(task.sub_tasks.is_empty());
        assert!(task.comments.is_empty());
    }

    #[tokio::test]
    async fn unknown_assignee_is_a_validation_error() {
        let store = MemoryStore::new();
        let repo = TaskRepository::new(store);
        let err = repo.create_task(&new_task("t", "Nobody")).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn deleting_a_task_cascades_sub_tasks_and_comments() {
        let store = MemoryStore::new();
        store.seed_profile("Kim", Role::User);
        let repo = TaskRepository::new(store.clone());

        let task = repo.create_task(&new_task("cleanup", "Kim")).await.unwrap();
        repo.add_sub_task(&task.id, "step one", Some("Kim")).await.unwrap();
        repo.add_comment(&task.id, "Kim", "starting").await.unwrap();

        repo.delete_task(&task.id).await.unwrap();

        let tasks = repo.list_all().await.unwrap();
        assert!(tasks.is_empty());
        assert!(store.sub_task_rows().is_empty());
        assert!(store.comment_rows().is_empty());
    }

    #[tokio::test]
    async fn completion_change_persists_rounded_progress() {
        let store = MemoryStore::new();
        store.seed_profile("Kim", Role::User);
        let repo = TaskRepository::new(store.clone());

        let task = repo.create_task(&new_task("release", "Kim")).await.unwrap();
        let mut ids = Vec::new();
        for i in 0..4 {
            let st = repo
                .add_sub_task(&task.id, &format!("step {i}"), None)
                .await
                .unwrap();
            ids.push(st.id);
        }
        repo.update_sub_task_completion(&task.id, &ids[0], true)
            .await
            .unwrap();

        assert_eq!(store.task_rows()[0].progress, 25);
        let tasks = repo.list_all().await.unwrap();
        assert_eq!(tasks[0].progress, 25);
        assert_eq!(tasks[0].display_progress(), 25);
    }

    #[tokio::test]
    async fn comment_joins_with_author_name() {
        let store = MemoryStore::new();
        store.seed_profile("Kim", Role::User);
        store.seed_profile("Lee", Role::User);
        let repo = TaskRepository::new(store);

        let task = repo.create_task(&new_task("review", "Kim")).await.unwrap();
        repo.add_comment(&task.id, "Lee", "looks good").await.unwrap();

        let tasks = repo.list_all().await.unwrap();
        assert_eq!(tasks[0].comments.len(), 1);
        assert_eq!(tasks[0].comments[0].author.as_deref(), Some("Lee"));
        assert_eq!(tasks[0].comments[0].content, "looks good");
    }
}
