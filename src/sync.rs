//! Optimistic update layer over the task repository.
//!
//! A UI-visible mutation (sub-task completion, assignee, memo; comment
//! or sub-task creation; deletion) takes effect immediately through a
//! pending overlay, before the repository call resolves. On success the
//! overlay entry is cleared and the authoritative list refreshed; on
//! failure the entry is removed so the display reverts, and exactly one
//! failure notice naming the field and entity is queued. Concurrent
//! edits from other sessions resolve last-writer-wins at the remote
//! store; there is no merge or conflict detection here on purpose.
//!
//! The authoritative list is shared state read by every view. Only
//! [`TaskSync::refresh`] replaces it, and always wholesale; views get
//! copies from [`TaskSync::snapshot`] and never mutate in place.

use std::collections::HashMap;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::error::Result;
use crate::repo::{NewTask, TaskRepository};
use crate::store::{new_id, RemoteStore, TaskPatch};
use crate::task::{Comment, SubTask, Task};

/// Prefix of client-generated ids for entities not yet persisted.
pub const TEMP_ID_PREFIX: &str = "temp_";

/// Outcome notification surfaced to the user exactly once per
/// attempted mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Failure(String),
}

impl Notice {
    pub fn message(&self) -> &str {
        match self {
            Notice::Success(m) | Notice::Failure(m) => m,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Notice::Failure(_))
    }
}

/// Pending local values for one field class, keyed by entity id.
///
/// The same shape serves completion (bool), assignee (optional name)
/// and memo (text): write on intent, clear on resolution, read-through
/// to the authoritative value when absent.
#[derive(Debug, Default)]
pub struct Pending<V> {
    map: HashMap<String, V>,
}

impl<V> Pending<V> {
    pub fn set(&mut self, id: &str, value: V) {
        self.map.insert(id.to_string(), value);
    }

    pub fn clear(&mut self, id: &str) {
        self.map.remove(id);
    }

    pub fn get(&self, id: &str) -> Option<&V> {
        self.map.get(id)
    }
}

#[derive(Default)]
struct Overlays {
    completed: Pending<bool>,
    assignee: Pending<Option<String>>,
    memo: Pending<String>,
    temp_sub_tasks: HashMap<String, Vec<SubTask>>,
    pending_comments: HashMap<String, Vec<Comment>>,
    hidden_sub_tasks: Vec<String>,
    hidden_tasks: Vec<String>,
}

impl Overlays {
    fn hide_sub_task(&mut self, id: &str) {
        self.hidden_sub_tasks.push(id.to_string());
    }

    fn unhide_sub_task(&mut self, id: &str) {
        self.hidden_sub_tasks.retain(|h| h != id);
    }

    fn hide_task(&mut self, id: &str) {
        self.hidden_tasks.push(id.to_string());
    }

    fn unhide_task(&mut self, id: &str) {
        self.hidden_tasks.retain(|h| h != id);
    }
}

/// Synchronisation hub: authoritative task list, pending overlays, and
/// the notice queue. All methods take `&self`; mutations on different
/// entities may be in flight at the same time and do not interfere.
pub struct TaskSync<S> {
    repo: TaskRepository<S>,
    tasks: RwLock<Vec<Task>>,
    overlays: Mutex<Overlays>,
    notices: Mutex<Vec<Notice>>,
}

impl<S: RemoteStore> TaskSync<S> {
    pub fn new(repo: TaskRepository<S>) -> Self {
        TaskSync {
            repo,
            tasks: RwLock::new(Vec::new()),
            overlays: Mutex::new(Overlays::default()),
            notices: Mutex::new(Vec::new()),
        }
    }

    /// Replace the authoritative list wholesale from the remote store.
    /// A failed refresh keeps the previous list and queues a failure
    /// notice; the error never disappears between polls.
    pub async fn refresh(&self) -> Result<()> {
        match self.repo.list_all().await {
            Ok(tasks) => {
                *self.tasks.write() = tasks;
                Ok(())
            }
            Err(e) => {
                self.push_notice(Notice::Failure(
                    "failed to refresh tasks from the store".into(),
                ));
                Err(e)
            }
        }
    }

    /// Copy of the authoritative list with all overlays applied: field
    /// overrides, temporary entities appended, hidden entities
    /// filtered. Views consume this and nothing else.
    pub fn snapshot(&self) -> Vec<Task> {
        let overlays = self.overlays.lock();
        let mut tasks: Vec<Task> = self
            .tasks
            .read()
            .iter()
            .filter(|t| !overlays.hidden_tasks.contains(&t.id))
            .cloned()
            .collect();
        for task in &mut tasks {
            task.sub_tasks
                .retain(|st| !overlays.hidden_sub_tasks.contains(&st.id));
            for st in &mut task.sub_tasks {
                if let Some(v) = overlays.completed.get(&st.id) {
                    st.completed = *v;
                }
                if let Some(v) = overlays.assignee.get(&st.id) {
                    st.assignee = v.clone();
                }
                if let Some(v) = overlays.memo.get(&st.id) {
                    st.memo = Some(v.clone());
                }
            }
            if let Some(temp) = overlays.temp_sub_tasks.get(&task.id) {
                task.sub_tasks.extend(temp.iter().cloned());
            }
            if let Some(pending) = overlays.pending_comments.get(&task.id) {
                task.comments.extend(pending.iter().cloned());
            }
        }
        tasks
    }

    /// UI-visible completion state of a sub-task: pending override
    /// first, then the authoritative value.
    pub fn sub_task_completed(&self, sub_task_id: &str) -> Option<bool> {
        if let Some(v) = self.overlays.lock().completed.get(sub_task_id) {
            return Some(*v);
        }
        self.find_sub_task(sub_task_id).map(|st| st.completed)
    }

    /// UI-visible assignee of a sub-task.
    pub fn sub_task_assignee(&self, sub_task_id: &str) -> Option<Option<String>> {
        if let Some(v) = self.overlays.lock().assignee.get(sub_task_id) {
            return Some(v.clone());
        }
        self.find_sub_task(sub_task_id).map(|st| st.assignee)
    }

    /// UI-visible memo of a sub-task.
    pub fn sub_task_memo(&self, sub_task_id: &str) -> Option<Option<String>> {
        if let Some(v) = self.overlays.lock().memo.get(sub_task_id) {
            return Some(Some(v.clone()));
        }
        self.find_sub_task(sub_task_id).map(|st| st.memo)
    }

    fn find_sub_task(&self, sub_task_id: &str) -> Option<SubTask> {
        let found = self
            .tasks
            .read()
            .iter()
            .flat_map(|t| &t.sub_tasks)
            .find(|st| st.id == sub_task_id)
            .cloned();
        if found.is_some() {
            return found;
        }
        self.overlays
            .lock()
            .temp_sub_tasks
            .values()
            .flatten()
            .find(|st| st.id == sub_task_id)
            .cloned()
    }

    fn sub_task_label(&self, sub_task_id: &str) -> String {
        self.find_sub_task(sub_task_id)
            .map(|st| st.title)
            .unwrap_or_else(|| sub_task_id.to_string())
    }

    fn push_notice(&self, notice: Notice) {
        debug!(message = notice.message(), failure = notice.is_failure(), "notice");
        self.notices.lock().push(notice);
    }

    /// Take all queued notices, oldest first.
    pub fn drain_notices(&self) -> Vec<Notice> {
        self.notices.lock().drain(..).collect()
    }

    /// Toggle a sub-task's completion optimistically.
    pub async fn set_sub_task_completed(
        &self,
        task_id: &str,
        sub_task_id: &str,
        completed: bool,
    ) -> Result<()> {
        let label = self.sub_task_label(sub_task_id);
        self.overlays.lock().completed.set(sub_task_id, completed);
        match self
            .repo
            .update_sub_task_completion(task_id, sub_task_id, completed)
            .await
        {
            Ok(()) => {
                self.overlays.lock().completed.clear(sub_task_id);
                self.refresh().await?;
                let state = if completed { "complete" } else { "incomplete" };
                self.push_notice(Notice::Success(format!("sub-task '{label}' marked {state}")));
                Ok(())
            }
            Err(e) => {
                self.overlays.lock().completed.clear(sub_task_id);
                self.push_notice(Notice::Failure(format!(
                    "failed to update completion for sub-task '{label}'"
                )));
                Err(e)
            }
        }
    }

    /// Reassign a sub-task optimistically.
    pub async fn set_sub_task_assignee(
        &self,
        sub_task_id: &str,
        assignee: &str,
    ) -> Result<()> {
        let label = self.sub_task_label(sub_task_id);
        self.overlays
            .lock()
            .assignee
            .set(sub_task_id, Some(assignee.to_string()));
        match self.repo.update_sub_task_assignee(sub_task_id, assignee).await {
            Ok(()) => {
                self.overlays.lock().assignee.clear(sub_task_id);
                self.refresh().await?;
                self.push_notice(Notice::Success(format!(
                    "assignee updated for sub-task '{label}'"
                )));
                Ok(())
            }
            Err(e) => {
                self.overlays.lock().assignee.clear(sub_task_id);
                self.push_notice(Notice::Failure(format!(
                    "failed to update assignee for sub-task '{label}'"
                )));
                Err(e)
            }
        }
    }

    /// Save a sub-task memo optimistically.
    pub async fn set_sub_task_memo(&self, sub_task_id: &str, memo: &str) -> Result<()> {
        let label = self.sub_task_label(sub_task_id);
        self.overlays.lock().memo.set(sub_task_id, memo.to_string());
        match self.repo.update_sub_task_memo(sub_task_id, memo).await {
            Ok(()) => {
                self.overlays.lock().memo.clear(sub_task_id);
                self.refresh().await?;
                self.push_notice(Notice::Success(format!("memo saved for sub-task '{label}'")));
                Ok(())
            }
            Err(e) => {
                self.overlays.lock().memo.clear(sub_task_id);
                self.push_notice(Notice::Failure(format!(
                    "failed to save memo for sub-task '{label}'"
                )));
                Err(e)
            }
        }
    }

    /// Create a sub-task. A temporary client id makes it visible
    /// immediately; the authoritative refresh supplies the real row on
    /// success, and on failure the temporary entry is removed outright.
    pub async fn add_sub_task(
        &self,
        task_id: &str,
        title: &str,
        assignee: Option<&str>,
    ) -> Result<()> {
        let temp_id = format!("{TEMP_ID_PREFIX}{}", new_id());
        let temp = SubTask {
            id: temp_id.clone(),
            title: title.to_string(),
            completed: false,
            assignee: assignee.map(str::to_string),
            memo: None,
        };
        self.overlays
            .lock()
            .temp_sub_tasks
            .entry(task_id.to_string())
            .or_default()
            .push(temp);
        let outcome = self.repo.add_sub_task(task_id, title, assignee).await;
        match outcome {
            Ok(_) => {
                // The temp entry stays visible until the refreshed list
                // carries the real row, then comes out either way.
                let refreshed = self.refresh().await;
                if let Some(list) = self.overlays.lock().temp_sub_tasks.get_mut(task_id) {
                    list.retain(|st| st.id != temp_id);
                }
                refreshed?;
                self.push_notice(Notice::Success(format!("sub-task '{title}' added")));
                Ok(())
            }
            Err(e) => {
                if let Some(list) = self.overlays.lock().temp_sub_tasks.get_mut(task_id) {
                    list.retain(|st| st.id != temp_id);
                }
                self.push_notice(Notice::Failure(format!("failed to add sub-task '{title}'")));
                Err(e)
            }
        }
    }

    /// Delete a sub-task. Entities still carrying a temporary id only
    /// exist locally and are removed without a store call.
    pub async fn delete_sub_task(&self, task_id: &str, sub_task_id: &str) -> Result<()> {
        let label = self.sub_task_label(sub_task_id);
        if sub_task_id.starts_with(TEMP_ID_PREFIX) {
            if let Some(list) = self.overlays.lock().temp_sub_tasks.get_mut(task_id) {
                list.retain(|st| st.id != sub_task_id);
            }
            self.push_notice(Notice::Success(format!("sub-task '{label}' deleted")));
            return Ok(());
        }
        self.overlays.lock().hide_sub_task(sub_task_id);
        match self.repo.delete_sub_task(sub_task_id).await {
            Ok(()) => {
                self.refresh().await?;
                self.overlays.lock().unhide_sub_task(sub_task_id);
                self.push_notice(Notice::Success(format!("sub-task '{label}' deleted")));
                Ok(())
            }
            Err(e) => {
                self.overlays.lock().unhide_sub_task(sub_task_id);
                self.push_notice(Notice::Failure(format!(
                    "failed to delete sub-task '{label}'"
                )));
                Err(e)
            }
        }
    }

    /// Append a comment optimistically.
    pub async fn add_comment(&self, task_id: &str, author: &str, content: &str) -> Result<()> {
        let temp = Comment {
            id: format!("{TEMP_ID_PREFIX}{}", new_id()),
            author: Some(author.to_string()),
            content: content.to_string(),
            created_at: chrono::Utc::now(),
        };
        let temp_id = temp.id.clone();
        self.overlays
            .lock()
            .pending_comments
            .entry(task_id.to_string())
            .or_default()
            .push(temp);
        let outcome = self.repo.add_comment(task_id, author, content).await;
        match outcome {
            Ok(_) => {
                let refreshed = self.refresh().await;
                if let Some(list) = self.overlays.lock().pending_comments.get_mut(task_id) {
                    list.retain(|c| c.id != temp_id);
                }
                refreshed?;
                self.push_notice(Notice::Success("comment added".into()));
                Ok(())
            }
            Err(e) => {
                if let Some(list) = self.overlays.lock().pending_comments.get_mut(task_id) {
                    list.retain(|c| c.id != temp_id);
                }
                self.push_notice(Notice::Failure("failed to add comment".into()));
                Err(e)
            }
        }
    }

    /// Create a task. Precondition: `new` passed `NewTask::validate`
    /// at the call site.
    pub async fn create_task(&self, new: &NewTask) -> Result<()> {
        match self.repo.create_task(new).await {
            Ok(task) => {
                self.refresh().await?;
                self.push_notice(Notice::Success(format!("task '{}' created", task.title)));
                Ok(())
            }
            Err(e) => {
                self.push_notice(Notice::Failure(format!(
                    "failed to create task '{}'",
                    new.title
                )));
                Err(e)
            }
        }
    }

    /// Update task fields and refresh.
    pub async fn update_task(&self, task_id: &str, patch: &TaskPatch) -> Result<()> {
        match self.repo.update_task(task_id, patch).await {
            Ok(()) => {
                self.refresh().await?;
                self.push_notice(Notice::Success("task updated".into()));
                Ok(())
            }
            Err(e) => {
                self.push_notice(Notice::Failure("failed to update task".into()));
                Err(e)
            }
        }
    }

    /// Delete a task. The task disappears from snapshots immediately;
    /// a failed call restores the pre-deletion view.
    pub async fn delete_task(&self, task_id: &str) -> Result<()> {
        let label = self
            .tasks
            .read()
            .iter()
            .find(|t| t.id == task_id)
            .map(|t| t.title.clone())
            .unwrap_or_else(|| task_id.to_string());
        self.overlays.lock().hide_task(task_id);
        match self.repo.delete_task(task_id).await {
            Ok(()) => {
                self.refresh().await?;
                self.overlays.lock().unhide_task(task_id);
                self.push_notice(Notice::Success(format!("task '{label}' deleted")));
                Ok(())
            }
            Err(e) => {
                self.overlays.lock().unhide_task(task_id);
                self.push_notice(Notice::Failure(format!("failed to delete task '{label}'")));
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{Priority, Role, Status};
    use crate::memory::MemoryStore;
    use chrono::NaiveDate;

    async fn seeded_sync(sub_titles: &[&str]) -> (MemoryStore, TaskSync<MemoryStore>, String, Vec<String>) {
        let store = MemoryStore::new();
        store.seed_profile("Kim", Role::User);
        let repo = TaskRepository::new(store.clone());
        let task = repo
            .create_task(&NewTask {
                title: "release".into(),
                description: String::new(),
                status: Status::InProgress,
                priority: Priority::High,
                assignee: "Kim".into(),
                due: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
                progress: 0,
                tags: Vec::new(),
            })
            .await
            .unwrap();
        let mut sub_ids = Vec::new();
        for title in sub_titles {
            let st = repo.add_sub_task(&task.id, title, None).await.unwrap();
            sub_ids.push(st.id);
        }
        let sync = TaskSync::new(TaskRepository::new(store.clone()));
        sync.refresh().await.unwrap();
        (store, sync, task.id, sub_ids)
    }

    #[test]
    fn pending_entries_are_independent_per_entity() {
        let mut pending = Pending::default();
        pending.set("a", true);
        pending.set("b", false);
        assert_eq!(pending.get("a"), Some(&true));
        assert_eq!(pending.get("b"), Some(&false));
        pending.clear("a");
        assert_eq!(pending.get("a"), None);
        assert_eq!(pending.get("b"), Some(&false));
    }

    #[tokio::test]
    async fn successful_toggle_updates_visible_state() {
        let (_store, sync, task_id, sub_ids) = seeded_sync(&["write report"]).await;
        assert_eq!(sync.sub_task_completed(&sub_ids[0]), Some(false));

        sync.set_sub_task_completed(&task_id, &sub_ids[0], true)
            .await
            .unwrap();

        assert_eq!(sync.sub_task_completed(&sub_ids[0]), Some(true));
        let notices = sync.drain_notices();
        assert_eq!(notices.len(), 1);
        assert!(!notices[0].is_failure());
    }

    #[tokio::test]
    async fn failed_toggle_reverts_and_notifies_once() {
        let (store, sync, task_id, sub_ids) = seeded_sync(&["write report"]).await;

        store.fail_next("connection reset");
        let result = sync.set_sub_task_completed(&task_id, &sub_ids[0], true).await;
        assert!(result.is_err());

        // Display reverts to the pre-toggle authoritative value.
        assert_eq!(sync.sub_task_completed(&sub_ids[0]), Some(false));
        let failures: Vec<_> = sync
            .drain_notices()
            .into_iter()
            .filter(|n| n.is_failure())
            .collect();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].message().contains("write report"));
        assert!(failures[0].message().contains("completion"));
    }

    #[tokio::test]
    async fn failed_refresh_queues_a_notice() {
        let (store, sync, _task_id, _sub_ids) = seeded_sync(&["write report"]).await;
        store.fail_next("store offline");

        assert!(sync.refresh().await.is_err());

        // The previous list stands and the failure is not silent.
        assert_eq!(sync.snapshot().len(), 1);
        let notices = sync.drain_notices();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].is_failure());
        assert!(notices[0].message().contains("refresh"));
    }

    #[tokio::test]
    async fn created_sub_task_converges_after_a_failed_refresh() {
        let (store, sync, task_id, _sub_ids) = seeded_sync(&[]).await;
        store.fail_next_fetch("store offline");

        // The insert lands but the follow-up refresh fails.
        assert!(sync.add_sub_task(&task_id, "new step", None).await.is_err());
        assert_eq!(store.sub_task_rows().len(), 1);

        // No lingering temp entry, so a later refresh cannot produce a
        // duplicate; the failure surfaced as a notice.
        assert!(sync.snapshot()[0].sub_tasks.is_empty());
        assert!(sync.drain_notices().iter().any(|n| n.is_failure()));

        sync.refresh().await.unwrap();
        let snapshot = sync.snapshot();
        assert_eq!(snapshot[0].sub_tasks.len(), 1);
        assert!(!snapshot[0].sub_tasks[0].id.starts_with(TEMP_ID_PREFIX));
    }

    #[tokio::test]
    async fn completion_change_updates_parent_progress() {
        let (_store, sync, task_id, sub_ids) =
            seeded_sync(&["a", "b", "c", "d"]).await;
        sync.set_sub_task_completed(&task_id, &sub_ids[0], true)
            .await
            .unwrap();
        let snapshot = sync.snapshot();
        assert_eq!(snapshot[0].progress, 25);
        assert_eq!(snapshot[0].display_progress(), 25);
    }

    #[tokio::test]
    async fn failed_assignee_change_reverts() {
        let (store, sync, _task_id, sub_ids) = seeded_sync(&["write report"]).await;
        store.fail_next("permission denied");
        // resolve_assignee fails first, before the row update; either
        // way the pending entry must be gone afterwards.
        let result = sync.set_sub_task_assignee(&sub_ids[0], "Kim").await;
        assert!(result.is_err());
        assert_eq!(sync.sub_task_assignee(&sub_ids[0]), Some(None));
        let notices = sync.drain_notices();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].is_failure());
        assert!(notices[0].message().contains("assignee"));
    }

    #[tokio::test]
    async fn memo_save_success_and_failure() {
        let (store, sync, _task_id, sub_ids) = seeded_sync(&["write report"]).await;
        sync.set_sub_task_memo(&sub_ids[0], "draft done").await.unwrap();
        assert_eq!(
            sync.sub_task_memo(&sub_ids[0]),
            Some(Some("draft done".to_string()))
        );

        store.fail_next("timeout");
        assert!(sync.set_sub_task_memo(&sub_ids[0], "final").await.is_err());
        // Reverts to the last confirmed memo.
        assert_eq!(
            sync.sub_task_memo(&sub_ids[0]),
            Some(Some("draft done".to_string()))
        );
    }

    #[tokio::test]
    async fn failed_sub_task_creation_removes_temp_entry() {
        let (store, sync, task_id, _sub_ids) = seeded_sync(&[]).await;
        store.fail_next("insert rejected");
        assert!(sync.add_sub_task(&task_id, "new step", None).await.is_err());
        assert!(sync.snapshot()[0].sub_tasks.is_empty());
    }

    #[tokio::test]
    async fn successful_sub_task_creation_lands_with_real_id() {
        let (_store, sync, task_id, _sub_ids) = seeded_sync(&[]).await;
        sync.add_sub_task(&task_id, "new step", Some("Kim")).await.unwrap();
        let snapshot = sync.snapshot();
        assert_eq!(snapshot[0].sub_tasks.len(), 1);
        assert!(!snapshot[0].sub_tasks[0].id.starts_with(TEMP_ID_PREFIX));
        assert_eq!(snapshot[0].sub_tasks[0].assignee.as_deref(), Some("Kim"));
    }

    #[tokio::test]
    async fn failed_sub_task_deletion_restores_the_list() {
        let (store, sync, task_id, sub_ids) = seeded_sync(&["keep me"]).await;
        store.fail_next("delete rejected");
        assert!(sync.delete_sub_task(&task_id, &sub_ids[0]).await.is_err());
        assert_eq!(sync.snapshot()[0].sub_tasks.len(), 1);
    }

    #[tokio::test]
    async fn deleted_task_is_gone_from_snapshots_and_store() {
        let (store, sync, task_id, _sub_ids) = seeded_sync(&["a"]).await;
        sync.delete_task(&task_id).await.unwrap();
        assert!(sync.snapshot().is_empty());
        assert!(store.sub_task_rows().is_empty());
    }

    #[tokio::test]
    async fn added_comment_appears_in_refreshed_list() {
        let (store, sync, task_id, _sub_ids) = seeded_sync(&[]).await;
        store.seed_profile("Lee", Role::User);
        sync.add_comment(&task_id, "Lee", "looks good").await.unwrap();

        let snapshot = sync.snapshot();
        assert_eq!(snapshot[0].comments.len(), 1);
        assert_eq!(snapshot[0].comments[0].author.as_deref(), Some("Lee"));
        assert_eq!(snapshot[0].comments[0].content, "looks good");
    }

    #[tokio::test]
    async fn failed_comment_leaves_no_trace() {
        let (store, sync, task_id, _sub_ids) = seeded_sync(&[]).await;
        store.seed_profile("Lee", Role::User);
        store.fail_next("insert rejected");
        assert!(sync.add_comment(&task_id, "Lee", "lost").await.is_err());
        assert!(sync.snapshot()[0].comments.is_empty());
    }
}
