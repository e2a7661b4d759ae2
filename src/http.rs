//! HTTP implementation of the remote store.
//!
//! Talks to a PostgREST-style REST surface: `/rest/v1/<table>` with
//! `column=eq.value` filters for the four tables, and
//! `/functions/v1/<name>` for the two admin serverless endpoints. The
//! API key travels as both the `apikey` header and the bearer token.
//! No retry, backoff, or explicit timeout is applied; the transport
//! default stands, and a failed call reports failure once.

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::fields::Role;
use crate::store::*;

#[derive(Clone)]
pub struct HttpStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpStore {
    pub fn new(cfg: &StoreConfig) -> Self {
        HttpStore {
            client: Client::new(),
            base_url: cfg.base_url.clone(),
            api_key: cfg.api_key.clone(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn function_url(&self, name: &str) -> String {
        format!("{}/functions/v1/{}", self.base_url, name)
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    /// Map a non-2xx response to a persistence error carrying the
    /// status and response body.
    async fn check(context: &str, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::Persistence(format!("{context}: HTTP {status}: {body}")))
    }

    async fn fetch_rows<T: DeserializeOwned>(&self, table: &str, order: &str) -> Result<Vec<T>> {
        let url = format!("{}?select=*&order={order}", self.table_url(table));
        debug!(table, "fetching rows");
        let response = self.authed(self.client.get(&url)).send().await?;
        let response = Self::check(table, response).await?;
        Ok(response.json().await?)
    }

    async fn insert_row<T: serde::Serialize>(&self, table: &str, row: &T) -> Result<()> {
        debug!(table, "inserting row");
        let response = self
            .authed(self.client.post(self.table_url(table)))
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await?;
        Self::check(table, response).await?;
        Ok(())
    }

    async fn patch_rows<T: serde::Serialize>(
        &self,
        table: &str,
        filter: &str,
        patch: &T,
    ) -> Result<()> {
        let url = format!("{}?{filter}", self.table_url(table));
        debug!(table, filter, "patching rows");
        let response = self.authed(self.client.patch(&url)).json(patch).send().await?;
        Self::check(table, response).await?;
        Ok(())
    }

    async fn delete_rows(&self, table: &str, filter: &str) -> Result<()> {
        let url = format!("{}?{filter}", self.table_url(table));
        debug!(table, filter, "deleting rows");
        let response = self.authed(self.client.delete(&url)).send().await?;
        Self::check(table, response).await?;
        Ok(())
    }

    /// Invoke an admin serverless function. A 401/403 maps to an
    /// authorization error; other failures and `{error}` bodies map to
    /// persistence errors.
    async fn call_function(&self, name: &str, body: serde_json::Value) -> Result<AdminResponse> {
        debug!(function = name, "invoking admin function");
        let response = self
            .authed(self.client.post(self.function_url(name)))
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::Authorization(format!("{name} rejected the caller")));
        }
        let response = Self::check(name, response).await?;
        let outcome: AdminResponse = response.json().await?;
        if let Some(error) = &outcome.error {
            return Err(Error::Persistence(format!("{name}: {error}")));
        }
        Ok(outcome)
    }
}

impl RemoteStore for HttpStore {
    async fn fetch_tasks(&self) -> Result<Vec<TaskRow>> {
        self.fetch_rows("tasks", "created_at.asc").await
    }

    async fn fetch_sub_tasks(&self) -> Result<Vec<SubTaskRow>> {
        self.fetch_rows("sub_tasks", "id.asc").await
    }

    async fn fetch_comments(&self) -> Result<Vec<CommentRow>> {
        self.fetch_rows("comments", "created_at.asc").await
    }

    async fn fetch_profiles(&self) -> Result<Vec<ProfileRow>> {
        self.fetch_rows("profiles", "name.asc").await
    }

    async fn insert_task(&self, row: &TaskRow) -> Result<()> {
        self.insert_row("tasks", row).await
    }

    async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<()> {
        self.patch_rows("tasks", &format!("id=eq.{id}"), patch).await
    }

    async fn delete_task(&self, id: &str) -> Result<()> {
        // Sub-tasks and comments go with it via foreign-key cascade.
        self.delete_rows("tasks", &format!("id=eq.{id}")).await
    }

    async fn insert_sub_task(&self, row: &SubTaskRow) -> Result<()> {
        self.insert_row("sub_tasks", row).await
    }

    async fn update_sub_task(&self, id: &str, patch: &SubTaskPatch) -> Result<()> {
        self.patch_rows("sub_tasks", &format!("id=eq.{id}"), patch).await
    }

    async fn delete_sub_task(&self, id: &str) -> Result<()> {
        self.delete_rows("sub_tasks", &format!("id=eq.{id}")).await
    }

    async fn insert_comment(&self, row: &CommentRow) -> Result<()> {
        self.insert_row("comments", row).await
    }

    async fn insert_profile(&self, row: &ProfileRow) -> Result<()> {
        self.insert_row("profiles", row).await
    }

    async fn update_profile_role(&self, id: &str, role: Role) -> Result<()> {
        self.patch_rows("profiles", &format!("id=eq.{id}"), &json!({ "role": role }))
            .await
    }

    async fn delete_profile(&self, id: &str) -> Result<()> {
        self.delete_rows("profiles", &format!("id=eq.{id}")).await
    }

    async fn unassign_tasks_of(&self, profile_id: &str) -> Result<()> {
        self.patch_rows(
            "tasks",
            &format!("assignee_id=eq.{profile_id}"),
            &json!({ "assignee_id": null }),
        )
        .await
    }

    async fn unassign_sub_tasks_of(&self, profile_id: &str) -> Result<()> {
        self.patch_rows(
            "sub_tasks",
            &format!("assignee_id=eq.{profile_id}"),
            &json!({ "assignee_id": null }),
        )
        .await
    }

    async fn delete_comments_by(&self, profile_id: &str) -> Result<()> {
        self.delete_rows("comments", &format!("author_id=eq.{profile_id}"))
            .await
    }

    async fn reset_password(&self, user_id: &str, new_password: &str) -> Result<AdminResponse> {
        self.call_function(
            "reset-user-password",
            json!({ "userId": user_id, "newPassword": new_password }),
        )
        .await
    }

    async fn delete_account(&self, user_id: &str) -> Result<AdminResponse> {
        self.call_function("delete-user-completely", json!({ "userId": user_id }))
            .await
    }
}
