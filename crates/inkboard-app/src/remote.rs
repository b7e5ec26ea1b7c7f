//! Hosted backend client (PostgREST tables plus GoTrue auth) over reqwest.

use crate::config::{AppConfig, ConfigError};
use inkboard_core::board::{NewPost, NewThread, Post, Thread, ThreadId};
use inkboard_core::session::{Credentials, Identity, Session};
use inkboard_core::store::{BoxFuture, RemoteStore, SortOrder, StoreError, StoreResult};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::RwLock;

fn lock_error(e: impl std::fmt::Display) -> StoreError {
    StoreError::Other(format!("Lock error: {}", e))
}

fn request_error(e: reqwest::Error) -> StoreError {
    if e.is_decode() {
        StoreError::Serialization(e.to_string())
    } else {
        StoreError::Network(e.to_string())
    }
}

/// Map non-2xx responses to [`StoreError`], keeping the response body.
async fn check_status(response: Response) -> StoreResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(StoreError::Unauthorized(message)),
        _ => Err(StoreError::Http {
            status: status.as_u16(),
            message,
        }),
    }
}

async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> StoreResult<T> {
    let response = request.send().await.map_err(request_error)?;
    check_status(response).await?.json::<T>().await.map_err(request_error)
}

/// Inserts return the created rows as an array.
fn first_row<T>(rows: Vec<T>, table: &str) -> StoreResult<T> {
    rows.into_iter()
        .next()
        .ok_or_else(|| StoreError::Other(format!("Insert into {} returned no row", table)))
}

/// Backend client implementing both the board store and identity contracts.
pub struct RestStore {
    client: Client,
    base_url: String,
    anon_key: String,
    session: RwLock<Option<Session>>,
}

impl RestStore {
    pub fn new(base_url: &str, anon_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            session: RwLock::new(None),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        config.require_backend()?;
        Ok(Self::new(&config.backend_url, &config.anon_key))
    }

    /// Use `session`'s token for subsequent requests (e.g. one restored from
    /// disk).
    pub fn set_session(&self, session: Option<Session>) -> StoreResult<()> {
        *self.session.write().map_err(lock_error)? = session;
        Ok(())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    /// Session token if signed in, else the anon key.
    fn bearer(&self) -> StoreResult<String> {
        let session = self.session.read().map_err(lock_error)?;
        Ok(session
            .as_ref()
            .map(|s| s.access_token.clone())
            .unwrap_or_else(|| self.anon_key.clone()))
    }

    fn request(&self, method: Method, url: String) -> StoreResult<RequestBuilder> {
        Ok(self
            .client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(self.bearer()?))
    }
}

impl RemoteStore for RestStore {
    fn list_threads(&self, order: SortOrder) -> BoxFuture<'_, StoreResult<Vec<Thread>>> {
        Box::pin(async move {
            let order = format!("created_at.{}", order.as_query());
            let request = self
                .request(Method::GET, self.rest_url("threads"))?
                .query(&[("select", "*"), ("order", order.as_str())]);
            send_json(request).await
        })
    }

    fn get_thread_by_title(&self, title: &str) -> BoxFuture<'_, StoreResult<Option<Thread>>> {
        let filter = format!("eq.{}", title);
        Box::pin(async move {
            let request = self.request(Method::GET, self.rest_url("threads"))?.query(&[
                ("select", "*"),
                ("title", filter.as_str()),
                ("order", "created_at.desc"),
                ("limit", "1"),
            ]);
            let rows: Vec<Thread> = send_json(request).await?;
            Ok(rows.into_iter().next())
        })
    }

    fn create_thread(&self, thread: &NewThread) -> BoxFuture<'_, StoreResult<Thread>> {
        let thread = thread.clone();
        Box::pin(async move {
            let request = self
                .request(Method::POST, self.rest_url("threads"))?
                .header("Prefer", "return=representation")
                .json(&[thread]);
            first_row(send_json(request).await?, "threads")
        })
    }

    fn list_posts(
        &self,
        thread_id: ThreadId,
        order: SortOrder,
    ) -> BoxFuture<'_, StoreResult<Vec<Post>>> {
        Box::pin(async move {
            let thread_filter = format!("eq.{}", thread_id);
            let order = format!("created_at.{}", order.as_query());
            let request = self.request(Method::GET, self.rest_url("posts"))?.query(&[
                ("select", "*"),
                ("thread_id", thread_filter.as_str()),
                ("order", order.as_str()),
            ]);
            send_json(request).await
        })
    }

    fn create_post(&self, post: &NewPost) -> BoxFuture<'_, StoreResult<Post>> {
        let post = post.clone();
        Box::pin(async move {
            let request = self
                .request(Method::POST, self.rest_url("posts"))?
                .header("Prefer", "return=representation")
                .json(&[post]);
            first_row(send_json(request).await?, "posts")
        })
    }
}

impl Identity for RestStore {
    fn sign_up(&self, credentials: &Credentials) -> BoxFuture<'_, StoreResult<Option<Session>>> {
        let credentials = credentials.clone();
        Box::pin(async move {
            let request = self
                .request(Method::POST, self.auth_url("signup"))?
                .json(&credentials);
            // Without auto-confirm the response is the bare user record.
            let body: serde_json::Value = send_json(request).await?;
            if body.get("access_token").is_none() {
                return Ok(None);
            }
            let session: Session = serde_json::from_value(body)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            self.set_session(Some(session.clone()))?;
            Ok(Some(session))
        })
    }

    fn sign_in_with_password(
        &self,
        credentials: &Credentials,
    ) -> BoxFuture<'_, StoreResult<Session>> {
        let credentials = credentials.clone();
        Box::pin(async move {
            let request = self
                .request(Method::POST, self.auth_url("token"))?
                .query(&[("grant_type", "password")])
                .json(&credentials);
            let session: Session = send_json(request).await?;
            self.set_session(Some(session.clone()))?;
            Ok(session)
        })
    }

    fn sign_out(&self, session: &Session) -> BoxFuture<'_, StoreResult<()>> {
        let token = session.access_token.clone();
        Box::pin(async move {
            let result: StoreResult<()> = async {
                let response = self
                    .client
                    .post(self.auth_url("logout"))
                    .header("apikey", &self.anon_key)
                    .bearer_auth(&token)
                    .send()
                    .await
                    .map_err(request_error)?;
                check_status(response).await.map(|_| ())
            }
            .await;
            // The token is dropped locally whatever the server said.
            self.set_session(None)?;
            result
        })
    }

    fn current_session(&self) -> BoxFuture<'_, StoreResult<Option<Session>>> {
        Box::pin(async move { Ok(self.session.read().map_err(lock_error)?.clone()) })
    }
}
