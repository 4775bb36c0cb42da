//! Concrete CRM hook: Salesforce REST client.
//!
//! Implements [`CrmHook`] over the Salesforce REST API: OAuth2
//! password-grant sign-in, object describe for field discovery, and SOQL
//! query execution with `nextRecordsUrl` pagination. Construct with
//! [`SalesforceClient::new_from_env`] in production; tests point
//! [`SalesforceClient::new`] at a stub server.

use std::env;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::contract::{CrmHook, HookError, QueryResult};

const DEFAULT_LOGIN_URL: &str = "https://login.salesforce.com";
const DEFAULT_API_VERSION: &str = "59.0";

#[derive(Debug, Clone)]
struct Session {
    access_token: String,
    instance_url: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    instance_url: String,
}

pub struct SalesforceClient {
    http: Client,
    login_url: String,
    client_id: String,
    client_secret: String,
    username: String,
    /// Password with the security token appended, per the password grant.
    password: String,
    api_version: String,
    session: RwLock<Option<Session>>,
}

impl SalesforceClient {
    /// Build a client from environment variables: `SF_CLIENT_ID`,
    /// `SF_CLIENT_SECRET`, `SF_USERNAME`, `SF_PASSWORD` (required),
    /// `SF_SECURITY_TOKEN`, `SF_LOGIN_URL`, `SF_API_VERSION` (optional).
    pub fn new_from_env() -> Result<Self, HookError> {
        dotenvy::dotenv().ok();
        let login_url =
            env::var("SF_LOGIN_URL").unwrap_or_else(|_| DEFAULT_LOGIN_URL.to_string());
        let client_id = env::var("SF_CLIENT_ID").map_err(|e| {
            error!("SF_CLIENT_ID missing in environment");
            Box::new(e) as HookError
        })?;
        let client_secret = env::var("SF_CLIENT_SECRET").map_err(|e| {
            error!("SF_CLIENT_SECRET missing in environment");
            Box::new(e) as HookError
        })?;
        let username = env::var("SF_USERNAME").map_err(|e| {
            error!("SF_USERNAME missing in environment");
            Box::new(e) as HookError
        })?;
        let password = env::var("SF_PASSWORD").map_err(|e| {
            error!("SF_PASSWORD missing in environment");
            Box::new(e) as HookError
        })?;
        let security_token = env::var("SF_SECURITY_TOKEN").unwrap_or_default();
        let api_version =
            env::var("SF_API_VERSION").unwrap_or_else(|_| DEFAULT_API_VERSION.to_string());

        info!(
            login_url = %login_url,
            username = %username,
            api_version = %api_version,
            "Initialized Salesforce client from environment"
        );
        Ok(Self::with_credentials(
            login_url,
            client_id,
            client_secret,
            username,
            format!("{password}{security_token}"),
            api_version,
        ))
    }

    /// Build a client against an explicit login endpoint.
    pub fn new(
        login_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self::with_credentials(
            login_url.into(),
            client_id.into(),
            client_secret.into(),
            username.into(),
            password.into(),
            DEFAULT_API_VERSION.to_string(),
        )
    }

    fn with_credentials(
        login_url: String,
        client_id: String,
        client_secret: String,
        username: String,
        password: String,
        api_version: String,
    ) -> Self {
        Self {
            http: Client::new(),
            login_url,
            client_id,
            client_secret,
            username,
            password,
            api_version,
            session: RwLock::new(None),
        }
    }

    fn data_url(&self, instance_url: &str, path: &str) -> String {
        format!(
            "{}/services/data/v{}/{}",
            instance_url.trim_end_matches('/'),
            self.api_version,
            path
        )
    }

    async fn current_session(&self) -> Result<Session, HookError> {
        self.session
            .read()
            .await
            .clone()
            .ok_or_else(|| "not signed in to Salesforce; call sign_in first".into())
    }

    /// Check the response status and decode the JSON body, logging the raw
    /// body on API errors.
    async fn check_json(response: reqwest::Response) -> Result<serde_json::Value, HookError> {
        let status = response.status();
        let url = response.url().to_string();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<failed to decode response body>"));
            error!(status = %status, url = %url, "Salesforce API returned error. Response body: {body}");
            return Err(format!("Salesforce API error ({status}): {body}").into());
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl CrmHook for SalesforceClient {
    async fn sign_in(&self) -> Result<(), HookError> {
        info!(
            login_url = %self.login_url,
            username = %self.username,
            "Signing in to Salesforce"
        );
        let params = [
            ("grant_type", "password"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("username", self.username.as_str()),
            ("password", self.password.as_str()),
        ];
        let response = self
            .http
            .post(format!(
                "{}/services/oauth2/token",
                self.login_url.trim_end_matches('/')
            ))
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<failed to decode response body>"));
            error!(status = %status, username = %self.username, "Salesforce sign-in failed. Response body: {body}");
            return Err(format!("Salesforce sign-in failed ({status}): {body}").into());
        }

        let token: TokenResponse = response.json().await?;
        info!(instance_url = %token.instance_url, "Salesforce sign-in succeeded");
        *self.session.write().await = Some(Session {
            access_token: token.access_token,
            instance_url: token.instance_url,
        });
        Ok(())
    }

    async fn list_fields(&self, object: &str) -> Result<Vec<String>, HookError> {
        let session = self.current_session().await?;
        let url = self.data_url(&session.instance_url, &format!("sobjects/{object}/describe"));
        info!(object, url = %url, "Fetching available fields for object");

        let response = self
            .http
            .get(&url)
            .bearer_auth(&session.access_token)
            .send()
            .await?;
        let body = Self::check_json(response).await?;

        let fields: Vec<String> = body
            .get("fields")
            .and_then(|v| v.as_array())
            .map(|fields| {
                fields
                    .iter()
                    .filter_map(|f| f.get("name").and_then(|n| n.as_str()))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        info!(object, field_count = fields.len(), "Fetched available fields");
        Ok(fields)
    }

    async fn fetch_object(
        &self,
        object: &str,
        fields: &[String],
    ) -> Result<QueryResult, HookError> {
        let soql = format!("SELECT {} FROM {}", fields.join(", "), object);
        debug!(object, soql = %soql, "Built object query");
        self.run_query(&soql).await
    }

    async fn run_query(&self, query: &str) -> Result<QueryResult, HookError> {
        let session = self.current_session().await?;
        info!(query, "Running Salesforce query");

        let response = self
            .http
            .get(self.data_url(&session.instance_url, "query"))
            .query(&[("q", query)])
            .bearer_auth(&session.access_token)
            .send()
            .await?;
        let mut page = Self::check_json(response).await?;

        let total_size = page.get("totalSize").and_then(|v| v.as_u64());
        let mut records = Vec::new();
        loop {
            if let Some(batch) = page.get("records").and_then(|v| v.as_array()) {
                for value in batch {
                    if let serde_json::Value::Object(map) = value {
                        records.push(map.clone());
                    }
                }
            }

            let done = page.get("done").and_then(|v| v.as_bool()).unwrap_or(true);
            if done {
                break;
            }
            let next_url = match page.get("nextRecordsUrl").and_then(|v| v.as_str()) {
                Some(next) => format!("{}{}", session.instance_url.trim_end_matches('/'), next),
                None => break,
            };
            debug!(url = %next_url, fetched = records.len(), "Following next records page");
            let response = self
                .http
                .get(&next_url)
                .bearer_auth(&session.access_token)
                .send()
                .await?;
            page = Self::check_json(response).await?;
        }

        info!(
            records = records.len(),
            total_size = ?total_size,
            "Query finished"
        );
        Ok(QueryResult {
            total_size,
            done: true,
            records,
        })
    }
}
