//! HTTP client for the `/api/v1` surface.
//!
//! The client owns an explicit [`Session`]: `login` starts it, `logout` ends
//! it, and every request made while it exists carries its bearer token.

pub mod session;

use reqwest::header::HeaderMap;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::database::models::{Property, Requirement, User};
use crate::filter::ListParams;
use crate::middleware::TOTAL_COUNT_HEADER;
use crate::services::{
    PropertyInput, PropertySummary, RequirementInput, RequirementSummary, UserInput, UserProfileInput,
    UserWithProperties,
};

pub use session::Session;

const API_PREFIX: &str = "/api/v1";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid server URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{message} ({status})")]
    Api {
        status: u16,
        message: String,
        code: Option<String>,
    },

    #[error("not logged in")]
    NotLoggedIn,

    #[error("invalid page request: {0}")]
    InvalidPage(String),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// 1-based page request, converted to the `_start`/`_end` window on the wire.
#[derive(Debug, Clone, Default)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub search: Option<String>,
    pub property_type: Option<String>,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size, ..Default::default() }
    }

    pub fn to_params(&self) -> Result<ListParams, ClientError> {
        if self.page == 0 {
            return Err(ClientError::InvalidPage("page numbers start at 1".to_string()));
        }
        if self.page_size == 0 {
            return Err(ClientError::InvalidPage("page size must be positive".to_string()));
        }
        let start = u64::from(self.page - 1) * u64::from(self.page_size);
        let end = start + u64::from(self.page_size);
        Ok(ListParams {
            start: Some(start.to_string()),
            end: Some(end.to_string()),
            sort: self.sort.clone(),
            order: self.order.clone(),
            title_like: self.search.clone(),
            property_type: self.property_type.clone(),
        })
    }
}

/// One page of a list plus the server's unpaginated total.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    pub fn page_count(&self) -> i64 {
        page_count(self.total, self.page_size)
    }
}

pub fn page_count(total: i64, page_size: u32) -> i64 {
    if total <= 0 || page_size == 0 {
        return 0;
    }
    let size = i64::from(page_size);
    (total + size - 1) / size
}

/// Result of `GET /health`; a degraded server still answers.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub body: Value,
}

#[derive(Deserialize)]
struct PropertyEnvelope {
    property: Property,
}

#[derive(Deserialize)]
struct RequirementEnvelope {
    requirement: Requirement,
}

#[derive(Deserialize)]
struct MessageEnvelope {
    message: String,
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Option<Session>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let parsed = Url::parse(base_url)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            session: None,
        })
    }

    /// Resume a session persisted by an earlier run.
    pub fn with_session(mut self, session: Option<Session>) -> Self {
        self.session = session;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Verify `credential` with the server and start a session for the returned user.
    pub async fn login(&mut self, credential: &str) -> Result<&Session, ClientError> {
        let request = self
            .request(Method::POST, "/users/login")
            .json(&json!({ "credential": credential }));
        let (user, _): (User, _) = self.send(request).await?;
        tracing::debug!(email = %user.email, "Logged in");
        Ok(&*self.session.insert(Session::new(credential, user)))
    }

    /// Ends the session. Returns what was dropped.
    pub fn logout(&mut self) -> Option<Session> {
        self.session.take()
    }

    pub async fn health(&self) -> Result<HealthStatus, ClientError> {
        let response = self.http.get(format!("{}/health", self.base_url)).send().await?;
        let healthy = response.status().is_success();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        Ok(HealthStatus { healthy, body })
    }

    // properties

    pub async fn list_properties(&self, page: &PageRequest) -> Result<Page<Property>, ClientError> {
        self.list("/properties", page).await
    }

    pub async fn latest_properties(&self) -> Result<PropertySummary, ClientError> {
        Ok(self.send(self.request(Method::GET, "/properties/five")).await?.0)
    }

    pub async fn get_property(&self, id: &str) -> Result<Value, ClientError> {
        Ok(self.send(self.request(Method::GET, &format!("/properties/{}", id))).await?.0)
    }

    pub async fn create_property(&self, input: &PropertyInput) -> Result<Property, ClientError> {
        self.require_session()?;
        let request = self.request(Method::POST, "/properties").json(input);
        let (envelope, _): (PropertyEnvelope, _) = self.send(request).await?;
        Ok(envelope.property)
    }

    pub async fn update_property(&self, id: &str, input: &PropertyInput) -> Result<Property, ClientError> {
        self.require_session()?;
        let request = self.request(Method::PATCH, &format!("/properties/{}", id)).json(input);
        let (envelope, _): (PropertyEnvelope, _) = self.send(request).await?;
        Ok(envelope.property)
    }

    pub async fn delete_property(&self, id: &str) -> Result<String, ClientError> {
        self.require_session()?;
        let request = self.request(Method::DELETE, &format!("/properties/{}", id));
        let (envelope, _): (MessageEnvelope, _) = self.send(request).await?;
        Ok(envelope.message)
    }

    // requirements

    pub async fn list_requirements(&self, page: &PageRequest) -> Result<Page<Requirement>, ClientError> {
        self.list("/requirement", page).await
    }

    pub async fn latest_requirements(&self) -> Result<RequirementSummary, ClientError> {
        Ok(self.send(self.request(Method::GET, "/requirement/five")).await?.0)
    }

    pub async fn get_requirement(&self, id: &str) -> Result<Value, ClientError> {
        Ok(self.send(self.request(Method::GET, &format!("/requirement/{}", id))).await?.0)
    }

    pub async fn create_requirement(&self, input: &RequirementInput) -> Result<Requirement, ClientError> {
        self.require_session()?;
        let request = self.request(Method::POST, "/requirement").json(input);
        let (envelope, _): (RequirementEnvelope, _) = self.send(request).await?;
        Ok(envelope.requirement)
    }

    pub async fn update_requirement(&self, id: &str, input: &RequirementInput) -> Result<Requirement, ClientError> {
        self.require_session()?;
        let request = self.request(Method::PATCH, &format!("/requirement/{}", id)).json(input);
        let (envelope, _): (RequirementEnvelope, _) = self.send(request).await?;
        Ok(envelope.requirement)
    }

    pub async fn delete_requirement(&self, id: &str) -> Result<String, ClientError> {
        self.require_session()?;
        let request = self.request(Method::DELETE, &format!("/requirement/{}", id));
        let (envelope, _): (MessageEnvelope, _) = self.send(request).await?;
        Ok(envelope.message)
    }

    // users

    pub async fn list_users(&self) -> Result<Vec<User>, ClientError> {
        Ok(self.send(self.request(Method::GET, "/users")).await?.0)
    }

    pub async fn get_user(&self, id: &str) -> Result<UserWithProperties, ClientError> {
        Ok(self.send(self.request(Method::GET, &format!("/users/{}", id))).await?.0)
    }

    pub async fn upsert_user(&self, input: &UserInput) -> Result<User, ClientError> {
        Ok(self.send(self.request(Method::POST, "/users").json(input)).await?.0)
    }

    pub async fn update_profile(&self, input: &UserProfileInput) -> Result<User, ClientError> {
        self.require_session()?;
        Ok(self.send(self.request(Method::POST, "/users/update").json(input)).await?.0)
    }

    async fn list<T: DeserializeOwned>(&self, path: &str, page: &PageRequest) -> Result<Page<T>, ClientError> {
        let params = page.to_params()?;
        let (items, headers): (Vec<T>, _) = self.send(self.request(Method::GET, path).query(&params)).await?;
        let total = total_count(&headers)?;
        Ok(Page {
            items,
            total,
            page: page.page,
            page_size: page.page_size,
        })
    }

    fn require_session(&self) -> Result<&Session, ClientError> {
        self.session.as_ref().ok_or(ClientError::NotLoggedIn)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, format!("{}{}{}", self.base_url, API_PREFIX, path));
        match &self.session {
            Some(session) => builder.bearer_auth(&session.token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<(T, HeaderMap), ClientError> {
        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        if !status.is_success() {
            return Err(api_error(status, response.json::<Value>().await.ok()));
        }
        Ok((response.json::<T>().await?, headers))
    }
}

fn api_error(status: StatusCode, body: Option<Value>) -> ClientError {
    let body = body.unwrap_or(Value::Null);
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
    let code = body.get("code").and_then(Value::as_str).map(str::to_string);
    ClientError::Api {
        status: status.as_u16(),
        message,
        code,
    }
}

fn total_count(headers: &HeaderMap) -> Result<i64, ClientError> {
    headers
        .get(TOTAL_COUNT_HEADER)
        .ok_or_else(|| ClientError::UnexpectedResponse(format!("missing {} header", TOTAL_COUNT_HEADER)))?
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .ok_or_else(|| ClientError::UnexpectedResponse(format!("malformed {} header", TOTAL_COUNT_HEADER)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn page_request_maps_to_window() {
        let params = PageRequest::new(3, 10).to_params().unwrap();
        assert_eq!(params.start.as_deref(), Some("20"));
        assert_eq!(params.end.as_deref(), Some("30"));

        let first = PageRequest {
            search: Some("villa".into()),
            property_type: Some("apartment".into()),
            ..PageRequest::new(1, 5)
        };
        let params = first.to_params().unwrap();
        assert_eq!(params.start.as_deref(), Some("0"));
        assert_eq!(params.end.as_deref(), Some("5"));
        assert_eq!(params.title_like.as_deref(), Some("villa"));

        assert!(PageRequest::new(0, 10).to_params().is_err());
        assert!(PageRequest::new(1, 0).to_params().is_err());
    }

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(page_count(0, 10), 0);
        assert_eq!(page_count(10, 10), 1);
        assert_eq!(page_count(11, 10), 2);
        assert_eq!(page_count(12, 5), 3);
    }

    #[test]
    fn total_count_header_is_parsed() {
        let mut headers = HeaderMap::new();
        assert!(total_count(&headers).is_err());
        headers.insert(TOTAL_COUNT_HEADER, HeaderValue::from_static("42"));
        assert_eq!(total_count(&headers).unwrap(), 42);
        headers.insert(TOTAL_COUNT_HEADER, HeaderValue::from_static("many"));
        assert!(total_count(&headers).is_err());
    }

    #[test]
    fn error_body_message_is_surfaced() {
        let err = api_error(
            StatusCode::NOT_FOUND,
            Some(json!({"error": true, "message": "Property not found", "code": "NOT_FOUND"})),
        );
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.to_string(), "Property not found (404)");

        let bare = api_error(StatusCode::BAD_GATEWAY, None);
        assert_eq!(bare.to_string(), "Bad Gateway (502)");
    }

    #[test]
    fn rejects_bad_base_url() {
        assert!(matches!(ApiClient::new("not a url"), Err(ClientError::InvalidUrl(_))));
        let client = ApiClient::new("http://localhost:8080/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert!(client.session().is_none());
    }
}
