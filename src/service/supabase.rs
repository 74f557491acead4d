//! HTTP adapter for a Supabase project: GoTrue for auth, PostgREST for data.

use super::session_store::SessionStore;
use super::{
    AuthService, DataService, ServiceError, Session, SessionEvent, SessionEvents,
    SessionSubscription, User,
};
use crate::models::{
    Appointment, AppointmentPayload, AppointmentWithContact, Contact, ContactPayload, Owned,
    Stamped,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use url::Url;
use uuid::Uuid;

/// A PostgREST table and the fixed query used to list it.
pub trait Table: DeserializeOwned {
    fn name() -> &'static str;

    fn select() -> &'static str {
        "*"
    }

    fn order() -> &'static str;
}

impl Table for Contact {
    fn name() -> &'static str {
        "contacts"
    }

    fn order() -> &'static str {
        "nombre.asc"
    }
}

impl Table for Appointment {
    fn name() -> &'static str {
        "appointments"
    }

    fn order() -> &'static str {
        "date.asc,time.asc"
    }
}

impl Table for AppointmentWithContact {
    fn name() -> &'static str {
        "appointments"
    }

    fn select() -> &'static str {
        "*,contact:contacts(*)"
    }

    fn order() -> &'static str {
        "date.asc,time.asc"
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: User,
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .or_else(|| self.expires_in.map(|secs| now + Duration::seconds(secs)));
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

pub struct SupabaseClient {
    http: Client,
    base: Url,
    anon_key: SecretString,
    session: RwLock<Option<Session>>,
    store: Option<SessionStore>,
    events: SessionEvents,
}

impl SupabaseClient {
    pub fn new(url: &str, anon_key: SecretString) -> Result<Self, ServiceError> {
        let mut base = Url::parse(url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            http: Client::new(),
            base,
            anon_key,
            session: RwLock::new(None),
            store: None,
            events: SessionEvents::new(),
        })
    }

    /// Persist issued sessions so they survive restarts.
    pub fn with_session_store(mut self, store: SessionStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, ServiceError> {
        Ok(self.base.join(path)?)
    }

    fn table_url(&self, table: &str) -> Result<Url, ServiceError> {
        self.endpoint(&format!("rest/v1/{}", table))
    }

    fn with_key(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("apikey", self.anon_key.expose_secret())
    }

    /// Without a session the anon key doubles as the bearer token; row level
    /// security then hides every row. An expired session is refreshed first.
    async fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self.access_token().await;
        self.with_key(request).bearer_auth(token)
    }

    async fn access_token(&self) -> String {
        let cached = self.session.read().await.clone();
        let Some(session) = cached else {
            return self.anon_key.expose_secret().to_string();
        };
        if !session.is_expired(Utc::now()) {
            return session.access_token;
        }
        let Some(refresh_token) = session.refresh_token.clone() else {
            return session.access_token;
        };
        match self.refresh(&refresh_token).await {
            Ok(refreshed) => refreshed.access_token,
            Err(e) => {
                // The request goes out anyway and reports the service's own error.
                warn!("Session refresh failed: {}", e);
                session.access_token
            }
        }
    }

    async fn select<T: Table>(&self) -> Result<Vec<T>, ServiceError> {
        let mut url = self.table_url(T::name())?;
        url.query_pairs_mut().append_pair("select", T::select()).append_pair("order", T::order());
        debug!("GET {}", url);
        let response = self.authorized(self.http.get(url)).await.send().await?;
        Ok(check(response).await?.json().await?)
    }

    async fn insert<T: Table, P: Serialize + Sync>(&self, body: &P) -> Result<T, ServiceError> {
        let url = self.table_url(T::name())?;
        debug!("POST {}", url);
        let request = self
            .http
            .post(url)
            .header("Prefer", "return=representation")
            .json(&[body]);
        let response = self.authorized(request).await.send().await?;
        let rows: Vec<T> = check(response).await?.json().await?;
        rows.into_iter().next().ok_or_else(|| ServiceError::Api {
            status: StatusCode::OK.as_u16(),
            message: "El servicio no devolvió el registro creado".to_string(),
        })
    }

    async fn update<T: Table, P: Serialize + Sync>(&self, id: Uuid, body: &P) -> Result<T, ServiceError> {
        let url = self.row_url(T::name(), id)?;
        debug!("PATCH {}", url);
        let request = self
            .http
            .patch(url)
            .header("Prefer", "return=representation")
            .json(body);
        let response = self.authorized(request).await.send().await?;
        let rows: Vec<T> = check(response).await?.json().await?;
        rows.into_iter().next().ok_or(ServiceError::NotFound(id))
    }

    async fn delete(&self, table: &str, id: Uuid) -> Result<(), ServiceError> {
        let url = self.row_url(table, id)?;
        debug!("DELETE {}", url);
        let response = self.authorized(self.http.delete(url)).await.send().await?;
        check(response).await?;
        Ok(())
    }

    fn row_url(&self, table: &str, id: Uuid) -> Result<Url, ServiceError> {
        let mut url = self.table_url(table)?;
        url.query_pairs_mut().append_pair("id", &format!("eq.{}", id));
        Ok(url)
    }

    async fn token_request(&self, grant_type: &str, body: Value) -> Result<Session, ServiceError> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);
        debug!("POST {} (grant_type={})", url.path(), grant_type);
        let response = self.with_key(self.http.post(url)).json(&body).send().await?;
        let response = check_auth(response).await?;
        let token: TokenResponse = response.json().await?;
        Ok(token.into_session(Utc::now()))
    }

    async fn adopt(&self, session: Session, event: fn(Session) -> SessionEvent) -> Result<(), ServiceError> {
        if let Some(store) = &self.store {
            store.save(&session)?;
        }
        *self.session.write().await = Some(session.clone());
        self.events.emit(event(session));
        Ok(())
    }

    async fn forget(&self) {
        *self.session.write().await = None;
        if let Some(store) = &self.store {
            if let Err(e) = store.clear() {
                warn!("Failed to remove stored session: {}", e);
            }
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, ServiceError> {
        info!("Refreshing expired session");
        let session = self
            .token_request("refresh_token", json!({ "refresh_token": refresh_token }))
            .await?;
        self.adopt(session.clone(), SessionEvent::TokenRefreshed).await?;
        Ok(session)
    }
}

#[async_trait]
impl AuthService for SupabaseClient {
    async fn sign_in(&self, email: &str, password: &SecretString) -> Result<Session, ServiceError> {
        let body = serde_json::to_value(Credentials { email, password: password.expose_secret() })?;
        let session = self.token_request("password", body).await?;
        info!("Signed in as {}", session.email());
        self.adopt(session.clone(), SessionEvent::SignedIn).await?;
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &SecretString) -> Result<Option<Session>, ServiceError> {
        let url = self.endpoint("auth/v1/signup")?;
        debug!("POST {}", url.path());
        let response = self
            .with_key(self.http.post(url))
            .json(&Credentials { email, password: password.expose_secret() })
            .send()
            .await?;
        let body: Value = check_auth(response).await?.json().await?;
        if body.get("access_token").is_none() {
            info!("Sign-up for {} awaits email confirmation", email);
            return Ok(None);
        }
        let session = serde_json::from_value::<TokenResponse>(body)?.into_session(Utc::now());
        self.adopt(session.clone(), SessionEvent::SignedIn).await?;
        Ok(Some(session))
    }

    /// The local session is dropped even when the remote call fails, so a
    /// dead token never keeps the user signed in.
    async fn sign_out(&self) -> Result<(), ServiceError> {
        let token = self.session.read().await.as_ref().map(|s| s.access_token.clone());
        if let Some(token) = token {
            let url = self.endpoint("auth/v1/logout")?;
            debug!("POST {}", url.path());
            let outcome = self.with_key(self.http.post(url)).bearer_auth(token).send().await;
            match outcome {
                Ok(response) => {
                    if let Err(e) = check_auth(response).await {
                        warn!("Remote sign-out failed: {}", e);
                    }
                }
                Err(e) => warn!("Remote sign-out failed: {}", e),
            }
        }
        self.forget().await;
        self.events.emit(SessionEvent::SignedOut);
        Ok(())
    }

    async fn current_session(&self) -> Result<Option<Session>, ServiceError> {
        let cached = self.session.read().await.clone();
        let session = match cached.or_else(|| self.store.as_ref().and_then(SessionStore::load)) {
            Some(session) => session,
            None => return Ok(None),
        };

        if !session.is_expired(Utc::now()) {
            *self.session.write().await = Some(session.clone());
            return Ok(Some(session));
        }

        let Some(refresh_token) = session.refresh_token.clone() else {
            info!("Stored session expired and cannot be refreshed");
            self.forget().await;
            return Ok(None);
        };
        match self.refresh(&refresh_token).await {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!("Session refresh failed: {}", e);
                self.forget().await;
                Ok(None)
            }
        }
    }

    fn subscribe(&self) -> SessionSubscription {
        self.events.subscribe()
    }
}

#[async_trait]
impl DataService for SupabaseClient {
    async fn list_contacts(&self) -> Result<Vec<Contact>, ServiceError> {
        self.select::<Contact>().await
    }

    async fn insert_contact(&self, user_id: Uuid, payload: &ContactPayload) -> Result<Contact, ServiceError> {
        self.insert(&Owned { fields: payload, user_id }).await
    }

    async fn update_contact(&self, id: Uuid, payload: &ContactPayload) -> Result<Contact, ServiceError> {
        self.update(id, &Stamped { fields: payload, updated_at: Utc::now() }).await
    }

    async fn delete_contact(&self, id: Uuid) -> Result<(), ServiceError> {
        self.delete(Contact::name(), id).await
    }

    async fn list_appointments(&self) -> Result<Vec<AppointmentWithContact>, ServiceError> {
        self.select::<AppointmentWithContact>().await
    }

    async fn insert_appointment(
        &self,
        user_id: Uuid,
        payload: &AppointmentPayload,
    ) -> Result<Appointment, ServiceError> {
        self.insert(&Owned { fields: payload, user_id }).await
    }

    async fn update_appointment(
        &self,
        id: Uuid,
        payload: &AppointmentPayload,
    ) -> Result<Appointment, ServiceError> {
        self.update(id, &Stamped { fields: payload, updated_at: Utc::now() }).await
    }

    async fn delete_appointment(&self, id: Uuid) -> Result<(), ServiceError> {
        self.delete(Appointment::name(), id).await
    }
}

async fn check(response: Response) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ServiceError::Api { status: status.as_u16(), message: error_message(status, &body) })
}

async fn check_auth(response: Response) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ServiceError::Auth(error_message(status, &body)))
}

/// Picks the human-readable message out of a PostgREST or GoTrue error body.
pub fn error_message(status: StatusCode, body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|value| {
            ["message", "msg", "error_description", "error"]
                .iter()
                .find_map(|key| value.get(*key).and_then(Value::as_str))
        })
        .map(str::to_string)
        .unwrap_or_else(|| {
            status.canonical_reason().map(str::to_string).unwrap_or_else(|| status.to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(r#"{"code":"23505","message":"duplicate key value"}"#, "duplicate key value"; "postgrest")]
    #[test_case(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#, "Invalid login credentials"; "gotrue grant")]
    #[test_case(r#"{"code":422,"msg":"User already registered"}"#, "User already registered"; "gotrue msg")]
    #[test_case("<html>bad gateway</html>", "Bad Gateway"; "non json body")]
    fn test_error_message(body: &str, expected: &str) {
        assert_eq!(error_message(StatusCode::BAD_GATEWAY, body), expected);
    }

    #[test]
    fn test_base_url_gains_trailing_slash() {
        let client = SupabaseClient::new("https://demo.supabase.co/project", SecretString::from("key".to_string())).unwrap();
        assert_eq!(client.base_url().as_str(), "https://demo.supabase.co/project/");
        let url = client.table_url("contacts").unwrap();
        assert_eq!(url.as_str(), "https://demo.supabase.co/project/rest/v1/contacts");
    }

    #[test]
    fn test_row_url_filters_by_id() {
        let client = SupabaseClient::new("https://demo.supabase.co", SecretString::from("key".to_string())).unwrap();
        let id = Uuid::nil();
        let url = client.row_url("appointments", id).unwrap();
        assert_eq!(url.query(), Some(format!("id=eq.{}", id).as_str()));
    }

    #[test]
    fn test_token_response_prefers_absolute_expiry() {
        let now = Utc::now();
        let token = TokenResponse {
            access_token: "a".to_string(),
            refresh_token: None,
            expires_in: Some(3600),
            expires_at: Some(1_900_000_000),
            user: User { id: Uuid::nil(), email: None },
        };
        let session = token.into_session(now);
        assert_eq!(session.expires_at.map(|at| at.timestamp()), Some(1_900_000_000));
    }

    #[tokio::test]
    async fn test_anonymous_calls_still_reach_the_network() {
        let client = SupabaseClient::new("http://127.0.0.1:9", SecretString::from("key".to_string())).unwrap();
        let result = client.list_contacts().await;
        assert!(matches!(result, Err(ServiceError::Network(_))));
    }
}
