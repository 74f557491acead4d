//! Client side of the hosted data and auth service.
//!
//! The application never talks to the network directly: everything goes
//! through [`AuthService`] and [`DataService`]. [`supabase::SupabaseClient`]
//! implements both over HTTP, [`memory::MemoryBackend`] implements them
//! in-process.

use crate::models::{
    Appointment, AppointmentPayload, AppointmentWithContact, Contact, ContactPayload,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

pub mod memory;
pub mod session_store;
pub mod supabase;

pub use memory::MemoryBackend;
pub use supabase::SupabaseClient;

/// Errors reported by the external service or the transport to it.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    Auth(String),
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("Error de red: {0}")]
    Network(#[from] reqwest::Error),
    #[error("No hay una sesión activa")]
    NotAuthenticated,
    #[error("Registro no encontrado: {0}")]
    NotFound(Uuid),
    #[error("Respuesta inesperada del servicio: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Error al guardar la sesión: {0}")]
    Storage(#[from] std::io::Error),
    #[error("URL del servicio inválida: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// An authenticated session as issued by the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    pub user: User,
}

impl Session {
    pub fn user_id(&self) -> Uuid {
        self.user.id
    }

    pub fn email(&self) -> &str {
        self.user.email.as_deref().unwrap_or("")
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }
}

/// Session-changed notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn(Session),
    TokenRefreshed(Session),
    SignedOut,
}

impl SessionEvent {
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionEvent::SignedIn(session) | SessionEvent::TokenRefreshed(session) => Some(session),
            SessionEvent::SignedOut => None,
        }
    }
}

const SESSION_EVENT_CAPACITY: usize = 16;

/// Fan-out of session events to every live subscription.
#[derive(Debug, Clone)]
pub struct SessionEvents {
    sender: broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(SESSION_EVENT_CAPACITY);
        Self { sender }
    }

    pub fn emit(&self, event: SessionEvent) {
        log::debug!("Session event: {}", describe(&event));
        // No subscribers is not an error.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription { receiver: Some(self.sender.subscribe()) }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new()
    }
}

fn describe(event: &SessionEvent) -> &'static str {
    match event {
        SessionEvent::SignedIn(_) => "signed in",
        SessionEvent::TokenRefreshed(_) => "token refreshed",
        SessionEvent::SignedOut => "signed out",
    }
}

/// A listener on the session event stream. Detaches when dropped or when
/// [`SessionSubscription::unsubscribe`] is called.
#[derive(Debug)]
pub struct SessionSubscription {
    receiver: Option<broadcast::Receiver<SessionEvent>>,
}

impl SessionSubscription {
    /// Next pending event, without waiting. Lagged events are skipped: only
    /// the latest session matters to the listener.
    pub fn try_next(&mut self) -> Option<SessionEvent> {
        let receiver = self.receiver.as_mut()?;
        loop {
            match receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    log::warn!("Dropped {} stale session events", skipped);
                }
                Err(_) => return None,
            }
        }
    }

    pub fn drain(&mut self) -> Vec<SessionEvent> {
        std::iter::from_fn(|| self.try_next()).collect()
    }

    pub fn unsubscribe(&mut self) {
        self.receiver = None;
    }

    pub fn is_active(&self) -> bool {
        self.receiver.is_some()
    }
}

#[async_trait]
pub trait AuthService: Send + Sync {
    async fn sign_in(&self, email: &str, password: &SecretString) -> Result<Session, ServiceError>;

    /// Returns `None` when the service requires the address to be confirmed
    /// before a session is issued.
    async fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Option<Session>, ServiceError>;

    async fn sign_out(&self) -> Result<(), ServiceError>;

    async fn current_session(&self) -> Result<Option<Session>, ServiceError>;

    fn subscribe(&self) -> SessionSubscription;
}

/// Record operations, scoped by the service to the signed-in owner.
#[async_trait]
pub trait DataService: Send + Sync {
    /// Ordered by `nombre` ascending.
    async fn list_contacts(&self) -> Result<Vec<Contact>, ServiceError>;
    async fn insert_contact(&self, user_id: Uuid, payload: &ContactPayload) -> Result<Contact, ServiceError>;
    async fn update_contact(&self, id: Uuid, payload: &ContactPayload) -> Result<Contact, ServiceError>;
    async fn delete_contact(&self, id: Uuid) -> Result<(), ServiceError>;

    /// Ordered by `date`, then `time`, each contact embedded.
    async fn list_appointments(&self) -> Result<Vec<AppointmentWithContact>, ServiceError>;
    async fn insert_appointment(
        &self,
        user_id: Uuid,
        payload: &AppointmentPayload,
    ) -> Result<Appointment, ServiceError>;
    async fn update_appointment(
        &self,
        id: Uuid,
        payload: &AppointmentPayload,
    ) -> Result<Appointment, ServiceError>;
    async fn delete_appointment(&self, id: Uuid) -> Result<(), ServiceError>;
}

pub trait Backend: AuthService + DataService {}

impl<T: AuthService + DataService> Backend for T {}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session {
            access_token: "token".to_string(),
            refresh_token: None,
            expires_at: None,
            user: User { id: Uuid::nil(), email: Some("ana@x.com".to_string()) },
        }
    }

    #[test]
    fn test_subscription_receives_events_in_order() {
        let events = SessionEvents::new();
        let mut subscription = events.subscribe();
        events.emit(SessionEvent::SignedIn(session()));
        events.emit(SessionEvent::SignedOut);
        let received = subscription.drain();
        assert_eq!(received, vec![SessionEvent::SignedIn(session()), SessionEvent::SignedOut]);
        assert_eq!(subscription.try_next(), None);
    }

    #[test]
    fn test_unsubscribe_detaches_receiver() {
        let events = SessionEvents::new();
        let mut first = events.subscribe();
        let second = events.subscribe();
        assert_eq!(events.subscriber_count(), 2);
        first.unsubscribe();
        assert_eq!(events.subscriber_count(), 1);
        assert!(!first.is_active());
        drop(second);
        assert_eq!(events.subscriber_count(), 0);
        events.emit(SessionEvent::SignedOut);
        assert_eq!(first.try_next(), None);
    }

    #[test]
    fn test_session_expiry() {
        let mut s = session();
        let now = Utc::now();
        assert!(!s.is_expired(now));
        s.expires_at = Some(now - chrono::Duration::seconds(1));
        assert!(s.is_expired(now));
    }
}
