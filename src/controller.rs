//! Root controller: owns the session state and both collections.
//!
//! Every mutation runs the remote call first. On success the affected
//! collection is reloaded whole from the service. On failure the error is
//! handed back unchanged and the in-memory state is left as it was.

use crate::forms::{EditTarget, FormError};
use crate::list_view::{ContactListing, ListView, SortField};
use crate::models::{Appointment, AppointmentPayload, AppointmentWithContact, Contact, ContactPayload};
use crate::service::{Backend, ServiceError, Session, SessionSubscription};
use log::{error, info};
use secrecy::SecretString;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// Shortest UUID prefix accepted as a record address.
pub const MIN_ID_PREFIX: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Loading,
    Authenticated(Session),
}

impl SessionState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Authenticated(session) => Some(session),
            SessionState::Unauthenticated | SessionState::Loading => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Contacts,
    Appointments,
}

impl Tab {
    pub fn label(&self) -> &'static str {
        match self {
            Tab::Contacts => "Contactos",
            Tab::Appointments => "Citas",
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Tab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "contacts" | "contactos" | "contact" | "contacto" => Ok(Tab::Contacts),
            "appointments" | "citas" | "appointment" | "cita" => Ok(Tab::Appointments),
            other => Err(format!("Pestaña desconocida: {}", other)),
        }
    }
}

/// Failures surfaced to the user. Display is the underlying message verbatim.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Auth(ServiceError),
    #[error("{0}")]
    Data(ServiceError),
    #[error(transparent)]
    Form(#[from] FormError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignUpOutcome {
    SignedIn,
    ConfirmationPending,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub session: SessionState,
    pub contacts: Vec<Contact>,
    pub appointments: Vec<AppointmentWithContact>,
    pub tab: Tab,
    pub contact_view: ListView,
}

impl AppState {
    fn new(contact_view: ListView) -> Self {
        Self {
            session: SessionState::Unauthenticated,
            contacts: Vec::new(),
            appointments: Vec::new(),
            tab: Tab::default(),
            contact_view,
        }
    }

    pub fn contact_listing(&self) -> ContactListing<'_> {
        self.contact_view.derive(&self.contacts)
    }
}

pub struct Controller {
    backend: Arc<dyn Backend>,
    subscription: SessionSubscription,
    state: AppState,
}

impl Controller {
    pub fn new(backend: Arc<dyn Backend>, contact_view: ListView) -> Self {
        let subscription = backend.subscribe();
        Self { backend, subscription, state: AppState::new(contact_view) }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn session(&self) -> Option<&Session> {
        self.state.session.session()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().is_some()
    }

    /// Resolves the session present at start-up. The state is `Loading`
    /// until the service answers.
    pub async fn start(&mut self) -> Result<(), AppError> {
        self.state.session = SessionState::Loading;
        let restored = match self.backend.current_session().await {
            Ok(restored) => restored,
            Err(e) => {
                self.state.session = SessionState::Unauthenticated;
                return Err(AppError::Auth(e));
            }
        };
        self.subscription.drain();
        self.apply_session(restored).await
    }

    /// Applies session events received since the last call.
    pub async fn sync_session(&mut self) -> Result<(), AppError> {
        let mut result = Ok(());
        for event in self.subscription.drain() {
            if let Err(e) = self.apply_session(event.session().cloned()).await {
                result = Err(e);
            }
        }
        result
    }

    async fn apply_session(&mut self, session: Option<Session>) -> Result<(), AppError> {
        match session {
            Some(session) => {
                let same_user = self.session().map(Session::user_id) == Some(session.user_id());
                self.state.session = SessionState::Authenticated(session);
                if same_user {
                    return Ok(());
                }
                info!("Session started for {}", self.session().map(Session::email).unwrap_or(""));
                // The previous owner's rows must not outlive a failed reload.
                self.state.contacts.clear();
                self.state.appointments.clear();
                self.reload_all().await
            }
            None => {
                if self.is_authenticated() {
                    info!("Session ended");
                }
                self.state.session = SessionState::Unauthenticated;
                self.state.contacts.clear();
                self.state.appointments.clear();
                Ok(())
            }
        }
    }

    pub async fn sign_in(&mut self, email: &str, password: &SecretString) -> Result<(), AppError> {
        let session = self.backend.sign_in(email, password).await.map_err(AppError::Auth)?;
        // The returned session supersedes whatever the call announced.
        self.subscription.drain();
        self.apply_session(Some(session)).await
    }

    pub async fn sign_up(&mut self, email: &str, password: &SecretString) -> Result<SignUpOutcome, AppError> {
        let session = self.backend.sign_up(email, password).await.map_err(AppError::Auth)?;
        self.subscription.drain();
        match session {
            Some(session) => {
                self.apply_session(Some(session)).await?;
                Ok(SignUpOutcome::SignedIn)
            }
            None => Ok(SignUpOutcome::ConfirmationPending),
        }
    }

    pub async fn sign_out(&mut self) -> Result<(), AppError> {
        let result = self.backend.sign_out().await.map_err(AppError::Auth);
        self.subscription.drain();
        self.apply_session(None).await?;
        result
    }

    async fn reload_all(&mut self) -> Result<(), AppError> {
        let contacts = self.reload_contacts().await;
        let appointments = self.reload_appointments().await;
        contacts.and(appointments)
    }

    pub async fn reload_contacts(&mut self) -> Result<(), AppError> {
        let contacts = self.backend.list_contacts().await.map_err(|e| {
            error!("Failed to load contacts: {}", e);
            AppError::Data(e)
        })?;
        info!("Loaded {} contacts", contacts.len());
        self.state.contacts = contacts;
        Ok(())
    }

    pub async fn reload_appointments(&mut self) -> Result<(), AppError> {
        let appointments = self.backend.list_appointments().await.map_err(|e| {
            error!("Failed to load appointments: {}", e);
            AppError::Data(e)
        })?;
        info!("Loaded {} appointments", appointments.len());
        self.state.appointments = appointments;
        Ok(())
    }

    fn owner(&self) -> Result<Uuid, AppError> {
        self.session()
            .map(Session::user_id)
            .ok_or(AppError::Auth(ServiceError::NotAuthenticated))
    }

    pub async fn save_contact(
        &mut self,
        target: EditTarget<Contact>,
        payload: ContactPayload,
    ) -> Result<Contact, AppError> {
        let owner = self.owner()?;
        let saved = match &target {
            EditTarget::Creating => self.backend.insert_contact(owner, &payload).await,
            EditTarget::Editing(contact) => self.backend.update_contact(contact.id, &payload).await,
        }
        .map_err(failed("save contact"))?;

        self.reload_contacts().await?;
        if target.is_editing() {
            // Appointments embed the contact they point at.
            self.reload_appointments().await?;
        }
        Ok(saved)
    }

    pub async fn delete_contact(&mut self, id: Uuid) -> Result<(), AppError> {
        self.owner()?;
        self.backend.delete_contact(id).await.map_err(failed("delete contact"))?;
        self.reload_contacts().await?;
        self.reload_appointments().await
    }

    pub async fn save_appointment(
        &mut self,
        target: EditTarget<Appointment>,
        payload: AppointmentPayload,
    ) -> Result<Appointment, AppError> {
        let owner = self.owner()?;
        let saved = match &target {
            EditTarget::Creating => self.backend.insert_appointment(owner, &payload).await,
            EditTarget::Editing(appointment) => {
                self.backend.update_appointment(appointment.id, &payload).await
            }
        }
        .map_err(failed("save appointment"))?;

        self.reload_appointments().await?;
        Ok(saved)
    }

    pub async fn delete_appointment(&mut self, id: Uuid) -> Result<(), AppError> {
        self.owner()?;
        self.backend.delete_appointment(id).await.map_err(failed("delete appointment"))?;
        self.reload_appointments().await
    }

    pub fn set_tab(&mut self, tab: Tab) {
        self.state.tab = tab;
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.state.contact_view.set_search(search);
    }

    pub fn toggle_sort(&mut self, field: SortField) {
        self.state.contact_view.toggle_sort(field);
    }

    /// `key` is either a 1-based position in the current contact listing or
    /// a unique id prefix.
    pub fn find_contact(&self, key: &str) -> Option<&Contact> {
        if let Ok(position) = key.parse::<usize>() {
            let listing = self.state.contact_listing();
            return position.checked_sub(1).and_then(|i| listing.rows.get(i).copied());
        }
        unique_by_prefix(&self.state.contacts, key, |c| c.id)
    }

    /// Same addressing as [`Controller::find_contact`], over appointments in
    /// service order.
    pub fn find_appointment(&self, key: &str) -> Option<&AppointmentWithContact> {
        if let Ok(position) = key.parse::<usize>() {
            return position.checked_sub(1).and_then(|i| self.state.appointments.get(i));
        }
        unique_by_prefix(&self.state.appointments, key, |a| a.id)
    }

    /// Detaches from the session event stream. Later events are ignored.
    pub fn shutdown(&mut self) {
        self.subscription.unsubscribe();
    }

    pub fn is_listening(&self) -> bool {
        self.subscription.is_active()
    }
}

fn failed(action: &'static str) -> impl Fn(ServiceError) -> AppError {
    move |e| {
        error!("Failed to {}: {}", action, e);
        AppError::Data(e)
    }
}

fn unique_by_prefix<'a, T>(items: &'a [T], key: &str, id: impl Fn(&T) -> Uuid) -> Option<&'a T> {
    let key = key.trim().to_lowercase();
    if key.len() < MIN_ID_PREFIX {
        return None;
    }
    let mut found = items.iter().filter(|item| id(item).to_string().starts_with(&key));
    let first = found.next()?;
    match found.next() {
        Some(_) => None,
        None => Some(first),
    }
}
