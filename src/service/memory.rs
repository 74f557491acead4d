//! In-process stand-in for the hosted service.
//!
//! Behaves like a Supabase project with row level security on both tables:
//! every row is owned by the user that inserted it and is invisible to
//! everybody else. Deleting a contact cascades to its appointments.

use super::{
    AuthService, DataService, ServiceError, Session, SessionEvent, SessionEvents,
    SessionSubscription, User,
};
use crate::models::{
    Appointment, AppointmentPayload, AppointmentWithContact, Contact, ContactPayload,
};
use async_trait::async_trait;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Mutex;
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 6;

struct Account {
    id: Uuid,
    email: String,
    password: SecretString,
}

#[derive(Default)]
struct Tables {
    accounts: Vec<Account>,
    session: Option<Session>,
    contacts: Vec<Contact>,
    appointments: Vec<Appointment>,
    unavailable: bool,
    require_confirmation: bool,
}

impl Tables {
    fn check_available(&self) -> Result<(), ServiceError> {
        if self.unavailable {
            return Err(ServiceError::Api { status: 503, message: "Service Unavailable".to_string() });
        }
        Ok(())
    }

    fn owner(&self) -> Result<Uuid, ServiceError> {
        self.check_available()?;
        self.session.as_ref().map(Session::user_id).ok_or(ServiceError::NotAuthenticated)
    }

    fn open_session(&mut self, id: Uuid, email: &str) -> Session {
        let session = Session {
            access_token: Uuid::new_v4().to_string(),
            refresh_token: Some(Uuid::new_v4().to_string()),
            expires_at: None,
            user: User { id, email: Some(email.to_string()) },
        };
        self.session = Some(session.clone());
        session
    }

    fn owned_contact(&self, owner: Uuid, id: Uuid) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.id == id && c.user_id == owner)
    }
}

#[derive(Default)]
pub struct MemoryBackend {
    tables: Mutex<Tables>,
    events: SessionEvents,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sign-ups create the account but issue no session until confirmed.
    pub fn requiring_confirmation() -> Self {
        Self {
            tables: Mutex::new(Tables { require_confirmation: true, ..Tables::default() }),
            events: SessionEvents::new(),
        }
    }

    /// Simulates an outage: every call fails until switched back.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.tables.lock().await.unavailable = unavailable;
    }

    /// Ends the current session from the service side, as an expired or
    /// revoked token would.
    pub async fn end_session(&self) {
        self.tables.lock().await.session = None;
        self.events.emit(SessionEvent::SignedOut);
    }

    pub fn subscriber_count(&self) -> usize {
        self.events.subscriber_count()
    }
}

#[async_trait]
impl AuthService for MemoryBackend {
    async fn sign_in(&self, email: &str, password: &SecretString) -> Result<Session, ServiceError> {
        let mut tables = self.tables.lock().await;
        tables.check_available()?;
        let account = tables
            .accounts
            .iter()
            .find(|a| a.email.eq_ignore_ascii_case(email) && a.password.expose_secret() == password.expose_secret())
            .map(|a| (a.id, a.email.clone()))
            .ok_or_else(|| ServiceError::Auth("Invalid login credentials".to_string()))?;
        let session = tables.open_session(account.0, &account.1);
        drop(tables);
        self.events.emit(SessionEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &SecretString) -> Result<Option<Session>, ServiceError> {
        let mut tables = self.tables.lock().await;
        tables.check_available()?;
        if tables.accounts.iter().any(|a| a.email.eq_ignore_ascii_case(email)) {
            return Err(ServiceError::Auth("User already registered".to_string()));
        }
        if password.expose_secret().chars().count() < MIN_PASSWORD_LEN {
            return Err(ServiceError::Auth(format!(
                "Password should be at least {} characters.",
                MIN_PASSWORD_LEN
            )));
        }
        let id = Uuid::new_v4();
        tables.accounts.push(Account {
            id,
            email: email.to_string(),
            password: SecretString::from(password.expose_secret().to_string()),
        });
        if tables.require_confirmation {
            return Ok(None);
        }
        let session = tables.open_session(id, email);
        drop(tables);
        self.events.emit(SessionEvent::SignedIn(session.clone()));
        Ok(Some(session))
    }

    async fn sign_out(&self) -> Result<(), ServiceError> {
        self.tables.lock().await.session = None;
        self.events.emit(SessionEvent::SignedOut);
        Ok(())
    }

    async fn current_session(&self) -> Result<Option<Session>, ServiceError> {
        let tables = self.tables.lock().await;
        tables.check_available()?;
        Ok(tables.session.clone())
    }

    fn subscribe(&self) -> SessionSubscription {
        self.events.subscribe()
    }
}

#[async_trait]
impl DataService for MemoryBackend {
    async fn list_contacts(&self) -> Result<Vec<Contact>, ServiceError> {
        let tables = self.tables.lock().await;
        let owner = tables.owner()?;
        let mut rows: Vec<Contact> =
            tables.contacts.iter().filter(|c| c.user_id == owner).cloned().collect();
        rows.sort_by(|a, b| a.nombre.cmp(&b.nombre));
        Ok(rows)
    }

    async fn insert_contact(&self, user_id: Uuid, payload: &ContactPayload) -> Result<Contact, ServiceError> {
        let mut tables = self.tables.lock().await;
        let owner = tables.owner()?;
        if owner != user_id {
            return Err(row_security_violation("contacts"));
        }
        let now = Utc::now();
        let contact = Contact {
            id: Uuid::new_v4(),
            user_id,
            nombre: payload.nombre.clone(),
            apellido: payload.apellido.clone(),
            numero: payload.numero.clone(),
            email: payload.email.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.contacts.push(contact.clone());
        Ok(contact)
    }

    async fn update_contact(&self, id: Uuid, payload: &ContactPayload) -> Result<Contact, ServiceError> {
        let mut tables = self.tables.lock().await;
        let owner = tables.owner()?;
        let contact = tables
            .contacts
            .iter_mut()
            .find(|c| c.id == id && c.user_id == owner)
            .ok_or(ServiceError::NotFound(id))?;
        contact.nombre = payload.nombre.clone();
        contact.apellido = payload.apellido.clone();
        contact.numero = payload.numero.clone();
        contact.email = payload.email.clone();
        contact.updated_at = Utc::now();
        Ok(contact.clone())
    }

    async fn delete_contact(&self, id: Uuid) -> Result<(), ServiceError> {
        let mut tables = self.tables.lock().await;
        let owner = tables.owner()?;
        if tables.owned_contact(owner, id).is_some() {
            tables.contacts.retain(|c| c.id != id);
            tables.appointments.retain(|a| a.contact_id != id);
        }
        Ok(())
    }

    async fn list_appointments(&self) -> Result<Vec<AppointmentWithContact>, ServiceError> {
        let tables = self.tables.lock().await;
        let owner = tables.owner()?;
        let mut rows: Vec<AppointmentWithContact> = tables
            .appointments
            .iter()
            .filter(|a| a.user_id == owner)
            .filter_map(|a| {
                tables.owned_contact(owner, a.contact_id).map(|contact| AppointmentWithContact {
                    appointment: a.clone(),
                    contact: contact.clone(),
                })
            })
            .collect();
        rows.sort_by(|a, b| (a.date, a.time).cmp(&(b.date, b.time)));
        Ok(rows)
    }

    async fn insert_appointment(
        &self,
        user_id: Uuid,
        payload: &AppointmentPayload,
    ) -> Result<Appointment, ServiceError> {
        let mut tables = self.tables.lock().await;
        let owner = tables.owner()?;
        if owner != user_id {
            return Err(row_security_violation("appointments"));
        }
        if tables.owned_contact(owner, payload.contact_id).is_none() {
            return Err(foreign_key_violation());
        }
        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            user_id,
            contact_id: payload.contact_id,
            title: payload.title.clone(),
            description: payload.description.clone(),
            date: payload.date,
            time: payload.time,
            status: payload.status,
            created_at: now,
            updated_at: now,
        };
        tables.appointments.push(appointment.clone());
        Ok(appointment)
    }

    async fn update_appointment(
        &self,
        id: Uuid,
        payload: &AppointmentPayload,
    ) -> Result<Appointment, ServiceError> {
        let mut tables = self.tables.lock().await;
        let owner = tables.owner()?;
        if tables.owned_contact(owner, payload.contact_id).is_none() {
            return Err(foreign_key_violation());
        }
        let appointment = tables
            .appointments
            .iter_mut()
            .find(|a| a.id == id && a.user_id == owner)
            .ok_or(ServiceError::NotFound(id))?;
        appointment.contact_id = payload.contact_id;
        appointment.title = payload.title.clone();
        appointment.description = payload.description.clone();
        appointment.date = payload.date;
        appointment.time = payload.time;
        appointment.status = payload.status;
        appointment.updated_at = Utc::now();
        Ok(appointment.clone())
    }

    async fn delete_appointment(&self, id: Uuid) -> Result<(), ServiceError> {
        let mut tables = self.tables.lock().await;
        let owner = tables.owner()?;
        tables.appointments.retain(|a| !(a.id == id && a.user_id == owner));
        Ok(())
    }
}

fn row_security_violation(table: &str) -> ServiceError {
    ServiceError::Api {
        status: 403,
        message: format!("new row violates row-level security policy for table \"{}\"", table),
    }
}

fn foreign_key_violation() -> ServiceError {
    ServiceError::Api {
        status: 409,
        message: "insert or update on table \"appointments\" violates foreign key constraint \"appointments_contact_id_fkey\"".to_string(),
    }
}
