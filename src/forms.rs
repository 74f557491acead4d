//! Contact and appointment forms.
//!
//! A form holds the raw text of each editable field, seeded from the record
//! being edited or blank when creating. `submit` checks presence and the
//! shape a typed input would enforce, then packages only the editable
//! fields. Identity, owner and timestamps never pass through a form.

use crate::models::{
    Appointment, AppointmentPayload, AppointmentStatus, Contact, ContactPayload,
};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

/// What a form submission will do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditTarget<T> {
    Creating,
    Editing(T),
}

impl<T> EditTarget<T> {
    pub fn record(&self) -> Option<&T> {
        match self {
            EditTarget::Creating => None,
            EditTarget::Editing(record) => Some(record),
        }
    }

    pub fn is_editing(&self) -> bool {
        matches!(self, EditTarget::Editing(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("El campo '{0}' es obligatorio")]
    MissingField(&'static str),
    #[error("'{0}' no es un email válido")]
    InvalidEmail(String),
    #[error("Fecha inválida '{0}' (use AAAA-MM-DD)")]
    InvalidDate(String),
    #[error("Hora inválida '{0}' (use HH:MM)")]
    InvalidTime(String),
    #[error("Contacto desconocido '{0}'")]
    UnknownContact(String),
    #[error("{0}")]
    InvalidStatus(String),
}

// Same acceptance rule as an HTML email input.
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$",
    )
    .expect("email pattern is valid")
});

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

pub trait FormField: Copy + 'static {
    /// Machine name, as used for command line flags.
    fn key(&self) -> &'static str;
    fn label(&self) -> &'static str;
    fn required(&self) -> bool;
}

/// Field access shared by both forms, so a front end can fill either one
/// field by field.
pub trait Form {
    type Field: FormField;

    fn fields(&self) -> &'static [Self::Field];
    fn value(&self, field: Self::Field) -> &str;
    fn set(&mut self, field: Self::Field, value: String);
    fn title(&self) -> &'static str;
    fn submit_label(&self) -> &'static str;
}

fn required(field: impl FormField, value: &str) -> Result<String, FormError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FormError::MissingField(field.label()));
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactField {
    Nombre,
    Apellido,
    Numero,
    Email,
}

impl FormField for ContactField {
    fn key(&self) -> &'static str {
        match self {
            ContactField::Nombre => "nombre",
            ContactField::Apellido => "apellido",
            ContactField::Numero => "numero",
            ContactField::Email => "email",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ContactField::Nombre => "Nombre",
            ContactField::Apellido => "Apellido",
            ContactField::Numero => "Número",
            ContactField::Email => "Email",
        }
    }

    fn required(&self) -> bool {
        true
    }
}

const CONTACT_FIELDS: [ContactField; 4] =
    [ContactField::Nombre, ContactField::Apellido, ContactField::Numero, ContactField::Email];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactForm {
    target: EditTarget<Contact>,
    nombre: String,
    apellido: String,
    numero: String,
    email: String,
}

impl ContactForm {
    pub fn new(target: EditTarget<Contact>) -> Self {
        let (nombre, apellido, numero, email) = match &target {
            EditTarget::Editing(c) => {
                (c.nombre.clone(), c.apellido.clone(), c.numero.clone(), c.email.clone())
            }
            EditTarget::Creating => Default::default(),
        };
        Self { target, nombre, apellido, numero, email }
    }

    pub fn target(&self) -> &EditTarget<Contact> {
        &self.target
    }

    pub fn into_target(self) -> EditTarget<Contact> {
        self.target
    }

    pub fn submit(&self) -> Result<ContactPayload, FormError> {
        let payload = ContactPayload {
            nombre: required(ContactField::Nombre, &self.nombre)?,
            apellido: required(ContactField::Apellido, &self.apellido)?,
            numero: required(ContactField::Numero, &self.numero)?,
            email: required(ContactField::Email, &self.email)?,
        };
        if !is_valid_email(&payload.email) {
            return Err(FormError::InvalidEmail(payload.email));
        }
        Ok(payload)
    }
}

impl Form for ContactForm {
    type Field = ContactField;

    fn fields(&self) -> &'static [ContactField] {
        &CONTACT_FIELDS
    }

    fn value(&self, field: ContactField) -> &str {
        match field {
            ContactField::Nombre => &self.nombre,
            ContactField::Apellido => &self.apellido,
            ContactField::Numero => &self.numero,
            ContactField::Email => &self.email,
        }
    }

    fn set(&mut self, field: ContactField, value: String) {
        match field {
            ContactField::Nombre => self.nombre = value,
            ContactField::Apellido => self.apellido = value,
            ContactField::Numero => self.numero = value,
            ContactField::Email => self.email = value,
        }
    }

    fn title(&self) -> &'static str {
        if self.target.is_editing() {
            "Modificar Contacto"
        } else {
            "Agregar Contacto"
        }
    }

    fn submit_label(&self) -> &'static str {
        if self.target.is_editing() {
            "Guardar Cambios"
        } else {
            "Agregar"
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentField {
    Contact,
    Title,
    Description,
    Date,
    Time,
    Status,
}

impl FormField for AppointmentField {
    fn key(&self) -> &'static str {
        match self {
            AppointmentField::Contact => "contact",
            AppointmentField::Title => "title",
            AppointmentField::Description => "description",
            AppointmentField::Date => "date",
            AppointmentField::Time => "time",
            AppointmentField::Status => "status",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            AppointmentField::Contact => "Contacto",
            AppointmentField::Title => "Título",
            AppointmentField::Description => "Descripción",
            AppointmentField::Date => "Fecha",
            AppointmentField::Time => "Hora",
            AppointmentField::Status => "Estado",
        }
    }

    fn required(&self) -> bool {
        !matches!(self, AppointmentField::Description)
    }
}

const APPOINTMENT_FIELDS: [AppointmentField; 6] = [
    AppointmentField::Contact,
    AppointmentField::Title,
    AppointmentField::Description,
    AppointmentField::Date,
    AppointmentField::Time,
    AppointmentField::Status,
];

/// `contact` holds the id of the selected contact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentForm {
    target: EditTarget<Appointment>,
    contact: String,
    title: String,
    description: String,
    date: String,
    time: String,
    status: String,
}

impl AppointmentForm {
    pub fn new(target: EditTarget<Appointment>) -> Self {
        let mut form = Self {
            target: EditTarget::Creating,
            contact: String::new(),
            title: String::new(),
            description: String::new(),
            date: String::new(),
            time: String::new(),
            status: AppointmentStatus::default().as_str().to_string(),
        };
        if let EditTarget::Editing(a) = &target {
            form.contact = a.contact_id.to_string();
            form.title = a.title.clone();
            form.description = a.description.clone().unwrap_or_default();
            form.date = a.date.format("%Y-%m-%d").to_string();
            form.time = a.time.format("%H:%M").to_string();
            form.status = a.status.as_str().to_string();
        }
        form.target = target;
        form
    }

    pub fn target(&self) -> &EditTarget<Appointment> {
        &self.target
    }

    pub fn into_target(self) -> EditTarget<Appointment> {
        self.target
    }

    /// `contacts` are the selectable contacts; the chosen one must be among
    /// them.
    pub fn submit(&self, contacts: &[Contact]) -> Result<AppointmentPayload, FormError> {
        let contact = required(AppointmentField::Contact, &self.contact)?;
        let contact_id = Uuid::parse_str(&contact)
            .ok()
            .filter(|id| contacts.iter().any(|c| c.id == *id))
            .ok_or_else(|| FormError::UnknownContact(contact.clone()))?;
        let title = required(AppointmentField::Title, &self.title)?;
        let date = required(AppointmentField::Date, &self.date)?;
        let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
            .map_err(|_| FormError::InvalidDate(date.clone()))?;
        let time = required(AppointmentField::Time, &self.time)?;
        let time = crate::models::time_format::parse(&time).ok_or(FormError::InvalidTime(time))?;
        let status = required(AppointmentField::Status, &self.status)?
            .parse::<AppointmentStatus>()
            .map_err(FormError::InvalidStatus)?;
        let description = Some(self.description.trim().to_string()).filter(|d| !d.is_empty());

        Ok(AppointmentPayload { contact_id, title, description, date, time, status })
    }
}

impl Form for AppointmentForm {
    type Field = AppointmentField;

    fn fields(&self) -> &'static [AppointmentField] {
        &APPOINTMENT_FIELDS
    }

    fn value(&self, field: AppointmentField) -> &str {
        match field {
            AppointmentField::Contact => &self.contact,
            AppointmentField::Title => &self.title,
            AppointmentField::Description => &self.description,
            AppointmentField::Date => &self.date,
            AppointmentField::Time => &self.time,
            AppointmentField::Status => &self.status,
        }
    }

    fn set(&mut self, field: AppointmentField, value: String) {
        match field {
            AppointmentField::Contact => self.contact = value,
            AppointmentField::Title => self.title = value,
            AppointmentField::Description => self.description = value,
            AppointmentField::Date => self.date = value,
            AppointmentField::Time => self.time = value,
            AppointmentField::Status => self.status = value,
        }
    }

    fn title(&self) -> &'static str {
        if self.target.is_editing() {
            "Modificar Cita"
        } else {
            "Agendar Cita"
        }
    }

    fn submit_label(&self) -> &'static str {
        if self.target.is_editing() {
            "Guardar Cambios"
        } else {
            "Agendar"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, Utc};
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn contact() -> Contact {
        Contact {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            nombre: "Ana".to_string(),
            apellido: "Zeta".to_string(),
            numero: "111".to_string(),
            email: "a@x.com".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn filled_contact_form() -> ContactForm {
        let mut form = ContactForm::new(EditTarget::Creating);
        form.set(ContactField::Nombre, " Beto ".to_string());
        form.set(ContactField::Apellido, "Alfa".to_string());
        form.set(ContactField::Numero, "222".to_string());
        form.set(ContactField::Email, "b@x.com".to_string());
        form
    }

    #[test]
    fn test_editing_seeds_fields() {
        let existing = contact();
        let form = ContactForm::new(EditTarget::Editing(existing.clone()));
        assert_eq!(form.value(ContactField::Nombre), "Ana");
        assert_eq!(form.value(ContactField::Email), "a@x.com");
        assert_eq!(form.title(), "Modificar Contacto");
        assert_eq!(form.submit_label(), "Guardar Cambios");
        assert_eq!(form.target().record(), Some(&existing));
    }

    #[test]
    fn test_creating_starts_blank() {
        let form = ContactForm::new(EditTarget::Creating);
        assert!(form.fields().iter().all(|f| form.value(*f).is_empty()));
        assert_eq!(form.title(), "Agregar Contacto");
    }

    #[test]
    fn test_submit_packages_trimmed_fields() {
        let payload = filled_contact_form().submit().unwrap();
        assert_eq!(
            payload,
            ContactPayload {
                nombre: "Beto".to_string(),
                apellido: "Alfa".to_string(),
                numero: "222".to_string(),
                email: "b@x.com".to_string(),
            }
        );
    }

    #[test_case(ContactField::Nombre, "Nombre")]
    #[test_case(ContactField::Apellido, "Apellido")]
    #[test_case(ContactField::Numero, "Número")]
    #[test_case(ContactField::Email, "Email")]
    fn test_missing_required_field(field: ContactField, label: &'static str) {
        let mut form = filled_contact_form();
        form.set(field, "   ".to_string());
        assert_eq!(form.submit(), Err(FormError::MissingField(label)));
    }

    #[test_case("ana@example.com", true)]
    #[test_case("ana.maria+agenda@sub.example.es", true)]
    #[test_case("ana@", false)]
    #[test_case("ana example@x.com", false)]
    #[test_case("@x.com", false)]
    fn test_email_shape(value: &str, valid: bool) {
        assert_eq!(is_valid_email(value), valid);
    }

    #[test]
    fn test_appointment_form_round_trips_existing_record() {
        let c = contact();
        let existing = Appointment {
            id: Uuid::new_v4(),
            user_id: c.user_id,
            contact_id: c.id,
            title: "Dentista".to_string(),
            description: Some("Revisión anual".to_string()),
            date: NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(),
            time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            status: AppointmentStatus::Confirmed,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let form = AppointmentForm::new(EditTarget::Editing(existing.clone()));
        assert_eq!(form.value(AppointmentField::Time), "08:00");
        let payload = form.submit(&[c]).unwrap();
        assert_eq!(payload.contact_id, existing.contact_id);
        assert_eq!(payload.date, existing.date);
        assert_eq!(payload.time, existing.time);
        assert_eq!(payload.status, AppointmentStatus::Confirmed);
        assert_eq!(payload.description.as_deref(), Some("Revisión anual"));
    }

    #[test]
    fn test_appointment_form_validation() {
        let c = contact();
        let mut form = AppointmentForm::new(EditTarget::Creating);
        assert_eq!(form.value(AppointmentField::Status), "pending");
        assert_eq!(form.submit(&[c.clone()]), Err(FormError::MissingField("Contacto")));

        form.set(AppointmentField::Contact, Uuid::new_v4().to_string());
        form.set(AppointmentField::Title, "Cita".to_string());
        form.set(AppointmentField::Date, "2025-02-30".to_string());
        form.set(AppointmentField::Time, "10:00".to_string());
        assert!(matches!(form.submit(&[c.clone()]), Err(FormError::UnknownContact(_))));

        form.set(AppointmentField::Contact, c.id.to_string());
        assert_eq!(form.submit(&[c.clone()]), Err(FormError::InvalidDate("2025-02-30".to_string())));

        form.set(AppointmentField::Date, "2025-02-28".to_string());
        form.set(AppointmentField::Time, "25:00".to_string());
        assert_eq!(form.submit(&[c.clone()]), Err(FormError::InvalidTime("25:00".to_string())));

        form.set(AppointmentField::Time, "10:00".to_string());
        let payload = form.submit(&[c]).unwrap();
        assert_eq!(payload.description, None);
        assert_eq!(payload.status, AppointmentStatus::Pending);
    }
}
