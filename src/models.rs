//! Record types exchanged with the hosted data service.
//!
//! Field names match the column names of the `contacts` and `appointments`
//! tables, so the structs serialize straight onto the wire.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: Uuid,
    pub user_id: Uuid,
    pub nombre: String,
    pub apellido: String,
    pub numero: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contact {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.nombre, self.apellido)
    }
}

/// Editable fields of a contact, as produced by the contact form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactPayload {
    pub nombre: String,
    pub apellido: String,
    pub numero: String,
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

/// Visual category a status is rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCategory {
    Warning,
    Success,
    Danger,
    Neutral,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 4] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Confirmed,
        AppointmentStatus::Cancelled,
        AppointmentStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Completed => "completed",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "Pendiente",
            AppointmentStatus::Confirmed => "Confirmada",
            AppointmentStatus::Cancelled => "Cancelada",
            AppointmentStatus::Completed => "Completada",
        }
    }

    pub fn category(&self) -> StatusCategory {
        match self {
            AppointmentStatus::Pending => StatusCategory::Warning,
            AppointmentStatus::Confirmed => StatusCategory::Success,
            AppointmentStatus::Cancelled => StatusCategory::Danger,
            AppointmentStatus::Completed => StatusCategory::Neutral,
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    /// Accepts the wire name or the Spanish display label.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        AppointmentStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == needle || status.label().to_lowercase() == needle)
            .ok_or_else(|| {
                format!("Estado desconocido '{}'. Valores válidos: pending, confirmed, cancelled, completed", s)
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub contact_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub date: NaiveDate,
    #[serde(with = "time_format")]
    pub time: NaiveTime,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An appointment with its contact embedded, as returned by the joined
/// listing query. Display only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentWithContact {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub contact: Contact,
}

impl std::ops::Deref for AppointmentWithContact {
    type Target = Appointment;

    fn deref(&self) -> &Appointment {
        &self.appointment
    }
}

/// Editable fields of an appointment, as produced by the appointment form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentPayload {
    pub contact_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    #[serde(with = "time_format")]
    pub time: NaiveTime,
    pub status: AppointmentStatus,
}

/// Insert body: the editable fields plus the owner reference.
#[derive(Debug, Serialize)]
pub struct Owned<'a, P> {
    #[serde(flatten)]
    pub fields: &'a P,
    pub user_id: Uuid,
}

/// Update body: the editable fields plus a fresh `updated_at`.
#[derive(Debug, Serialize)]
pub struct Stamped<'a, P> {
    #[serde(flatten)]
    pub fields: &'a P,
    pub updated_at: DateTime<Utc>,
}

/// `time` columns come back as `HH:MM:SS`; older rows and hand-written
/// payloads may carry `HH:MM`.
pub mod time_format {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const WIRE_FORMAT: &str = "%H:%M:%S";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(WIRE_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid time '{}'", raw)))
    }

    pub fn parse(raw: &str) -> Option<NaiveTime> {
        let raw = raw.trim();
        NaiveTime::parse_from_str(raw, "%H:%M:%S%.f")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_appointment_with_contact_decodes_joined_row() {
        let row = json!({
            "id": "6f1c2f5e-8a53-4a4e-9a38-3e8f0c1f1a01",
            "user_id": "0b7d8a4c-1111-4c3e-8f4b-3a2b1c0d9e8f",
            "contact_id": "a3c6d1e2-2222-4f5a-9b8c-7d6e5f4a3b2c",
            "title": "Revisión",
            "description": null,
            "date": "2025-03-15",
            "time": "09:30:00",
            "status": "confirmed",
            "created_at": "2025-03-01T10:00:00.123456+00:00",
            "updated_at": "2025-03-01T10:00:00+00:00",
            "contact": {
                "id": "a3c6d1e2-2222-4f5a-9b8c-7d6e5f4a3b2c",
                "user_id": "0b7d8a4c-1111-4c3e-8f4b-3a2b1c0d9e8f",
                "nombre": "Ana",
                "apellido": "Zeta",
                "numero": "111",
                "email": "a@x.com",
                "created_at": "2025-02-01T10:00:00+00:00",
                "updated_at": "2025-02-01T10:00:00+00:00"
            }
        });

        let decoded: AppointmentWithContact = serde_json::from_value(row).unwrap();
        assert_eq!(decoded.title, "Revisión");
        assert_eq!(decoded.time, NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert_eq!(decoded.status, AppointmentStatus::Confirmed);
        assert_eq!(decoded.contact.full_name(), "Ana Zeta");
        assert_eq!(decoded.description, None);
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let result: Result<AppointmentStatus, _> = serde_json::from_value(json!("postponed"));
        assert!(result.is_err());
    }

    #[test]
    fn test_status_parses_wire_name_and_label() {
        assert_eq!("completed".parse::<AppointmentStatus>(), Ok(AppointmentStatus::Completed));
        assert_eq!("Cancelada".parse::<AppointmentStatus>(), Ok(AppointmentStatus::Cancelled));
        assert!("later".parse::<AppointmentStatus>().is_err());
    }

    #[test]
    fn test_new_appointments_default_to_pending() {
        assert_eq!(AppointmentStatus::default(), AppointmentStatus::Pending);
    }

    #[test]
    fn test_payload_serializes_time_with_seconds() {
        let payload = AppointmentPayload {
            contact_id: Uuid::nil(),
            title: "Café".to_string(),
            description: None,
            date: NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
            time: NaiveTime::from_hms_opt(8, 5, 0).unwrap(),
            status: AppointmentStatus::Pending,
        };
        let body = serde_json::to_value(Owned { fields: &payload, user_id: Uuid::nil() }).unwrap();
        assert_eq!(body["time"], "08:05:00");
        assert_eq!(body["date"], "2025-01-02");
        assert_eq!(body["status"], "pending");
        assert_eq!(body["user_id"], Uuid::nil().to_string());
    }

    #[test]
    fn test_time_format_accepts_short_form() {
        assert_eq!(time_format::parse("18:45"), NaiveTime::from_hms_opt(18, 45, 0));
        assert_eq!(time_format::parse("7pm"), None);
    }
}
