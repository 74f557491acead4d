//! Plain-text rendering of the application state.
//!
//! Everything here is a pure function of borrowed state and returns a
//! `String`, so the output can be asserted on directly.

use crate::controller::{AppState, Tab};
use crate::list_view::{ContactListing, ListView, SortField};
use crate::models::{AppointmentStatus, AppointmentWithContact, Contact, StatusCategory};
use chrono::{Datelike, NaiveDate};

pub const NO_APPOINTMENTS: &str = "No hay citas agendadas";

const MONTHS: [&str; 12] = [
    "enero", "febrero", "marzo", "abril", "mayo", "junio", "julio", "agosto", "septiembre",
    "octubre", "noviembre", "diciembre",
];

const RESET: &str = "\x1b[0m";

/// `15 de marzo de 2025`
pub fn long_date(date: NaiveDate) -> String {
    format!("{} de {} de {}", date.day(), MONTHS[date.month0() as usize], date.year())
}

fn ansi(category: StatusCategory) -> &'static str {
    match category {
        StatusCategory::Warning => "\x1b[33m",
        StatusCategory::Success => "\x1b[32m",
        StatusCategory::Danger => "\x1b[31m",
        StatusCategory::Neutral => "\x1b[90m",
    }
}

pub fn status_badge(status: AppointmentStatus, color: bool) -> String {
    if color {
        format!("{}{}{}", ansi(status.category()), status.label(), RESET)
    } else {
        status.label().to_string()
    }
}

pub fn header(state: &AppState) -> String {
    let email = state.session.session().map(|s| s.email()).unwrap_or("");
    let tab = |tab: Tab, count: usize| {
        let label = format!("{} ({})", tab.label(), count);
        if state.tab == tab {
            format!("[{}]", label)
        } else {
            format!(" {} ", label)
        }
    };
    format!(
        "{}\n{} {}",
        email,
        tab(Tab::Contacts, state.contacts.len()),
        tab(Tab::Appointments, state.appointments.len())
    )
}

/// Column headings; the active sort column carries its direction arrow.
pub fn sort_buttons(view: &ListView) -> String {
    [SortField::Nombre, SortField::Apellido, SortField::Email]
        .iter()
        .map(|field| {
            if *field == view.sort_field() {
                format!("[{} {}]", field.label(), view.sort_order().arrow())
            } else {
                format!("[{}]", field.label())
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn width(cells: impl Iterator<Item = usize>, heading: &str) -> usize {
    cells.max().unwrap_or(0).max(heading.chars().count())
}

fn pad(value: &str, width: usize) -> String {
    let fill = width.saturating_sub(value.chars().count());
    format!("{}{}", value, " ".repeat(fill))
}

pub fn contact_table(listing: &ContactListing<'_>, view: &ListView) -> String {
    let mut out = String::new();
    if !view.search().is_empty() {
        out.push_str(&format!("Búsqueda: {}\n", view.search()));
    }
    out.push_str(&sort_buttons(view));
    out.push('\n');

    if let Some(placeholder) = listing.placeholder {
        out.push_str(placeholder.message());
        out.push('\n');
        return out;
    }

    let rows = &listing.rows;
    let w_nombre = width(rows.iter().map(|c| c.nombre.chars().count()), "Nombre");
    let w_apellido = width(rows.iter().map(|c| c.apellido.chars().count()), "Apellido");
    let w_numero = width(rows.iter().map(|c| c.numero.chars().count()), "Número");
    let w_index = rows.len().to_string().len();

    out.push_str(&format!(
        "{}  {}  {}  {}  Email\n",
        " ".repeat(w_index),
        pad("Nombre", w_nombre),
        pad("Apellido", w_apellido),
        pad("Número", w_numero)
    ));
    for (i, contact) in rows.iter().enumerate() {
        out.push_str(&format!(
            "{:>w_index$}  {}  {}  {}  {}\n",
            i + 1,
            pad(&contact.nombre, w_nombre),
            pad(&contact.apellido, w_apellido),
            pad(&contact.numero, w_numero),
            contact.email,
        ));
    }
    out
}

pub fn contact_detail(contact: &Contact) -> String {
    format!(
        "{}\n  Número: {}\n  Email:  {}\n  Id:     {}\n",
        contact.full_name(),
        contact.numero,
        contact.email,
        contact.id
    )
}

/// Rows keep the order they were given in.
pub fn appointment_table(appointments: &[AppointmentWithContact], color: bool) -> String {
    if appointments.is_empty() {
        return format!("{}\n", NO_APPOINTMENTS);
    }
    let w_index = appointments.len().to_string().len();
    let w_title = width(appointments.iter().map(|a| a.title.chars().count()), "Título");
    let dates: Vec<String> = appointments.iter().map(|a| long_date(a.date)).collect();
    let w_date = width(dates.iter().map(|d| d.chars().count()), "Fecha");
    let names: Vec<String> = appointments.iter().map(|a| a.contact.full_name()).collect();
    let w_contact = width(names.iter().map(|n| n.chars().count()), "Contacto");

    let mut out = format!(
        "{}  {}  {}  Hora   {}  Estado\n",
        " ".repeat(w_index),
        pad("Título", w_title),
        pad("Fecha", w_date),
        pad("Contacto", w_contact)
    );
    for (i, appointment) in appointments.iter().enumerate() {
        out.push_str(&format!(
            "{:>w_index$}  {}  {}  {}  {}  {}\n",
            i + 1,
            pad(&appointment.title, w_title),
            pad(&dates[i], w_date),
            appointment.time.format("%H:%M"),
            pad(&names[i], w_contact),
            status_badge(appointment.status, color),
        ));
    }
    out
}

pub fn appointment_detail(appointment: &AppointmentWithContact, color: bool) -> String {
    let mut out = format!(
        "{}\n  Contacto: {}\n  Fecha:    {}\n  Hora:     {}\n  Estado:   {}\n",
        appointment.title,
        appointment.contact.full_name(),
        long_date(appointment.date),
        appointment.time.format("%H:%M"),
        status_badge(appointment.status, color),
    );
    if let Some(description) = &appointment.description {
        out.push_str(&format!("  {}\n", description));
    }
    out.push_str(&format!("  Id:       {}\n", appointment.id));
    out
}

/// Renders whatever the active tab shows.
pub fn active_tab(state: &AppState, color: bool) -> String {
    let body = match state.tab {
        Tab::Contacts => contact_table(&state.contact_listing(), &state.contact_view),
        Tab::Appointments => appointment_table(&state.appointments, color),
    };
    format!("{}\n\n{}", header(state), body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Appointment;
    use chrono::{NaiveTime, Utc};
    use pretty_assertions::assert_eq;
    use test_case::test_case;
    use uuid::Uuid;

    fn contact(nombre: &str, apellido: &str) -> Contact {
        Contact {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            nombre: nombre.to_string(),
            apellido: apellido.to_string(),
            numero: "111".to_string(),
            email: "a@x.com".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn appointment(title: &str, hour: u32, status: AppointmentStatus) -> AppointmentWithContact {
        let contact = contact("Ana", "Zeta");
        AppointmentWithContact {
            appointment: Appointment {
                id: Uuid::new_v4(),
                user_id: Uuid::nil(),
                contact_id: contact.id,
                title: title.to_string(),
                description: None,
                date: NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(),
                time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
                status,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            contact,
        }
    }

    #[test_case(2025, 3, 15, "15 de marzo de 2025")]
    #[test_case(2024, 1, 1, "1 de enero de 2024")]
    #[test_case(2023, 12, 31, "31 de diciembre de 2023")]
    fn test_long_date(y: i32, m: u32, d: u32, expected: &str) {
        assert_eq!(long_date(NaiveDate::from_ymd_opt(y, m, d).unwrap()), expected);
    }

    #[test]
    fn test_status_badge_colors() {
        assert_eq!(status_badge(AppointmentStatus::Pending, false), "Pendiente");
        assert_eq!(status_badge(AppointmentStatus::Confirmed, true), "\x1b[32mConfirmada\x1b[0m");
        assert_eq!(status_badge(AppointmentStatus::Cancelled, true), "\x1b[31mCancelada\x1b[0m");
    }

    #[test]
    fn test_sort_buttons_mark_active_field() {
        let mut view = ListView::default();
        assert_eq!(sort_buttons(&view), "[Nombre ↑] [Apellido] [Email]");
        view.toggle_sort(SortField::Nombre);
        assert_eq!(sort_buttons(&view), "[Nombre ↓] [Apellido] [Email]");
    }

    #[test]
    fn test_contact_table_placeholder() {
        let view = ListView::default();
        let contacts: Vec<Contact> = Vec::new();
        let out = contact_table(&view.derive(&contacts), &view);
        assert!(out.ends_with("No hay contactos aún\n"));
    }

    #[test]
    fn test_contact_table_numbers_rows() {
        let view = ListView::default();
        let contacts = vec![contact("Beto", "Alfa"), contact("Ana", "Zeta")];
        let out = contact_table(&view.derive(&contacts), &view);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[2].starts_with("1  Ana "));
        assert!(lines[3].starts_with("2  Beto"));
    }

    #[test]
    fn test_appointment_table_keeps_order() {
        assert_eq!(appointment_table(&[], false), "No hay citas agendadas\n");
        let rows = vec![
            appointment("Segunda", 9, AppointmentStatus::Completed),
            appointment("Primera", 8, AppointmentStatus::Pending),
        ];
        let out = appointment_table(&rows, false);
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[1].contains("Segunda") && lines[1].contains("09:00"));
        assert!(lines[2].contains("Primera") && lines[2].ends_with("Pendiente"));
        assert!(lines[1].contains("15 de marzo de 2025"));
    }
}
