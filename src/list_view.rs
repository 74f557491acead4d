//! Filtering and sorting of the contact list.
//!
//! Everything here is a pure derivation over a borrowed slice: the source
//! collection is never reordered or modified, and every change to the search
//! text or sort settings recomputes the whole listing.

use crate::models::Contact;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    #[default]
    Nombre,
    Apellido,
    Email,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Nombre => "nombre",
            SortField::Apellido => "apellido",
            SortField::Email => "email",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortField::Nombre => "Nombre",
            SortField::Apellido => "Apellido",
            SortField::Email => "Email",
        }
    }

    pub fn key<'a>(&self, contact: &'a Contact) -> &'a str {
        match self {
            SortField::Nombre => &contact.nombre,
            SortField::Apellido => &contact.apellido,
            SortField::Email => &contact.email,
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "nombre" | "name" | "first" => Ok(SortField::Nombre),
            "apellido" | "surname" | "last" => Ok(SortField::Apellido),
            "email" | "correo" => Ok(SortField::Email),
            other => Err(format!("Campo de orden desconocido '{}'. Use nombre, apellido o email", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            SortOrder::Asc => "↑",
            SortOrder::Desc => "↓",
        }
    }

    fn apply(&self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => f.write_str("asc"),
            SortOrder::Desc => f.write_str("desc"),
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Asc),
            "desc" | "descending" => Ok(SortOrder::Desc),
            other => Err(format!("Orden desconocido '{}'. Use asc o desc", other)),
        }
    }
}

/// Informational row shown instead of an empty listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    NoContacts,
    NoMatches,
}

impl Placeholder {
    pub fn message(&self) -> &'static str {
        match self {
            Placeholder::NoContacts => "No hay contactos aún",
            Placeholder::NoMatches => "No se encontraron contactos",
        }
    }
}

/// The derived sequence for one render.
#[derive(Debug)]
pub struct ContactListing<'a> {
    pub rows: Vec<&'a Contact>,
    pub placeholder: Option<Placeholder>,
}

/// Search text and sort settings of the contact list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListView {
    search: String,
    sort_field: SortField,
    sort_order: SortOrder,
}

impl ListView {
    pub fn new(sort_field: SortField, sort_order: SortOrder) -> Self {
        Self { search: String::new(), sort_field, sort_order }
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.search = search.into();
    }

    pub fn sort_field(&self) -> SortField {
        self.sort_field
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    /// Re-selecting the active field flips the order; a new field starts
    /// ascending.
    pub fn toggle_sort(&mut self, field: SortField) {
        if self.sort_field == field {
            self.sort_order = self.sort_order.toggled();
        } else {
            self.sort_field = field;
            self.sort_order = SortOrder::Asc;
        }
    }

    pub fn derive<'a>(&self, contacts: &'a [Contact]) -> ContactListing<'a> {
        let mut rows = filter_contacts(contacts, &self.search);
        sort_contacts(&mut rows, self.sort_field, self.sort_order);
        let placeholder = if rows.is_empty() {
            Some(if self.search.is_empty() { Placeholder::NoContacts } else { Placeholder::NoMatches })
        } else {
            None
        };
        ContactListing { rows, placeholder }
    }
}

/// Name, surname and email match case-insensitively; the phone number only
/// matches the raw search text.
pub fn matches(contact: &Contact, search: &str) -> bool {
    let needle = search.to_lowercase();
    contact.nombre.to_lowercase().contains(&needle)
        || contact.apellido.to_lowercase().contains(&needle)
        || contact.numero.contains(search)
        || contact.email.to_lowercase().contains(&needle)
}

pub fn filter_contacts<'a>(contacts: &'a [Contact], search: &str) -> Vec<&'a Contact> {
    contacts.iter().filter(|contact| matches(contact, search)).collect()
}

/// Stable sort on the lowercased field value.
pub fn sort_contacts(rows: &mut [&Contact], field: SortField, order: SortOrder) {
    rows.sort_by(|a, b| {
        let a_value = field.key(a).to_lowercase();
        let b_value = field.key(b).to_lowercase();
        order.apply(locale_compare(&a_value, &b_value))
    });
}

/// Dictionary-style comparison: punctuation and spaces sort before digits,
/// digits before letters, and accented letters sort with their base letter.
/// Strings that only differ in accents fall back to code point order.
pub fn locale_compare(a: &str, b: &str) -> Ordering {
    let primary = a.chars().map(collation_weight).cmp(b.chars().map(collation_weight));
    primary.then_with(|| a.cmp(b))
}

fn collation_weight(c: char) -> (u8, char) {
    let base = fold_diacritic(c);
    let class = if base.is_alphabetic() {
        2
    } else if base.is_numeric() {
        1
    } else {
        0
    };
    (class, base)
}

fn fold_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' | 'â' | 'ã' | 'å' => 'a',
        'Á' | 'À' | 'Ä' | 'Â' | 'Ã' | 'Å' => 'A',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'É' | 'È' | 'Ë' | 'Ê' => 'E',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'Í' | 'Ì' | 'Ï' | 'Î' => 'I',
        'ó' | 'ò' | 'ö' | 'ô' | 'õ' => 'o',
        'Ó' | 'Ò' | 'Ö' | 'Ô' | 'Õ' => 'O',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'Ú' | 'Ù' | 'Ü' | 'Û' => 'U',
        'ñ' => 'n',
        'Ñ' => 'N',
        'ç' => 'c',
        'Ç' => 'C',
        _ => c,
    }
}
