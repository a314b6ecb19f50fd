//! Client-side field rules for visitor and booking input.
//!
//! These mirror the booking backend's checks so the visitor gets inline
//! feedback before anything is sent. The backend re-validates everything.
//!
//! Every validator returns `None` when the value is acceptable and
//! `Some(message)` otherwise.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::VisitorData;

pub const NAME_MAX: usize = 255;
pub const ORGANIZATION_MAX: usize = 255;
pub const SPECIAL_REQUIREMENTS_MAX: usize = 1000;
pub const COUNTRY_MAX: usize = 100;
pub const PHONE_RAW_MAX: usize = 20;
pub const PHONE_DIGITS_MIN: usize = 7;
pub const PHONE_DIGITS_MAX: usize = 15;

/// Capacity assumed for live group-size checks when no slot is loaded yet.
pub const FALLBACK_CAPACITY: u32 = 999;

const PHONE_SEPARATORS: [char; 4] = ['-', '(', ')', '.'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Name,
    Email,
    Phone,
    Organization,
    SpecialRequirements,
    VisitorType,
    Country,
    GroupSize,
    Captcha,
    Slot,
    Reason,
    Update,
    Submit,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Email => "email",
            Field::Phone => "phone",
            Field::Organization => "organization",
            Field::SpecialRequirements => "specialRequirements",
            Field::VisitorType => "visitorType",
            Field::Country => "country",
            Field::GroupSize => "groupSize",
            Field::Captcha => "captcha",
            Field::Slot => "slot",
            Field::Reason => "reason",
            Field::Update => "update",
            Field::Submit => "submit",
        }
    }
}

/// Error messages keyed by the field they belong to. A field without an entry
/// is valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<Field, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: Field, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.insert(field, message);
        errors
    }

    pub fn insert(&mut self, field: Field, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    /// Records the outcome of a validator: stores the message or clears any
    /// previous error for the field.
    pub fn set(&mut self, field: Field, outcome: Option<String>) {
        match outcome {
            Some(message) => {
                self.0.insert(field, message);
            }
            None => {
                self.0.remove(&field);
            }
        }
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.0.contains_key(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn extend(&mut self, other: FieldErrors) {
        self.0.extend(other.0);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(f, m)| (*f, m.as_str()))
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

pub fn validate_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Some("Name is required".to_string());
    }
    if char_len(trimmed) > NAME_MAX {
        return Some(format!("Name must not exceed {NAME_MAX} characters"));
    }
    None
}

pub fn validate_email(email: &str) -> Option<String> {
    if email.trim().is_empty() {
        return Some("Email is required".to_string());
    }
    if !is_email_shape(email) {
        return Some("Email must be a valid email address".to_string());
    }
    None
}

/// `local@domain.tld` where no part contains whitespace or a second `@`, and
/// the domain holds a dot with at least one character on each side.
fn is_email_shape(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    if local.is_empty() {
        return false;
    }
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

pub fn validate_phone(phone: Option<&str>) -> Option<String> {
    let phone = match phone {
        Some(p) if !p.trim().is_empty() => p,
        _ => return None,
    };
    if char_len(phone) > PHONE_RAW_MAX {
        return Some(format!(
            "Phone number must not exceed {PHONE_RAW_MAX} characters"
        ));
    }
    let cleaned: String = phone
        .chars()
        .filter(|c| !c.is_whitespace() && !PHONE_SEPARATORS.contains(c))
        .collect();
    let digits = cleaned.strip_prefix('+').unwrap_or(&cleaned);
    let well_formed = digits.chars().all(|c| c.is_ascii_digit())
        && (PHONE_DIGITS_MIN..=PHONE_DIGITS_MAX).contains(&digits.len());
    if !well_formed {
        return Some("Phone number format is invalid".to_string());
    }
    None
}

pub fn validate_organization(organization: Option<&str>) -> Option<String> {
    if is_blank(organization) {
        return None;
    }
    let organization = organization.unwrap_or_default().trim();
    if char_len(organization) > ORGANIZATION_MAX {
        return Some(format!(
            "Organization must not exceed {ORGANIZATION_MAX} characters"
        ));
    }
    None
}

/// Length is measured on the raw text, surrounding whitespace included.
pub fn validate_special_requirements(special_requirements: Option<&str>) -> Option<String> {
    if is_blank(special_requirements) {
        return None;
    }
    if char_len(special_requirements.unwrap_or_default()) > SPECIAL_REQUIREMENTS_MAX {
        return Some(format!(
            "Special requirements must not exceed {SPECIAL_REQUIREMENTS_MAX} characters"
        ));
    }
    None
}

pub fn validate_visitor_type(visitor_type: Option<&str>) -> Option<String> {
    let visitor_type = match visitor_type {
        Some(v) if !v.is_empty() => v,
        _ => return None,
    };
    if crate::models::VisitorType::parse(visitor_type).is_none() {
        let allowed = crate::models::VisitorType::ALL
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        return Some(format!("Visitor type must be one of: {allowed}"));
    }
    None
}

pub fn validate_country(country: Option<&str>) -> Option<String> {
    if is_blank(country) {
        return None;
    }
    if char_len(country.unwrap_or_default().trim()) > COUNTRY_MAX {
        return Some(format!("Country must not exceed {COUNTRY_MAX} characters"));
    }
    None
}

/// Turns raw form input into a group size. Anything that is not a number
/// becomes 0 so it fails the lower bound instead of erroring.
pub fn coerce_group_size(raw: &str) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}

/// Checks that a group size is a whole number of at least 1, without looking
/// at any slot. Values beyond `u32::MAX` saturate.
pub fn whole_group_size(group_size: f64) -> Result<u32, String> {
    if group_size.is_nan() || group_size < 1.0 {
        return Err("Group size must be at least 1".to_string());
    }
    if group_size.fract() != 0.0 {
        return Err("Group size must be a whole number".to_string());
    }
    Ok(group_size as u32)
}

/// Checks a requested group size against a slot's capacity and current
/// bookings. The requested size is `f64` because it comes straight from form
/// or JSON input, where fractional values are possible.
///
/// The available-spots rule runs first so the visitor always learns how many
/// seats are left. The capacity rule is implied by it and stays as a guard.
pub fn validate_group_size(group_size: f64, slot_capacity: u32, slot_booked: u32) -> Option<String> {
    let requested = match whole_group_size(group_size) {
        Ok(requested) => requested,
        Err(message) => return Some(message),
    };
    let available = slot_capacity.saturating_sub(slot_booked);

    if requested > available {
        return Some(format!(
            "Invalid: Group size ({requested}) exceeds available spots ({available}). Only {available} spots are available."
        ));
    }
    if requested > slot_capacity {
        return Some(format!(
            "Invalid: Group size ({requested}) exceeds slot capacity ({slot_capacity})"
        ));
    }
    None
}

pub fn validate_cancel_reason(reason: &str) -> Option<String> {
    if reason.trim().is_empty() {
        return Some("Please provide a reason for cancellation".to_string());
    }
    None
}

pub fn validate_visitor_data(data: &VisitorData) -> FieldErrors {
    let mut errors = FieldErrors::new();
    errors.set(Field::Name, validate_name(&data.name));
    errors.set(Field::Email, validate_email(&data.email));
    errors.set(Field::Phone, validate_phone(data.phone.as_deref()));
    errors.set(
        Field::Organization,
        validate_organization(data.organization.as_deref()),
    );
    errors.set(
        Field::SpecialRequirements,
        validate_special_requirements(data.special_requirements.as_deref()),
    );
    errors.set(
        Field::VisitorType,
        validate_visitor_type(data.visitor_type.as_deref()),
    );
    errors.set(Field::Country, validate_country(data.country.as_deref()));
    errors
}

#[derive(Debug, Clone, Copy)]
pub struct BookingData {
    pub group_size: f64,
    pub slot_capacity: u32,
    pub slot_booked: u32,
}

pub fn validate_booking_data(data: &BookingData) -> FieldErrors {
    let mut errors = FieldErrors::new();
    errors.set(
        Field::GroupSize,
        validate_group_size(data.group_size, data.slot_capacity, data.slot_booked),
    );
    errors
}

/// Live validation of a single form field as the visitor types. `slot` is
/// `(capacity, booked)` of the slot being booked, when known.
pub fn validate_field(field: Field, value: &str, slot: Option<(u32, u32)>) -> Option<String> {
    match field {
        Field::Name => validate_name(value),
        Field::Email => validate_email(value),
        Field::Phone => validate_phone(Some(value)),
        Field::Organization => validate_organization(Some(value)),
        Field::SpecialRequirements => validate_special_requirements(Some(value)),
        Field::VisitorType => validate_visitor_type(Some(value)),
        Field::Country => validate_country(Some(value)),
        Field::GroupSize => {
            let (capacity, booked) = slot.unwrap_or((FALLBACK_CAPACITY, 0));
            validate_group_size(coerce_group_size(value), capacity, booked)
        }
        Field::Reason => validate_cancel_reason(value),
        _ => None,
    }
}
