use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::slot::VisitSlot;
use super::visitor::{NewVisitor, Visitor};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
    NoShow,
    Tentative,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
            BookingStatus::NoShow => "no_show",
            BookingStatus::Tentative => "tentative",
        }
    }

    /// Visitors may cancel or edit a booking until it is cancelled or the
    /// visit has taken place.
    pub fn is_modifiable(&self) -> bool {
        !matches!(self, BookingStatus::Cancelled | BookingStatus::Completed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub slot_id: String,
    #[serde(default)]
    pub visitor_id: Option<String>,
    pub group_size: u32,
    pub status: BookingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_requests: Option<String>,
    /// Only present in the creation response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gcash_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<VisitSlot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visitor: Option<Visitor>,
}

impl Booking {
    pub fn can_modify(&self) -> bool {
        self.status.is_modifiable()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    pub slot_id: String,
    pub visitor: NewVisitor,
    pub group_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_requests: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityCheck {
    pub available: bool,
    pub capacity: u32,
    pub booked: u32,
    pub remaining: u32,
    pub can_accommodate: bool,
}

/// Email plus tracking token: the only credential a visitor holds for a
/// booking after creating it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackingCredentials {
    pub email: String,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CancelRequest {
    pub email: String,
    pub token: String,
    pub reason: String,
}

/// Editable booking fields. `None` means "leave unchanged".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BookingChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_requests: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gcash_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_number: Option<String>,
}

fn text_changed(edited: &Option<String>, current: &Option<String>) -> Option<String> {
    let edited = edited.as_deref()?.trim();
    let current = current.as_deref().map(str::trim).unwrap_or_default();
    (edited != current).then(|| edited.to_string())
}

impl BookingChanges {
    pub fn is_empty(&self) -> bool {
        self == &BookingChanges::default()
    }

    /// Keeps only the edits that differ from the booking as last fetched.
    pub fn diff_against(&self, booking: &Booking) -> BookingChanges {
        BookingChanges {
            group_size: self.group_size.filter(|g| *g != booking.group_size),
            special_requests: text_changed(&self.special_requests, &booking.special_requests),
            notes: text_changed(&self.notes, &booking.notes),
            gcash_number: text_changed(&self.gcash_number, &booking.gcash_number),
            reference_number: text_changed(&self.reference_number, &booking.reference_number),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UpdateRequest {
    pub email: String,
    pub token: String,
    #[serde(flatten)]
    pub changes: BookingChanges,
}
