//! Backend REST paths. All of them are public and need no authentication.

pub const AVAILABLE_SLOTS: &str = "/api/v1/public/schedule/available-slots";
pub const VISITORS: &str = "/api/v1/visitors";
pub const BOOKINGS: &str = "/api/v1/public/booking";
pub const TRACK_BOOKING: &str = "/api/v1/public/booking/track";
pub const CANCEL_BOOKING: &str = "/api/v1/public/booking/cancel";
pub const UPDATE_BOOKING: &str = "/api/v1/public/booking/update";

/// Followed by the slot id as its own segment.
pub const SLOTS: &str = "/api/v1/public/schedule/slots";
/// Followed by the slot id as its own segment.
pub const BOOKING_AVAILABILITY: &str = "/api/v1/public/booking/availability";
