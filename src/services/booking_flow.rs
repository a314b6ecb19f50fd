use serde::Serialize;

use super::booking::BookingService;
use super::captcha::MathChallenge;
use super::schedule::ScheduleService;
use crate::clock::Clock;
use crate::errors::ApiError;
use crate::models::{Booking, NewBooking, SlotStatus, VisitSlot, VisitorData, VisitorType};
use crate::validation::{
    coerce_group_size, validate_booking_data, validate_field, validate_visitor_data, BookingData,
    Field, FieldErrors,
};

const SLOT_NOT_FOUND: &str = "Slot not found.";
const SLOT_UNAVAILABLE: &str = "This slot is no longer available. Please select another slot.";
const SLOT_LOAD_FAILED: &str = "Failed to load slot details.";
const CAPTCHA_REQUIRED: &str = "Please complete the security verification";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Confirmation {
    pub booking_id: String,
    /// Shown to the visitor once; it cannot be retrieved again.
    pub tracking_token: Option<String>,
    pub booking: Booking,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BookingState {
    /// Accepting input. `errors` holds the inline messages currently shown.
    Idle { errors: FieldErrors },
    Validating,
    Submitting,
    Confirmed(Confirmation),
    /// The backend refused the booking or could not be reached. Editing any
    /// field returns to `Idle`.
    Failed { errors: FieldErrors },
}

/// One visitor filling in the booking form for one slot.
pub struct BookingFlow {
    slot: VisitSlot,
    visitor: VisitorData,
    group_size: f64,
    challenge: MathChallenge,
    captcha_verified: bool,
    state: BookingState,
}

impl BookingFlow {
    /// Loads the slot and refuses to start when it has already begun or is
    /// no longer open.
    pub async fn open(
        schedule: &ScheduleService,
        clock: &dyn Clock,
        slot_id: &str,
    ) -> Result<Self, FieldErrors> {
        let slot = match schedule.get_slot(slot_id).await {
            Ok(slot) => slot,
            Err(e) if e.is_not_found() || matches!(e, ApiError::Backend(_)) => {
                return Err(FieldErrors::single(Field::Slot, SLOT_NOT_FOUND));
            }
            Err(e) => {
                tracing::warn!(slot_id = %slot_id, error = %e, "failed to load slot");
                return Err(FieldErrors::single(Field::Slot, SLOT_LOAD_FAILED));
            }
        };

        if slot.is_past(clock.now()) || slot.status != SlotStatus::Available {
            return Err(FieldErrors::single(Field::Slot, SLOT_UNAVAILABLE));
        }

        Ok(Self::for_slot(slot))
    }

    pub fn for_slot(slot: VisitSlot) -> Self {
        Self {
            slot,
            visitor: VisitorData {
                visitor_type: Some(VisitorType::default().as_str().to_string()),
                country: Some(crate::models::visitor::DEFAULT_COUNTRY.to_string()),
                ..VisitorData::default()
            },
            group_size: 1.0,
            challenge: MathChallenge::random(),
            captcha_verified: false,
            state: BookingState::Idle {
                errors: FieldErrors::new(),
            },
        }
    }

    pub fn state(&self) -> &BookingState {
        &self.state
    }

    pub fn slot(&self) -> &VisitSlot {
        &self.slot
    }

    pub fn visitor(&self) -> &VisitorData {
        &self.visitor
    }

    pub fn challenge(&self) -> MathChallenge {
        self.challenge
    }

    pub fn errors(&self) -> Option<&FieldErrors> {
        match &self.state {
            BookingState::Idle { errors } | BookingState::Failed { errors } => Some(errors),
            _ => None,
        }
    }

    /// Errors of the editable state, moving `Failed` back to `Idle`.
    /// Returns `None` once the booking is confirmed.
    fn editable_errors(&mut self) -> Option<&mut FieldErrors> {
        if let BookingState::Failed { errors } = &mut self.state {
            let errors = std::mem::take(errors);
            self.state = BookingState::Idle { errors };
        }
        match &mut self.state {
            BookingState::Idle { errors } => Some(errors),
            _ => None,
        }
    }

    /// Applies one edited form value and revalidates just that field.
    pub fn set_field(&mut self, field: Field, value: &str) {
        if self.editable_errors().is_none() {
            return;
        }

        let owned = Some(value.to_string());
        match field {
            Field::Name => self.visitor.name = value.to_string(),
            Field::Email => self.visitor.email = value.to_string(),
            Field::Phone => self.visitor.phone = owned,
            Field::Organization => self.visitor.organization = owned,
            Field::SpecialRequirements => self.visitor.special_requirements = owned,
            Field::VisitorType => self.visitor.visitor_type = owned,
            Field::Country => self.visitor.country = owned,
            Field::GroupSize => self.group_size = coerce_group_size(value),
            _ => return,
        }

        let outcome = validate_field(field, value, Some((self.slot.capacity, self.slot.booked)));
        if let Some(errors) = self.editable_errors() {
            errors.set(field, outcome);
        }
    }

    pub fn answer_captcha(&mut self, answer: &str) -> bool {
        self.captcha_verified = self.challenge.check(answer);
        if self.captcha_verified {
            if let Some(errors) = self.editable_errors() {
                errors.set(Field::Captcha, None);
            }
        }
        self.captcha_verified
    }

    pub fn refresh_captcha(&mut self) {
        self.use_challenge(MathChallenge::random());
    }

    /// Swaps in a challenge issued elsewhere; verification starts over.
    pub fn use_challenge(&mut self, challenge: MathChallenge) {
        self.challenge = challenge;
        self.captcha_verified = false;
    }

    fn validate(&self) -> FieldErrors {
        let mut errors = validate_visitor_data(&self.visitor);
        errors.extend(validate_booking_data(&BookingData {
            group_size: self.group_size,
            slot_capacity: self.slot.capacity,
            slot_booked: self.slot.booked,
        }));
        errors
    }

    fn new_booking(&self, group_size: u32) -> NewBooking {
        let visitor = self.visitor.to_new_visitor();
        NewBooking {
            slot_id: self.slot.id.clone(),
            special_requests: visitor.special_requirements.clone(),
            visitor,
            group_size,
        }
    }

    /// Validates locally, re-checks capacity and creates the booking.
    ///
    /// Nothing reaches the network while a field is invalid or the bot check
    /// is unanswered. A confirmed flow ignores further submissions.
    pub async fn submit(&mut self, bookings: &BookingService) -> &BookingState {
        if matches!(self.state, BookingState::Confirmed(_)) {
            return &self.state;
        }

        self.state = BookingState::Validating;
        let errors = self.validate();
        if !errors.is_empty() {
            self.state = BookingState::Idle { errors };
            return &self.state;
        }
        if !self.captcha_verified {
            self.state = BookingState::Idle {
                errors: FieldErrors::single(Field::Captcha, CAPTCHA_REQUIRED),
            };
            return &self.state;
        }

        self.state = BookingState::Submitting;
        let group_size = self.group_size as u32;
        tracing::info!(slot_id = %self.slot.id, group_size, "submitting booking");

        let check = match bookings.check_availability(&self.slot.id, group_size).await {
            Ok(check) => check,
            Err(e) => {
                self.state = BookingState::Failed {
                    errors: FieldErrors::single(Field::GroupSize, e.to_string()),
                };
                return &self.state;
            }
        };

        // Keep the snapshot in step with what the backend just reported.
        self.slot.capacity = check.capacity;
        self.slot.booked = check.booked;

        if !check.can_accommodate {
            self.state = BookingState::Failed {
                errors: FieldErrors::single(
                    Field::GroupSize,
                    format!(
                        "Not enough spots available. Only {} spots remaining. Please adjust your group size or select another slot.",
                        check.remaining
                    ),
                ),
            };
            return &self.state;
        }

        self.state = match bookings.create_booking(&self.new_booking(group_size)).await {
            Ok(booking) => BookingState::Confirmed(Confirmation {
                booking_id: booking.id.clone(),
                tracking_token: booking.tracking_token.clone(),
                booking,
            }),
            Err(e) if e.is_capacity_conflict() => BookingState::Failed {
                errors: FieldErrors::single(Field::GroupSize, e.to_string()),
            },
            Err(e) => BookingState::Failed {
                errors: FieldErrors::single(Field::Submit, e.to_string()),
            },
        };
        &self.state
    }
}
