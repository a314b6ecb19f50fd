pub mod booking;
pub mod slot;
pub mod visitor;

pub use booking::{
    AvailabilityCheck, Booking, BookingChanges, BookingStatus, CancelRequest, NewBooking,
    TrackingCredentials, UpdateRequest,
};
pub use slot::{schedule_board, ScheduleDay, SlotStatus, SlotView, VisitSlot};
pub use visitor::{NewVisitor, Visitor, VisitorData, VisitorType};
