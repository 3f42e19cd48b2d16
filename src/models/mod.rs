pub mod availability;
pub mod booking;
pub mod business;

pub use availability::{weekday_index, AvailabilityDay, Slot};
pub use booking::{Booking, BookingStatus};
pub use business::Business;
