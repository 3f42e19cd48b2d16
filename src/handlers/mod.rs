pub mod availability;
pub mod bookings;
pub mod businesses;
pub mod health;
