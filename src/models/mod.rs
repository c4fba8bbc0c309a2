//! Data models for the library server

pub mod book;
pub mod reservation;
pub mod user;

// Re-export commonly used types
pub use book::{Book, CreateBook};
pub use reservation::{LoanPolicy, Reservation, ReservationDetails, ReservationState};
pub use user::{Role, User, UserClaims, UserSummary};
