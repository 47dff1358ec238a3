pub mod listing;
pub mod reservation;
pub mod user;

pub use listing::Listing;
pub use reservation::Reservation;
pub use user::UserRecord;
