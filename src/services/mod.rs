pub mod clients;
pub mod saga;
