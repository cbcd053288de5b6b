pub mod chat;
pub mod patient;
pub mod status;
