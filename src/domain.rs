pub mod record;
pub mod registration;
