pub mod convert;
pub mod inventory;
pub mod status;
