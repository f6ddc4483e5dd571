pub mod appointment;
pub mod enums;
pub mod identity;

pub use appointment::*;
pub use enums::*;
pub use identity::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Invalid {field}: {value}")]
    InvalidValue { field: String, value: String },
}
