pub mod error;
pub mod mapper;
pub mod transform;
pub mod validation;

pub use error::ProcessingError;
pub use mapper::{
    DataMapper,
    clock::{Clock, FixedClock, SystemClock},
};
pub use validation::{ValidContact, ValidationResult, Validator};
