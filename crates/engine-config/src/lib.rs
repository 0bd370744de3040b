pub mod error;
pub mod report;
pub mod settings;
pub mod validation;

pub use error::ContractError;
pub use settings::{Settings, env::EnvManager, error::SettingsError};
pub use validation::contract::{load_contract, load_contract_str};
