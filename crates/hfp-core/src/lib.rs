pub mod config;
pub mod error;
pub mod types;

pub use config::HfpConfig;
pub use error::{HfpError, HfpResult};
pub use types::{AlphaType, MaterializationState};
