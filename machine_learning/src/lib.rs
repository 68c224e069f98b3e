pub mod arch;
pub mod error;
pub mod initialization;

pub use error::{MlErr, Result};
