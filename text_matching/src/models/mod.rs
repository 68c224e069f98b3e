mod arci;

pub use arci::{ArcI, ArcIParams};
