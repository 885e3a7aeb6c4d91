pub mod app;
pub mod error;
pub mod logwatch;

pub use error::{Error, Result};
