#[macro_use]
extern crate arrayref;

pub type Result<T = ()> = std::result::Result<T, Error>;

mod message;
pub use message::*;

mod framer;
pub use framer::{Cancellation, Framer, Outcome};

#[cfg(feature = "logger")]
pub mod logger_runtime;
