//! Common value types for xmap.
//!
//! This crate provides the small value types shared by every xmap crate:
//!
//! - [`Guid`] - 128-bit unique identifier with the canonical hyphenated text form
//! - [`TimeSpan`] - signed duration counted in 100-nanosecond ticks

mod error;
mod guid;
mod timespan;

pub use error::{Error, Result};
pub use guid::Guid;
pub use timespan::TimeSpan;
