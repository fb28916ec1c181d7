//! Dashform Validation
//!
//! Rule-level validation functions. Each returns `Ok(())` or the message
//! shown next to the offending field. Resolvers in `dashform` compose these
//! into per-field rule chains.

pub mod collection;
pub mod domains;
pub mod email;
pub mod numeric;
pub mod password;
pub mod string;

pub use collection::*;
pub use domains::*;
pub use email::*;
pub use numeric::*;
pub use password::*;
pub use string::*;
