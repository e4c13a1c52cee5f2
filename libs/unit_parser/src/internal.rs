//! Structs and functions used by trait implementations.
pub use crate::config::{Result, UnitConfig, UnitEntry, UnitSection};
pub use crate::error::Error;
pub use crate::parser::{SectionParser, UnitParser};
pub use crate::specifiers::SpecifierContext;
