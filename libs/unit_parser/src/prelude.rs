//! Prelude module, including everything needed for regular use.
pub use crate::config::{Result, UnitConfig, UnitEntry, UnitSection};
pub use crate::error::Error;
pub use crate::escape::{escape, unescape_non_path, unescape_path};
pub use crate::parser::{SectionParser, UnitParser};
pub use crate::template::{unit_type, UnitType};
