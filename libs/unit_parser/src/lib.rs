//! Crate for parsing and loading systemd-style unit files.
//! Unit and section structs implement the [prelude::UnitConfig] and
//! [prelude::UnitSection] traits; entry values are converted through
//! [prelude::UnitEntry]. Repeated keys, line continuations, drop-in
//! layering and specifier resolution follow the unit file syntax.

mod config;
pub mod error;
mod escape;
mod parser;
mod specifiers;
mod template;

/// All public interfaces for normal usage.
/// Use `use unit_parser::prelude::*;` to include.
pub mod prelude;

/// Internal interfaces, should only be used in trait implementations.
#[doc(hidden)]
pub mod internal;
