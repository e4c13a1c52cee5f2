//! Definitions for all possible errors used in this crate.
use snafu::Snafu;
use std::{io, path::PathBuf};

/// Errors used in crate.
#[derive(Debug, Snafu)]
#[allow(missing_docs)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Cannot load a template unit directly: {}.", name))]
    LoadTemplateError { name: String },

    #[snafu(display("Failed to read file {}: {}.", path.display(), source))]
    ReadFileError { source: io::Error, path: PathBuf },

    #[snafu(display("Invalid filename {}.", filename))]
    InvalidFilenameError { filename: String },

    #[snafu(display("Failed to parse section {}.", key))]
    SectionParsingError { key: String },

    #[snafu(display("Missing entry with key {}, which is required.", key))]
    EntryMissingError { key: String },

    #[snafu(display("Missing section with key {}, which is required.", key))]
    SectionMissingError { key: String },

    #[snafu(display("Failed to parse {} as the value of entry with key {}.", value, key))]
    ValueParsingError { key: String, value: String },

    #[snafu(display("Failed to find unit {}.", name))]
    NoUnitFoundError { name: String },

    #[snafu(display("Failed to look up the current user."))]
    NoUserFoundError,

    #[snafu(display("Failed to look up the current group."))]
    NoGroupFoundError,

    #[snafu(display("Invalid specifier: {}", specifier))]
    InvalidSpecifierError { specifier: char },
}
