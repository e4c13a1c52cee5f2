//! Functions and interfaces for unit template related stuff.
use crate::{config::Result, error::Error};

/// Describes the type of a unit file name.
pub enum UnitType<'a> {
    /// a template file, "<prefix>@.<suffix>"
    Template { prefix: &'a str },
    /// an instance of a template, "<prefix>@<instance>.<suffix>"
    Instance {
        prefix: &'a str,
        instance: &'a str,
        /// the file name of the backing template
        template: String,
    },
    /// a plain unit
    Regular { name: &'a str },
}

/// Determines the type of a unit based on its filename.
pub fn unit_type(filename: &str) -> Result<UnitType<'_>> {
    let split: Vec<&str> = filename.split('@').collect();
    match split.len() {
        1 => Ok(UnitType::Regular { name: filename }),
        2 => {
            let prefix = split[0];
            let rest = split[1];
            let suffix = match rest.rsplit_once('.') {
                Some((_, suffix)) => suffix,
                None => {
                    return Err(Error::InvalidFilenameError {
                        filename: filename.to_string(),
                    })
                }
            };
            if rest.starts_with('.') {
                Ok(UnitType::Template { prefix })
            } else {
                let instance = &rest[..rest.len() - suffix.len() - 1];
                Ok(UnitType::Instance {
                    prefix,
                    instance,
                    template: format!("{}@.{}", prefix, suffix),
                })
            }
        }
        _ => Err(Error::InvalidFilenameError {
            filename: filename.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_type() {
        match unit_type("foo.service").unwrap() {
            UnitType::Regular { name } => assert_eq!(name, "foo.service"),
            _ => panic!("expected a regular unit"),
        }

        match unit_type("foo@.service").unwrap() {
            UnitType::Template { prefix } => assert_eq!(prefix, "foo"),
            _ => panic!("expected a template"),
        }

        match unit_type("foo@bar.service").unwrap() {
            UnitType::Instance {
                prefix,
                instance,
                template,
            } => {
                assert_eq!(prefix, "foo");
                assert_eq!(instance, "bar");
                assert_eq!(template, "foo@.service");
            }
            _ => panic!("expected an instance"),
        }

        assert!(unit_type("foo@bar@baz.service").is_err());
    }

    #[test]
    fn test_instance_with_dots() {
        match unit_type("getty@tty-1.back.mount").unwrap() {
            UnitType::Instance {
                prefix,
                instance,
                template,
            } => {
                assert_eq!(prefix, "getty");
                assert_eq!(instance, "tty-1.back");
                assert_eq!(template, "getty@.mount");
            }
            _ => panic!("expected an instance"),
        }
    }
}
