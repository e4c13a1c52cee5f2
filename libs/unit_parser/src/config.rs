//! Definitions for parsing-related traits.
use crate::{
    error::{NoUnitFoundSnafu, ReadFileSnafu},
    internal::Error,
    parser::{SectionParser, UnitParser},
    template::{unit_type, UnitType},
};
use snafu::{ensure, ResultExt};
use std::{
    ffi::OsString,
    fs::File,
    io::Read,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Result of a [UnitParser].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The trait that needs to be implemented on the most-outer struct,
/// representing a type of unit.
pub trait UnitConfig: Sized + Default {
    /// The suffix of a type of unit, without the leading dot.
    const SUFFIX: &'static str;

    /// Parses the unit from a [UnitParser].
    fn __parse_unit(__source: UnitParser, res: &mut Self) -> Result<()>;

    /// Load the default value
    fn __load_default(__res: &mut Self);

    /// A convenient function that opens the file that needs to be loaded.
    fn __load<S: AsRef<Path>>(path: S, unit_name: &str, res: &mut Self) -> Result<()> {
        let path = path.as_ref();
        let mut file = File::open(path).context(ReadFileSnafu { path })?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .context(ReadFileSnafu { path })?;
        let parser = UnitParser::new(content.as_ref(), (unit_name,));
        Self::__parse_unit(parser, res)
    }

    /// Loads a unit with the given config file list and unit name
    ///
    /// paths: full paths of the given config files, main fragment first,
    /// later files overriding or extending earlier ones
    ///
    /// unit_name: the full unit name, used for specifier resolution
    fn load_config<P: AsRef<Path>>(paths: Vec<P>, unit_name: &str) -> Result<Self> {
        if let UnitType::Template { .. } = unit_type(unit_name)? {
            return Err(Error::LoadTemplateError {
                name: unit_name.to_string(),
            });
        }

        let mut result = Self::default();
        Self::__load_default(&mut result);

        let mut loaded = false;
        for path in paths.iter() {
            match Self::__load(path, unit_name, &mut result) {
                Ok(()) => loaded = true,
                /* A missing file is fine, a malformed one is not. */
                Err(Error::ReadFileError { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
        ensure!(loaded, NoUnitFoundSnafu { name: unit_name });

        Ok(result)
    }
}

/// The trait that needs to be implemented on each section of the unit.
pub trait UnitSection: Sized {
    /// Parses the section from a [SectionParser].
    fn __parse_section(__source: &mut SectionParser, res: &mut Self) -> Result<()>;
    /// Load the default value
    fn __load_default(__res: &mut Self);
}

/// The trait that needs to be implemented on each entry of the unit.
/// The crate has already implemented this trait for most common types.
/// To add support for a custom type, implement the [UnitEntry::parse_from_str]
/// function similar to [std::str::FromStr].
pub trait UnitEntry: Sized {
    /// Possible parsing error.
    type Error;
    /// Parse the type from [str].
    fn parse_from_str<S: AsRef<str>>(input: S) -> std::result::Result<Self, Self::Error>;
}

/// Implement [UnitEntry] for types that also implements [std::str::FromStr].
macro_rules! impl_for_types {
    ($typ:ty) => {
        impl UnitEntry for $typ {
            type Error = <$typ as FromStr>::Err;
            fn parse_from_str<S: AsRef<str>>(
                input: S,
            ) -> std::result::Result<Self, Self::Error> {
                Self::from_str(input.as_ref())
            }
        }
    };
    ($x:ty, $($y:ty),+) => {
        impl_for_types!($x);
        impl_for_types!($($y),+);
    };
}

impl_for_types!(
    char, f32, f64, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, OsString, PathBuf, String
);

/// Implement [UnitEntry] for [bool] according to systemd specifications.
impl UnitEntry for bool {
    type Error = ();
    fn parse_from_str<S: AsRef<str>>(input: S) -> std::result::Result<Self, Self::Error> {
        match input.as_ref() {
            "1" | "yes" | "true" | "on" => Ok(true),
            "0" | "no" | "false" | "off" => Ok(false),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[derive(Debug, Default)]
    struct TestSection {
        description: String,
        after: Vec<String>,
        refuse_manual_start: bool,
    }

    impl UnitSection for TestSection {
        fn __parse_section(source: &mut SectionParser, res: &mut Self) -> Result<()> {
            while let Some((key, value)) = source.next() {
                match key {
                    "Description" => res.description = value,
                    "After" => {
                        if value.is_empty() {
                            res.after.clear();
                        } else {
                            res.after
                                .extend(value.split_whitespace().map(|x| x.to_string()));
                        }
                    }
                    "RefuseManualStart" => {
                        res.refuse_manual_start = UnitEntry::parse_from_str(&value)
                            .map_err(|_| Error::ValueParsingError {
                                key: key.to_string(),
                                value,
                            })?
                    }
                    _ => {}
                }
            }
            Ok(())
        }

        fn __load_default(_res: &mut Self) {}
    }

    #[derive(Debug, Default)]
    struct TestConfig {
        unit: TestSection,
    }

    impl UnitConfig for TestConfig {
        const SUFFIX: &'static str = "target";

        fn __parse_unit(mut source: UnitParser, res: &mut Self) -> Result<()> {
            while let Some(mut section) = source.next() {
                if section.name == "Unit" {
                    TestSection::__parse_section(&mut section, &mut res.unit)?;
                }
                let i = section.finish();
                source.progress(i);
            }
            Ok(())
        }

        fn __load_default(_res: &mut Self) {}
    }

    fn write_unit(name: &str, content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_config() {
        let path = write_unit(
            "up-load.target",
            "[Unit]\nDescription=main\nAfter=a.target\nRefuseManualStart=yes\n",
        );
        let config = TestConfig::load_config(vec![&path], "up-load.target").unwrap();
        assert_eq!(config.unit.description, "main");
        assert_eq!(config.unit.after, vec!["a.target".to_string()]);
        assert!(config.unit.refuse_manual_start);
    }

    #[test]
    fn test_load_config_layering() {
        let base = write_unit(
            "up-layer.target",
            "[Unit]\nDescription=base\nAfter=a.target b.target\n",
        );
        let dropin = write_unit(
            "up-layer-dropin.conf",
            "[Unit]\nDescription=override\nAfter=\nAfter=c.target\n",
        );
        let config =
            TestConfig::load_config(vec![&base, &dropin], "up-layer.target").unwrap();
        assert_eq!(config.unit.description, "override");
        assert_eq!(config.unit.after, vec!["c.target".to_string()]);
    }

    #[test]
    fn test_load_template_refused() {
        let err = TestConfig::load_config(Vec::<&str>::new(), "tmpl@.target").unwrap_err();
        assert!(matches!(err, Error::LoadTemplateError { .. }));
    }

    #[test]
    fn test_load_nothing_found() {
        let err =
            TestConfig::load_config(vec!["/nonexistent/up.target"], "up.target").unwrap_err();
        assert!(matches!(err, Error::NoUnitFoundError { .. }));
    }

    #[test]
    fn test_load_bad_value_propagates() {
        let path = write_unit(
            "up-bad.target",
            "[Unit]\nRefuseManualStart=maybe\n",
        );
        let err = TestConfig::load_config(vec![&path], "up-bad.target").unwrap_err();
        assert!(matches!(err, Error::ValueParsingError { .. }));
    }
}
