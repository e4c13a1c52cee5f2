//! Parser struct definitions.
use crate::specifiers::{resolve, SpecifierContext};
use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take_till},
    character::complete::{alphanumeric1, anychar, char, space0},
    combinator::eof,
    multi::many_till,
    sequence::{delimited, separated_pair},
    IResult,
};

/// Iterates over the sections of one unit file.
pub struct UnitParser<'a> {
    // the shared parsing cursor
    inner: &'a str,
    context: SpecifierContext<'a>,
}

// a section parser borrows the cursor and hands it back through finish()
impl<'a> UnitParser<'a> {
    pub fn new(input: &'a str, context: SpecifierContext<'a>) -> Self {
        UnitParser {
            inner: input,
            context,
        }
    }

    pub fn progress(&mut self, i: &'a str) {
        self.inner = i;
    }

    /// advance to the next section header, skipping anything in between
    pub fn next(&mut self) -> Option<SectionParser<'a>> {
        loop {
            self.inner = self.inner.trim_start();
            if self.inner.is_empty() {
                return None;
            }

            if self.inner.starts_with('[') {
                if let Ok((i, name)) = section_header(self.inner) {
                    self.inner = i;
                    return Some(SectionParser {
                        name,
                        inner: self.inner,
                        context: self.context,
                    });
                }
            }

            // comments and anything unparseable are dropped line by line
            match self.inner.find('\n') {
                Some(pos) => self.inner = &self.inner[pos + 1..],
                None => {
                    self.inner = "";
                    return None;
                }
            }
        }
    }
}

fn section_header(i: &str) -> IResult<&str, &str> {
    let (i, result) = delimited(char('['), is_not("]\n"), char(']'))(i)?;
    let (i, _) = space0(i)?;
    let (i, _) = alt((tag("\n"), eof))(i)?;
    Ok((i, result))
}

/// Iterates over the "Key=value" entries of one section.
pub struct SectionParser<'a> {
    pub name: &'a str,
    // the shared parsing cursor
    inner: &'a str,
    context: SpecifierContext<'a>,
}

impl<'a> SectionParser<'a> {
    pub fn finish(self) -> &'a str {
        self.inner
    }

    pub fn next(&mut self) -> Option<(&'a str, String)> {
        loop {
            self.inner = self.inner.trim_start();
            if self.inner.is_empty() || self.inner.starts_with('[') {
                return None;
            }

            if self.inner.starts_with('#') || self.inner.starts_with(';') {
                self.drop_line();
                continue;
            }

            match entry(self.inner, self.context) {
                Ok((i, result)) => {
                    self.inner = i;
                    return Some(result);
                }
                Err(_) => {
                    let end = self.inner.find('\n').unwrap_or(self.inner.len());
                    log::warn!(
                        "Failed to parse line \"{}\", ignoring.",
                        &self.inner[..end]
                    );
                    self.drop_line();
                }
            }
        }
    }

    fn drop_line(&mut self) {
        match self.inner.find('\n') {
            Some(pos) => self.inner = &self.inner[pos + 1..],
            None => self.inner = "",
        }
    }
}

// returns (key, value) pair
// specifiers are resolved in the process, leading to string copies
fn entry<'a>(i: &'a str, context: SpecifierContext<'a>) -> IResult<&'a str, (&'a str, String)> {
    separated_pair(
        alphanumeric1,
        delimited(space0, char('='), space0),
        entry_value(context),
    )(i)
}

fn entry_value<'a>(
    context: SpecifierContext<'a>,
) -> impl FnMut(&'a str) -> IResult<&'a str, String> {
    move |i| {
        let mut result = String::new();
        let mut i = i;
        loop {
            let (new_i, (segments, terminator)) =
                many_till(value_segment(context), alt((tag("\\\n"), tag("\n"), eof)))(i)?;
            result.extend(segments.into_iter());
            i = new_i;

            if terminator != "\\\n" {
                break;
            }
            // the continuation backslash reads as a space
            result.push(' ');
        }

        Ok((i, result))
    }
}

fn value_segment<'a>(
    context: SpecifierContext<'a>,
) -> impl FnMut(&'a str) -> IResult<&'a str, String> {
    move |i| {
        let (i, segment) = take_till(|x| x == '\\' || x == '\n' || x == '%')(i)?;

        if let Ok((i, spec)) = specifier(i) {
            let mut result = segment.to_string();
            return if resolve(&mut result, spec, context).is_ok() {
                Ok((i, result))
            } else {
                Err(nom::Err::Failure(nom::error::Error::new(
                    i,
                    nom::error::ErrorKind::Fail,
                )))
            };
        }

        // a backslash that does not start a line continuation is literal
        if let Some(rest) = i.strip_prefix('\\') {
            if !rest.starts_with('\n') {
                let mut result = segment.to_string();
                result.push('\\');
                return match rest.chars().next() {
                    Some(c) => {
                        result.push(c);
                        Ok((&rest[c.len_utf8()..], result))
                    }
                    None => Ok((rest, result)),
                };
            }
        }

        Ok((i, segment.to_string()))
    }
}

fn specifier(i: &str) -> IResult<&str, char> {
    let (i, _) = char('%')(i)?;
    anychar(i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(input: &str, unit_name: &str) -> Vec<(String, Vec<(String, String)>)> {
        let mut parser = UnitParser::new(input, (unit_name,));
        let mut sections = Vec::new();
        while let Some(mut section) = parser.next() {
            let mut entries = Vec::new();
            while let Some((key, value)) = section.next() {
                entries.push((key.to_string(), value));
            }
            let name = section.name.to_string();
            let i = section.finish();
            parser.progress(i);
            sections.push((name, entries));
        }
        sections
    }

    #[test]
    fn test_sections_and_entries() {
        let input = "# a comment\n\
                     [Unit]\n\
                     Description=test unit\n\
                     After=a.service b.service\n\
                     After=c.service\n\
                     \n\
                     [Install]\n\
                     WantedBy=multi-user.target\n";
        let sections = collect(input, "t.service");
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].0, "Unit");
        assert_eq!(sections[0].1.len(), 3);
        assert_eq!(sections[0].1[0].1, "test unit");
        assert_eq!(sections[0].1[2], ("After".to_string(), "c.service".to_string()));
        assert_eq!(sections[1].0, "Install");
    }

    #[test]
    fn test_line_continuation() {
        let input = "[Unit]\nRequires=a.service \\\n    b.service\n";
        let sections = collect(input, "t.service");
        assert_eq!(sections[0].1[0].1, "a.service      b.service");
    }

    #[test]
    fn test_garbage_line_skipped() {
        let input = "[Unit]\nnot a valid line\nDescription=kept\n";
        let sections = collect(input, "t.service");
        assert_eq!(sections[0].1.len(), 1);
        assert_eq!(sections[0].1[0].1, "kept");
    }

    #[test]
    fn test_specifier_resolution() {
        let input = "[Unit]\nDescription=unit %n of %p\n";
        let sections = collect(input, "foo@bar.service");
        assert_eq!(sections[0].1[0].1, "unit foo@bar.service of foo");
    }

    #[test]
    fn test_literal_backslash() {
        let input = "[Unit]\nDescription=dev-disk-by\\x2dlabel\n";
        let sections = collect(input, "t.service");
        assert_eq!(sections[0].1[0].1, "dev-disk-by\\x2dlabel");
    }

    #[test]
    fn test_no_trailing_newline() {
        let input = "[Unit]\nDescription=last";
        let sections = collect(input, "t.service");
        assert_eq!(sections[0].1[0].1, "last");
    }
}
