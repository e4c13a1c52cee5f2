// Copyright (c) 2022 Huawei Technologies Co.,Ltd. All rights reserved.
//
// unitmaster is licensed under Mulan PSL v2.
// You can use this software according to the terms and conditions of the Mulan
// PSL v2.
// You may obtain a copy of Mulan PSL v2 at:
//         http://license.coscl.org.cn/MulanPSL2
// THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY
// KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO
// NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
// See the Mulan PSL v2 for more details.

//! Interfaces related to the unit name.

use crate::error::*;
use bitflags::bitflags;

/// The longest valid unit name, terminating NUL not included.
pub const UNIT_NAME_MAX: usize = 255;

const VALID_CHARS: &str =
    "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ:-_.\\";

bitflags! {
    /// The acceptable shapes of a unit name.
    pub struct UnitNameFlags: u8 {
        /// "foo.service"
        const PLAIN = 1;
        /// "foo@inst.service"
        const INSTANCE = 1 << 1;
        /// "foo@.service"
        const TEMPLATE = 1 << 2;
        /// any of the above
        const ANY = 1 | (1 << 1) | (1 << 2);
    }
}

fn string_is_valid(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| VALID_CHARS.contains(c))
}

/// Check a full unit name against the allowed shapes.
pub fn unit_name_is_valid(name: &str, flags: UnitNameFlags) -> bool {
    if name.is_empty() || name.len() > UNIT_NAME_MAX {
        return false;
    }

    let dot = match name.rfind('.') {
        None => return false,
        Some(v) => v,
    };
    if dot == 0 || dot == name.len() - 1 {
        return false;
    }
    let (head, suffix) = name.split_at(dot);
    if !string_is_valid(&suffix[1..]) {
        return false;
    }

    match head.find('@') {
        None => flags.contains(UnitNameFlags::PLAIN) && string_is_valid(head),
        Some(at) => {
            if at == 0 {
                return false;
            }
            let prefix = &head[..at];
            let instance = &head[at + 1..];
            if !string_is_valid(prefix) {
                return false;
            }
            if instance.is_empty() {
                flags.contains(UnitNameFlags::TEMPLATE)
            } else {
                flags.contains(UnitNameFlags::INSTANCE) && string_is_valid(instance)
            }
        }
    }
}

/// Return the part before the first '@', or before the type suffix for a
/// plain name.
pub fn unit_name_to_prefix(name: &str) -> String {
    let head = match name.rfind('.') {
        None => name,
        Some(dot) => &name[..dot],
    };
    match head.find('@') {
        None => head.to_string(),
        Some(at) => head[..at].to_string(),
    }
}

/// Get the content between the first '@' and the type suffix.
pub fn unit_name_to_instance(name: &str) -> Option<String> {
    let at = name.find('@')?;
    let dot = name[at..].rfind('.')? + at;
    Some(name[at + 1..dot].to_string())
}

/// The type suffix without the leading dot, "" when there is none.
pub fn unit_name_suffix(name: &str) -> &str {
    match name.rfind('.') {
        None => "",
        Some(dot) => &name[dot + 1..],
    }
}

/// "foo@inst.service" => true
pub fn unit_name_is_instance(name: &str) -> bool {
    unit_name_is_valid(name, UnitNameFlags::INSTANCE)
}

/// "foo@.service" => true
pub fn unit_name_is_template(name: &str) -> bool {
    unit_name_is_valid(name, UnitNameFlags::TEMPLATE)
}

/// "foo@inst.service" => "foo@.service"
pub fn unit_name_to_template(name: &str) -> Result<String> {
    let at = name.find('@').ok_or(Error::Invalid {
        what: format!("{} is not an instance name", name),
    })?;
    let dot = name.rfind('.').ok_or(Error::Invalid {
        what: format!("{} has no type suffix", name),
    })?;
    Ok(format!("{}@{}", &name[..at], &name[dot..]))
}

/// "foo@.service" + "inst" => "foo@inst.service"
pub fn unit_name_replace_instance(template: &str, instance: &str) -> Result<String> {
    if !unit_name_is_template(template) {
        return Err(Error::Invalid {
            what: format!("{} is not a template name", template),
        });
    }
    let at = template.find('@').ok_or(Error::Invalid {
        what: template.to_string(),
    })?;
    let dot = template.rfind('.').ok_or(Error::Invalid {
        what: template.to_string(),
    })?;
    Ok(format!(
        "{}@{}{}",
        &template[..at],
        instance,
        &template[dot..]
    ))
}

fn hexchar(x: u8) -> char {
    let table = b"0123456789abcdef";
    table[(x & 0xF) as usize] as char
}

fn do_escape_char(c: u8, out: &mut String) {
    out.push('\\');
    out.push('x');
    out.push(hexchar(c >> 4));
    out.push(hexchar(c));
}

/// Turn a filesystem path into the escaped form used inside unit names:
/// "/" => "-", "/home/lennart" => "home-lennart".
pub fn unit_name_path_escape(path: &str) -> Result<String> {
    let p = path.trim_matches('/');
    if p.is_empty() {
        return Ok("-".to_string());
    }

    if p == "." || p == ".." {
        return Err(Error::Invalid {
            what: format!("path {} cannot be escaped", path),
        });
    }

    let mut out = String::new();
    for (i, b) in p.bytes().enumerate() {
        match b {
            b'/' => out.push('-'),
            b'.' if i == 0 => do_escape_char(b, &mut out),
            b'-' | b'\\' => do_escape_char(b, &mut out),
            _ if VALID_CHARS.as_bytes().contains(&b) => out.push(b as char),
            _ => do_escape_char(b, &mut out),
        }
    }
    Ok(out)
}

/// Build the unit name mapping to a filesystem path: "/home" + "mount" =>
/// "home.mount", "/" => "-.mount".
pub fn unit_name_from_path(path: &str, suffix: &str) -> Result<String> {
    let escaped = unit_name_path_escape(path)?;
    let name = format!("{}.{}", escaped, suffix);
    if !unit_name_is_valid(&name, UnitNameFlags::PLAIN) {
        return Err(Error::Invalid {
            what: format!("path {} makes no valid unit name", path),
        });
    }
    Ok(name)
}

/// Every parent directory of the path, shortest first, the path included.
pub fn path_parents(path: &str) -> Vec<String> {
    let mut out = Vec::new();
    let p = path.trim_end_matches('/');
    if p.is_empty() {
        out.push("/".to_string());
        return out;
    }
    let mut cur = String::new();
    for comp in p.split('/').filter(|c| !c.is_empty()) {
        cur.push('/');
        cur.push_str(comp);
        out.push(cur.clone());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_name_is_valid() {
        assert!(unit_name_is_valid("foo.service", UnitNameFlags::PLAIN));
        assert!(unit_name_is_valid("foo.target", UnitNameFlags::ANY));
        assert!(!unit_name_is_valid("foo.service", UnitNameFlags::INSTANCE));
        assert!(unit_name_is_valid("foo@inst.service", UnitNameFlags::INSTANCE));
        assert!(unit_name_is_valid("foo@.service", UnitNameFlags::TEMPLATE));
        assert!(!unit_name_is_valid("foo@.service", UnitNameFlags::INSTANCE));
        assert!(!unit_name_is_valid("", UnitNameFlags::ANY));
        assert!(!unit_name_is_valid(".service", UnitNameFlags::ANY));
        assert!(!unit_name_is_valid("foo.", UnitNameFlags::ANY));
        assert!(!unit_name_is_valid("foo", UnitNameFlags::ANY));
        assert!(!unit_name_is_valid("@.service", UnitNameFlags::ANY));
        assert!(!unit_name_is_valid("foo bar.service", UnitNameFlags::ANY));
        assert!(!unit_name_is_valid(&"a".repeat(256), UnitNameFlags::ANY));
    }

    #[test]
    fn test_unit_name_split() {
        assert_eq!(unit_name_to_prefix("foo@inst.service"), "foo");
        assert_eq!(unit_name_to_prefix("foo.service"), "foo");
        assert_eq!(
            unit_name_to_instance("foo@inst.service"),
            Some("inst".to_string())
        );
        assert_eq!(unit_name_to_instance("foo.service"), None);
        assert_eq!(unit_name_suffix("foo.service"), "service");
        assert_eq!(
            unit_name_to_template("foo@inst.service").unwrap(),
            "foo@.service"
        );
        assert_eq!(
            unit_name_replace_instance("foo@.service", "inst").unwrap(),
            "foo@inst.service"
        );
        assert!(unit_name_replace_instance("foo.service", "inst").is_err());
    }

    #[test]
    fn test_unit_name_from_path() {
        assert_eq!(unit_name_from_path("/", "mount").unwrap(), "-.mount");
        assert_eq!(unit_name_from_path("/home", "mount").unwrap(), "home.mount");
        assert_eq!(
            unit_name_from_path("/home/data", "mount").unwrap(),
            "home-data.mount"
        );
        assert_eq!(
            unit_name_from_path("/opt/my-app", "mount").unwrap(),
            "opt-my\\x2dapp.mount"
        );
    }

    #[test]
    fn test_path_parents() {
        assert_eq!(
            path_parents("/home/data/store"),
            vec!["/home", "/home/data", "/home/data/store"]
        );
        assert_eq!(path_parents("/"), vec!["/"]);
    }
}
