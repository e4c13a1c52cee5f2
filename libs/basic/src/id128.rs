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

//! 128-bit id helpers, plain 32-hex-char form and RFC UUID form.
use crate::error::*;
use nix::{fcntl, fcntl::OFlag, sys::stat::Mode, unistd};
use rand::Rng;
use std::{os::unix::io::RawFd, path::Path};

fn id128_plain_is_valid(id128: &str) -> bool {
    id128.len() == 32 && id128.chars().all(|c| c.is_ascii_hexdigit())
}

fn id128_rfc_is_valid(id128: &str) -> bool {
    if id128.len() != 36 {
        return false;
    }
    let b = id128.as_bytes();
    if b[8] != b'-' || b[13] != b'-' || b[18] != b'-' || b[23] != b'-' {
        return false;
    }
    id128_plain_is_valid(&id128.replace('-', ""))
}

/// Accepts both the plain and the RFC form, a trailing newline included.
pub fn id128_is_valid(id128: &str) -> bool {
    let id128 = id128.trim_end_matches('\n');
    id128_plain_is_valid(id128) || id128_rfc_is_valid(id128)
}

/// "12345678901234567890abcdef123456" =>
/// "12345678-9012-3456-7890-abcdef123456"
pub fn id128_to_uuid(id128: &str) -> Result<String> {
    if !id128_plain_is_valid(id128) {
        return Err(Error::Invalid {
            what: id128.to_string(),
        });
    }
    Ok(format!(
        "{}-{}-{}-{}-{}",
        &id128[..8],
        &id128[8..12],
        &id128[12..16],
        &id128[16..20],
        &id128[20..]
    ))
}

/// Generate a random id in the plain form.
pub fn id128_randomize() -> String {
    let mut rng = rand::thread_rng();
    let mut ret = String::with_capacity(32);
    for _ in 0..32 {
        let s: u32 = rng.gen_range(0..16);
        ret.push_str(&format!("{:x}", s));
    }
    ret
}

/// Read an id from a file, tolerating a trailing newline.
pub fn id128_read_by_path(path: &Path) -> Result<String> {
    let raw = std::fs::read_to_string(path)?;
    let id128 = raw.trim_end_matches('\n');
    if !id128_is_valid(id128) {
        return Err(Error::Invalid {
            what: format!("{} holds no valid id128", path.display()),
        });
    }
    Ok(id128.to_string())
}

/// Write an id with a trailing newline, world readable.
pub fn id128_write(p: &Path, id128: &str) -> Result<()> {
    if !id128_is_valid(id128) {
        return Err(Error::Invalid {
            what: id128.to_string(),
        });
    }

    let mut content = id128.trim_end_matches('\n').to_string();
    content.push('\n');

    let fd: RawFd = fcntl::open(
        p,
        OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_CLOEXEC | OFlag::O_NOCTTY | OFlag::O_TRUNC,
        Mode::S_IRUSR | Mode::S_IRGRP | Mode::S_IROTH,
    )?;
    let r = unistd::write(fd, content.as_bytes());
    unistd::close(fd)?;
    r?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id128_is_valid() {
        assert!(id128_is_valid("12345678901234567890abcdef123456"));
        assert!(id128_is_valid("12345678901234567890abcdef123456\n"));
        assert!(id128_is_valid("12345678-9012-3456-7890-abcdef123456"));
        assert!(!id128_is_valid("123"));
        assert!(!id128_is_valid("z2345678901234567890abcdef123456"));
        assert!(!id128_is_valid("123e-4567e89b-12b3-a456-426614174000"));
    }

    #[test]
    fn test_id128_randomize() {
        for _ in 0..10 {
            let id = id128_randomize();
            assert!(id128_is_valid(&id));
        }
        assert_ne!(id128_randomize(), id128_randomize());
    }

    #[test]
    fn test_id128_to_uuid() {
        assert_eq!(
            id128_to_uuid("12345678901234567890abcdef123456").unwrap(),
            "12345678-9012-3456-7890-abcdef123456"
        );
        assert!(id128_to_uuid("123").is_err());
    }

    #[test]
    fn test_id128_read_write() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("invocation");
        id128_write(&p, "12345678901234567890abcdef123456").unwrap();
        assert_eq!(
            id128_read_by_path(&p).unwrap(),
            "12345678901234567890abcdef123456"
        );
        std::fs::write(&p, "not an id").unwrap();
        assert!(id128_read_by_path(&p).is_err());
    }
}
