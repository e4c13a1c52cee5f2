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

//! Path helpers used by the unit file loader.

use crate::error::*;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const CHASE_SYMLINK_MAX: i32 = 32;

/// return true if the path refers to a symlink itself.
pub fn is_symlink(path: &Path) -> bool {
    let md = match path.symlink_metadata() {
        Ok(md) => md,
        Err(_) => return false,
    };

    md.file_type().is_symlink()
}

/// normalize a path string, resolving "." and ".." lexically.
pub fn path_simplify(p: &str) -> Option<String> {
    let mut res = String::new();
    let mut stack: Vec<&str> = Vec::new();
    for f in p.split('/') {
        if f.is_empty() || f == "." {
            continue;
        }
        if f == ".." {
            if let Some(v) = stack.last() {
                if *v != ".." {
                    stack.pop();
                    continue;
                }
            }
            if !p.starts_with('/') {
                stack.push(f);
                continue;
            }
            return None;
        }
        stack.push(f);
    }

    if stack.is_empty() {
        if p.starts_with('/') {
            return Some("/".to_string());
        } else {
            return Some(".".to_string());
        }
    }

    if p.starts_with('/') {
        res += "/";
    }
    res += stack.remove(0);

    for f in stack {
        res += "/";
        res += f;
    }

    Some(res)
}

/// chase the given symlink, and return the final target.
pub fn chase_symlink(link_path: &Path) -> Result<PathBuf> {
    let mut current_path = PathBuf::from(link_path);
    let mut max_follows = CHASE_SYMLINK_MAX;
    loop {
        let mut current_dir = match current_path.parent() {
            None => {
                return Err(Error::NotExisted {
                    what: "couldn't determine parent directory".to_string(),
                })
            }
            Some(v) => v.to_string_lossy().to_string(),
        };

        /* empty current_dir joined with "/target_path" will generate root directory mistakenly. */
        if current_dir.is_empty() {
            current_dir = ".".to_string();
        }

        let mut target_path = match std::fs::read_link(&current_path) {
            Err(e) => return Err(Error::Io { source: e }),
            Ok(v) => v,
        };

        if target_path.is_relative() {
            let current_path_str = current_dir + "/" + &target_path.to_string_lossy();
            let simplified_path = match path_simplify(&current_path_str) {
                None => {
                    return Err(Error::Invalid {
                        what: format!("invalid file path: {}", current_path_str),
                    })
                }
                Some(v) => v,
            };
            target_path = match PathBuf::from_str(&simplified_path) {
                Err(_) => {
                    return Err(Error::Invalid {
                        what: format!("invalid file path: {}", current_path_str),
                    })
                }
                Ok(v) => v,
            };
        }

        if !target_path.exists() {
            return Err(Error::Nix {
                source: nix::errno::Errno::ENOENT,
            });
        }

        if !is_symlink(&target_path) {
            return Ok(target_path);
        }

        max_follows -= 1;
        if max_follows <= 0 {
            break;
        }
        current_path = target_path;
    }
    Err(Error::Nix {
        source: nix::errno::Errno::ELOOP,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_simplify() {
        assert_eq!(path_simplify("/a/b/../c"), Some("/a/c".to_string()));
        assert_eq!(path_simplify("/a//./b/"), Some("/a/b".to_string()));
        assert_eq!(path_simplify("/.."), None);
        assert_eq!(path_simplify("/"), Some("/".to_string()));
        assert_eq!(path_simplify("a/.."), Some(".".to_string()));
    }

    #[test]
    fn test_is_symlink() {
        assert!(!is_symlink(Path::new("/definitely/not/here")));
        assert!(!is_symlink(Path::new("/")));
    }
}
