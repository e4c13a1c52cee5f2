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

//! the utils to test the conditions
use libc::{glob, glob_t, GLOB_NOSORT};
use std::{ffi::CString, fs, os::unix::fs::PermissionsExt, path::Path};

/// the type of the condition
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ConditionType {
    /// check whether the service manager is running on AC Power.
    ACPower,
    /// check if the directory is empty
    DirectoryNotEmpty,
    /// check if the file is executable
    FileIsExecutable,
    /// check file is empty
    FileNotEmpty,
    /// conditionalize units on whether the system boots up for the first time
    FirstBoot,
    /// check path exist
    PathExists,
    /// check if the path exists using glob pattern
    PathExistsGlob,
    /// check if the path is directory
    PathIsDirectory,
    /// check whether the service manager is running as the given user.
    User,
}

/// check whether the condition is met.
/// if the condition starts with '|', trigger it; one met trigger condition
/// carries the whole set.
/// if the condition starts with '!', revert the result.
pub struct Condition {
    c_type: ConditionType,
    trigger: i8,
    revert: i8,
    params: String,
}

impl Condition {
    /// create the condition instance
    pub fn new(c_type: ConditionType, trigger: i8, revert: i8, params: String) -> Self {
        Condition {
            c_type,
            trigger,
            revert,
            params,
        }
    }

    /// return the trigger
    pub fn trigger(&self) -> i8 {
        self.trigger
    }

    /// return the revert
    pub fn revert(&self) -> i8 {
        self.revert
    }

    /// running the condition test
    pub fn test(&self) -> bool {
        // empty params means the condition is not set, the test succeeds
        if self.params.is_empty() {
            return true;
        }
        let result = match self.c_type {
            /* The following functions return a positive value if the check passes. */
            ConditionType::ACPower => self.test_ac_power(),
            ConditionType::DirectoryNotEmpty => self.test_directory_not_empty(),
            ConditionType::FileIsExecutable => self.test_file_is_executable(),
            ConditionType::FileNotEmpty => self.test_file_not_empty(),
            ConditionType::FirstBoot => self.test_first_boot(),
            ConditionType::PathExists => self.test_path_exists(),
            ConditionType::PathExistsGlob => self.test_path_exists_glob(),
            ConditionType::PathIsDirectory => self.test_path_is_directory(),
            ConditionType::User => self.test_user(),
        };

        (result > 0) ^ (self.revert() >= 1)
    }

    fn test_ac_power(&self) -> i8 {
        /* params comes from bool.to_string(), so it is exactly "true" or
         * "false", never "yes"/"on". */
        let is_true = self.params.eq("true");
        !(is_true ^ on_ac_power()) as i8
    }

    fn test_directory_not_empty(&self) -> i8 {
        let path = Path::new(&self.params);
        if !path.is_dir() {
            return 0;
        }
        match path.read_dir() {
            Err(_) => 0,
            Ok(mut iter) => iter.next().is_some() as i8,
        }
    }

    fn test_file_is_executable(&self) -> i8 {
        let path = Path::new(&self.params);
        if !path.is_file() {
            return 0;
        }
        match fs::metadata(path) {
            Err(_) => 0,
            Ok(meta) => ((meta.permissions().mode() & 0o111) != 0) as i8,
        }
    }

    fn test_file_not_empty(&self) -> i8 {
        let path = Path::new(&self.params);
        fs::metadata(path).map_or(0, |m| (m.is_file() && m.len() > 0) as i8)
    }

    fn test_first_boot(&self) -> i8 {
        let is_true = match crate::config::parse_boolean(&self.params) {
            Err(_) => {
                log::error!(
                    "Failed to parse ConditionFirstBoot value: {}, assuming the check failed",
                    self.params
                );
                return 0;
            }
            Ok(v) => v,
        };
        let first_boot = Path::new(constants::RUN_DIR).join("first-boot").exists();
        !(is_true ^ first_boot) as i8
    }

    fn test_path_exists(&self) -> i8 {
        Path::new(&self.params).exists() as i8
    }

    fn test_path_exists_glob(&self) -> i8 {
        let pattern = match CString::new(self.params.as_str()) {
            Err(_) => return 0,
            Ok(v) => v,
        };
        let mut pglob: glob_t = unsafe { std::mem::zeroed() };
        let status = unsafe {
            let status = glob(pattern.as_ptr(), GLOB_NOSORT, None, &mut pglob);
            libc::globfree(&mut pglob);
            status
        };
        (status == 0) as i8
    }

    fn test_path_is_directory(&self) -> i8 {
        Path::new(&self.params).is_dir() as i8
    }

    fn test_user(&self) -> i8 {
        let uid = nix::unistd::getuid();
        if let Ok(param_uid) = self.params.parse::<u32>() {
            return (uid.as_raw() == param_uid) as i8;
        }
        match nix::unistd::User::from_uid(uid) {
            Ok(Some(user)) => (user.name == self.params) as i8,
            _ => 0,
        }
    }
}

/// every power supply that is not a battery counts as AC here
fn on_ac_power() -> bool {
    let entries = match Path::new("/sys/class/power_supply").read_dir() {
        /* No power supply class at all, typical for VMs: assume AC. */
        Err(_) => return true,
        Ok(v) => v,
    };

    let mut found_battery = false;
    let mut found_online = false;
    for entry in entries.flatten() {
        let type_path = entry.path().join("type");
        let t = match fs::read_to_string(type_path) {
            Err(_) => continue,
            Ok(v) => v,
        };
        if t.trim() == "Battery" {
            found_battery = true;
            continue;
        }
        let online = match fs::read_to_string(entry.path().join("online")) {
            Err(_) => continue,
            Ok(v) => v,
        };
        if online.trim() == "1" {
            found_online = true;
        }
    }

    found_online || !found_battery
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_exists() {
        let cond = Condition::new(ConditionType::PathExists, 0, 0, "/".to_string());
        assert!(cond.test());

        let cond = Condition::new(
            ConditionType::PathExists,
            0,
            0,
            "/no/such/path/anywhere".to_string(),
        );
        assert!(!cond.test());

        /* reverted */
        let cond = Condition::new(
            ConditionType::PathExists,
            0,
            1,
            "/no/such/path/anywhere".to_string(),
        );
        assert!(cond.test());
    }

    #[test]
    fn test_path_is_directory() {
        let cond = Condition::new(ConditionType::PathIsDirectory, 0, 0, "/etc".to_string());
        assert!(cond.test());

        let cond = Condition::new(
            ConditionType::PathIsDirectory,
            0,
            0,
            "/etc/hostname".to_string(),
        );
        assert!(!cond.test());
    }

    #[test]
    fn test_path_exists_glob() {
        let cond = Condition::new(ConditionType::PathExistsGlob, 0, 0, "/e*c".to_string());
        assert!(cond.test());

        let cond = Condition::new(
            ConditionType::PathExistsGlob,
            0,
            0,
            "/no/such/*/anywhere".to_string(),
        );
        assert!(!cond.test());
    }

    #[test]
    fn test_directory_not_empty() {
        let cond = Condition::new(ConditionType::DirectoryNotEmpty, 0, 0, "/etc".to_string());
        assert!(cond.test());

        let dir = tempfile::tempdir().unwrap();
        let cond = Condition::new(
            ConditionType::DirectoryNotEmpty,
            0,
            0,
            dir.path().to_string_lossy().to_string(),
        );
        assert!(!cond.test());
    }

    #[test]
    fn test_empty_params_passes() {
        let cond = Condition::new(ConditionType::PathExists, 0, 0, String::new());
        assert!(cond.test());
    }
}
