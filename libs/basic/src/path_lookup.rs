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

//! the management of the unit file lookup path
use std::env;

/// unit lookup path in /etc, highest priority
pub const ETC_SYSTEM_PATH: &str = "/etc/unitmaster/system";
/// unit lookup path in /run
pub const RUN_SYSTEM_PATH: &str = "/run/unitmaster/system";
/// unit lookup path in /usr/lib, lowest priority
pub const LIB_SYSTEM_PATH: &str = "/usr/lib/unitmaster/system";

/// struct LookupPaths
#[derive(Debug, Clone)]
pub struct LookupPaths {
    /// Used to search fragment and dropin files, ordered by descending
    /// priority.
    pub search_path: Vec<String>,
    /// transient unit files live here
    pub transient: String,
    /// administrator configuration, wins over everything below /usr
    pub persistent_path: String,
}

impl LookupPaths {
    /// new
    pub fn new() -> Self {
        LookupPaths {
            search_path: Vec::new(),
            transient: String::from(constants::TRANSIENT_DIR),
            persistent_path: String::from(ETC_SYSTEM_PATH),
        }
    }

    /// init lookup paths, honoring the environment override used by tests
    pub fn init_lookup_paths(&mut self) {
        if let Ok(paths) = env::var(constants::UNIT_PATH_ENV) {
            for p in paths.split(':').filter(|p| !p.is_empty()) {
                self.search_path.push(p.to_string());
            }
        }

        self.search_path.push(ETC_SYSTEM_PATH.to_string());
        self.search_path.push(RUN_SYSTEM_PATH.to_string());
        self.search_path.push(self.transient.clone());
        self.search_path.push(LIB_SYSTEM_PATH.to_string());
    }
}

impl Default for LookupPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::LookupPaths;

    #[test]
    fn test_init_lookup_paths() {
        let mut lp = LookupPaths::default();
        lp.init_lookup_paths();
        assert!(lp
            .search_path
            .contains(&super::ETC_SYSTEM_PATH.to_string()));
        assert!(lp
            .search_path
            .contains(&super::LIB_SYSTEM_PATH.to_string()));
        let etc = lp
            .search_path
            .iter()
            .position(|p| p == super::ETC_SYSTEM_PATH)
            .unwrap();
        let lib = lp
            .search_path
            .iter()
            .position(|p| p == super::LIB_SYSTEM_PATH)
            .unwrap();
        assert!(etc < lib);
    }
}
