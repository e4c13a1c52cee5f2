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
//
#![allow(non_snake_case)]

use confique::{Config, FileFormat, Partial};
use constants::SYSTEM_CONFIG;

#[derive(Config, Debug)]
pub struct ManagerConfig {
    #[config(default = 90)]
    pub DefaultTimeoutSec: u64,
    #[config(default = 10)]
    pub DefaultStartLimitIntervalSec: u64,
    #[config(default = 5)]
    pub DefaultStartLimitBurst: u32,

    #[config(default = "info")]
    pub LogLevel: String,
    #[config(default = "console")]
    pub LogTarget: String,
    #[config(default = 10240)]
    pub LogFileSize: u32,
    #[config(default = 10)]
    pub LogFileNumber: u32,
}

impl ManagerConfig {
    /// environment beats the configuration file beats the defaults
    pub fn new(file: Option<&str>) -> ManagerConfig {
        type ConfigPartial = <ManagerConfig as Config>::Partial;
        let mut partial: ConfigPartial = match Partial::from_env() {
            Err(_) => return ManagerConfig::default(),
            Ok(v) => v,
        };
        partial = match confique::File::with_format(file.unwrap_or(SYSTEM_CONFIG), FileFormat::Toml)
            .load()
        {
            Err(_) => return ManagerConfig::default(),
            Ok(v) => partial.with_fallback(v),
        };
        partial = partial.with_fallback(ConfigPartial::default_values());
        match ManagerConfig::from_partial(partial) {
            Ok(v) => v,
            Err(_) => ManagerConfig::default(),
        }
    }

    pub fn reload(&mut self, file: Option<&str>) {
        *self = ManagerConfig::new(file);
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            DefaultTimeoutSec: 90,
            DefaultStartLimitIntervalSec: 10,
            DefaultStartLimitBurst: 5,
            LogLevel: "info".to_string(),
            LogTarget: "console".to_string(),
            LogFileSize: 10240,
            LogFileNumber: 10,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_without_file() {
        let config = ManagerConfig::new(Some("/no/such/file.conf"));
        assert_eq!(config.DefaultTimeoutSec, 90);
        assert_eq!(config.DefaultStartLimitBurst, 5);
        assert_eq!(config.LogLevel, "info");
    }
}
