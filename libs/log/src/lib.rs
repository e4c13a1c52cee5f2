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

//! Logging facade of the project. Wraps the `log` ecosystem crate with our
//! own macros so that the global logger can be re-initialized at runtime,
//! which the registry crate forbids.
pub mod inner;
pub mod logger;

pub use log::max_level;
pub use log::set_max_level;
pub use log::Log;
pub use log::{Level, LevelFilter};
pub use log::{Metadata, MetadataBuilder};
pub use log::{Record, RecordBuilder};

pub use logger::init_log;

/// Reinit the logger based on the previous configuration.
pub fn reinit() {
    inner::reinit();
}

/// Initialize a console-only logger.
pub fn init_log_to_console(name: &str, level: Level) {
    init_log(name, level, vec!["console"], "", 0, 0);
}

/// Initialize a kmsg-only logger.
pub fn init_log_to_kmsg(name: &str, level: Level) {
    init_log(name, level, vec!["kmsg"], "", 0, 0);
}

/// Initialize kmsg and console loggers together.
pub fn init_log_to_kmsg_console(name: &str, level: Level) {
    init_log(name, level, vec!["kmsg", "console"], "", 0, 0);
}

/// Initialize a rotated file logger.
pub fn init_log_to_file(name: &str, level: Level, file_path: &str, file_size: u32, file_number: u32) {
    init_log(name, level, vec!["file"], file_path, file_size, file_number);
}

#[cfg(test)]
mod tests {
    use crate::{init_log, reinit, Level};

    #[test]
    fn test_init_log_to_console() {
        init_log("test", Level::Debug, vec!["console"], "", 0, 0);
        crate::error!("hello, error!");
        crate::set_max_level(Level::Info.to_level_filter());
        crate::info!("hello, info!");
        crate::debug!("hello debug!"); /* Won't print */
        reinit();
        crate::info!("hello after reinit!");
    }
}
