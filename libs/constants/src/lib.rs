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

//! Constants shared by the manager and the component crates.

/// Runtime directory of the manager
pub const RUN_DIR: &str = "/run/unitmaster";

/// Notify socket the manager listens on for unit status datagrams
pub const NOTIFY_SOCKET: &str = "/run/unitmaster/notify";

/// Directory holding per-unit exported runtime state
pub const UNITS_STATE_DIR: &str = "/run/unitmaster/units";

/// Directory holding synthesized fragments of transient units
pub const TRANSIENT_DIR: &str = "/run/unitmaster/transient";

/// Serialized manager state consumed with --deserialize after re-exec
pub const RELOAD_STATE_FILE: &str = "/run/unitmaster/reload";

/// Manager configuration file
pub const SYSTEM_CONFIG: &str = "/etc/unitmaster/system.conf";

/// Default log file path when LogTarget is configured to "file"
pub const LOG_FILE_PATH: &str = "/var/log/unitmaster/unitmaster.log";

/// Environment variable overriding the unit lookup paths, mainly for tests
pub const UNIT_PATH_ENV: &str = "UNITMASTER_UNIT_PATH";

/// Environment variable carrying the manager pid across re-exec
pub const MANAGER_ENV: &str = "MANAGER";

/// invalid fd
pub const INVALID_FD: i32 = -1;
