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

//! Well-known unit names the manager refers to by itself.

/// the default boot goal
pub const DEFAULT_TARGET: &str = "default.target";
/// early-boot synchronization point
pub const BASIC_TARGET: &str = "basic.target";
/// started on SIGINT
pub const CTRL_ALT_DEL_TARGET: &str = "ctrl-alt-del.target";
/// pulled in while shutting down
pub const SHUTDOWN_TARGET: &str = "shutdown.target";
