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

//! # Target is the grouping and synchronization unit of unitmaster
//!  A target has no action of its own to execute; it exists to pull other
//!  units in through its dependencies and to act as a synchronization point
//!  during startup. The configuration file carries only Unit/Install
//!  sections, there is no private section.
//! #  Example:
//! ``` toml
//!  [Unit]
//!  Description=""
//!
//!  [Install]
//!  WantedBy=
//! ```
//! ##  Automatic dependency
//!
//! ###  Implicit dependency
//!  No implicit dependencies
//!
//! ###  Default Dependency
//!  If DefaultDependencies=true is set, an After= edge towards every unit
//!  the target pulls in is added by default.

pub use {manager::__um_obj_create, unit::__subunit_create_with_params};

// dependency: target_comm -> target_mng -> target_unit -> target_manager
mod comm;
mod manager;
mod mng;
mod unit;
