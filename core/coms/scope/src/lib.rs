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

//! # Scope tracks processes unitmaster did not fork itself
//!  A scope is created programmatically only (transient units over the bus
//!  surface); there is no unit file on disk. The creating client hands over
//!  the pids, the manager watches them and the scope stays active for as
//!  long as any of them lives. `abandon` gives the processes up without
//!  killing them.
//! ##  Automatic dependency
//!
//! ###  Implicit dependency
//!  No implicit dependencies
//!
//! ###  Default Dependency
//!  No default dependencies

pub use {manager::__um_obj_create, unit::__subunit_create_with_params};

// dependency: scope_comm -> scope_mng -> scope_unit -> scope_manager
mod comm;
mod manager;
mod mng;
mod unit;
