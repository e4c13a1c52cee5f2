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

//! Job is the execution unit of the transition requested on a unit.
//! The module contains:
//!
//! `[entry]`: the job object itself, its kinds, results and timer.
//!
//! `[slot]`: the per-unit holder of the one state-changing job plus a nop.
//!
//! `[table]`: the manager-wide job table with its ready view.
//!
//! `[manager]`: the public surface installing, running and finishing jobs.
//!
//! `[notify]`: expansion of unit state changes into jobs on related units.
pub(crate) use entry::{JobConf, JobInfo, JobKind, JobResult, JobStage};
pub(crate) use manager::{JobAffect, JobManager};

// dependency: entry -> slot -> {table | notify | stat} -> manager
mod entry;
mod manager;
mod notify;
mod slot;
mod stat;
mod table;
