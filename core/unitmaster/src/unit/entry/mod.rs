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

//! The unit entry is the per-unit state the engine keeps for every managed
//! object: the identity, the parsed `[Unit]`/`[Install]` configuration, the
//! load machinery, the watched children, the cgroup attachment, conditions,
//! the start rate limiter and the resource accounting. The engine itself only
//! ever sees [`UnitX`], a thin wrapper around the entry; the type-specific
//! behavior lives behind the `SubUnit` trait object each entry owns.

pub(crate) use config::{CollectMode, JobMode, UnitEmergencyAction};
pub(crate) use load::UnitLoadState;
pub(crate) use ratelimit::StartLimitResult;
pub use uentry::Unit;
pub(crate) use unitx::UnitX;

// dependency:
// condition ->
// base -> {config | cgroup} -> {load | child | ratelimit | accounting} ->
// {bus -> uentry} -> {unitx}
mod accounting;
mod base;
mod bus;
mod cgroup;
mod child;
mod condition;
mod config;
mod load;
mod ratelimit;
mod uentry;
mod unitx;
