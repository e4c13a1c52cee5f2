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

//!  Unit is the main module for process 1 to manage and abstract system services
//!  The module contains:
//!
//!  `[base]`: definition of the unit dependency vocabulary and its atom expansion.
//!
//!  `[data]`: the tables the entry layer publishes its state changes through.
//!
//!  `[datastore]`: the unit object storage module is responsible for storing the unit module status.
//!
//!  `[entry]`: definition of unit related objects
//!
//!  `[manager]`: manager all unit instances in unitmaster
//!
//!  `[runtime]`: the work queues the manager drains between event dispatches.
pub(crate) use core::unit::{UnitRelations, UnitType};
pub(super) use core::unit::unit_name_to_type;
pub(super) use data::DataManager;
pub(super) use datastore::UnitDb;
pub(super) use bus::UnitProperty;
pub(super) use entry::{JobMode, UnitX};
pub(super) use manager::UnitManagerX;
pub(super) use runtime::UnitChangeSink;

#[cfg(test)]
pub(super) use test::test_utils;

// dependency:
// data -> base -> {util} ->
// entry -> {datastore -> runtime} -> job -> submanager
// {sigchld | notify} -> {bus -> manager(uload)}
mod base;
mod bus;
mod data;
mod datastore;
mod entry;
mod manager;
mod notify;
mod runtime;
mod sigchld;
mod submanager;
#[cfg(test)]
mod test;
mod uload;
mod util;
