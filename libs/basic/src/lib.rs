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

//! Small shared utilities: unit names, time, 128-bit ids, lookup paths,
//! conditions and a few fd/process helpers.

pub mod condition;
pub mod config;
pub mod error;
pub mod fd_util;
pub mod fs;
pub mod id128;
pub mod path_lookup;
pub mod process;
pub mod socket;
pub mod special;
pub mod time_util;
pub mod unit_name;

pub use error::{Error, Result};
