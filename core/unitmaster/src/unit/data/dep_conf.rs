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

use core::unit::UnitRelations;
use std::collections::HashMap;

/// dependency names a loader collected from the configuration of one
/// unit, keyed by relation, not yet resolved to loaded units
#[derive(Default, Clone)]
pub struct UnitDepConf {
    pub deps: HashMap<UnitRelations, Vec<String>>,
    /* mount units covering the paths of RequiresMountsFor, parent chain
     * already expanded; they become Requires+After edges with the
     * path-requirement reason instead of the plain file reason */
    pub mounts_for: Vec<String>,
}

impl UnitDepConf {
    pub fn new() -> UnitDepConf {
        UnitDepConf {
            deps: HashMap::new(),
            mounts_for: Vec::new(),
        }
    }

    pub fn add(&mut self, relation: UnitRelations, names: Vec<String>) {
        self.deps.entry(relation).or_default().extend(names);
    }
}
