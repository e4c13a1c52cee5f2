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

//! ScopeManager is the entry of the scope plugin.
use super::comm::ScopeUmComm;
use core::unit::{UmIf, UnitManagerObj, UnitMngUtil, UnitType};
use std::rc::Rc;
use std::sync::Arc;

struct ScopeManager {
    comm: Arc<ScopeUmComm>,
}

// the declaration "pub(self)" is for identification only.
impl ScopeManager {
    pub(self) fn new() -> ScopeManager {
        let _comm = ScopeUmComm::get_instance();
        ScopeManager {
            comm: Arc::clone(&_comm),
        }
    }
}

impl UnitManagerObj for ScopeManager {
    fn private_section(&self, _unit_type: UnitType) -> String {
        "Scope".to_string()
    }

    fn can_transient(&self, _unit_type: UnitType) -> bool {
        true
    }
}

impl UnitMngUtil for ScopeManager {
    fn attach_um(&self, um: Rc<dyn UmIf>) {
        self.comm.attach_um(um);
    }
}

use core::declare_umobj_plugin;
declare_umobj_plugin!(ScopeManager, ScopeManager::new);
