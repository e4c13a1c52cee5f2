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

/*Associate the unit object
*You need to notify the Unit object and change the method
*Get the attributes of the unit object
*Call relation
*target_unit->target_mng->target_comm
*/
use core::unit::{UmIf, UnitBase};
use once_cell::sync::Lazy;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::{Arc, RwLock};

pub(super) struct TargetUnitComm {
    owner: RefCell<Option<Weak<dyn UnitBase>>>,
    umcomm: Arc<TargetUmComm>,
}

impl TargetUnitComm {
    pub(super) fn new() -> Self {
        TargetUnitComm {
            owner: RefCell::new(None),
            umcomm: TargetUmComm::get_instance(),
        }
    }

    pub(super) fn attach_um(&self, um: Rc<dyn UmIf>) {
        self.umcomm.attach_um(um)
    }

    pub(super) fn attach_unit(&self, unit: Rc<dyn UnitBase>) {
        self.owner.replace(Some(Rc::downgrade(&unit)));
    }

    pub(super) fn owner(&self) -> Option<Rc<dyn UnitBase>> {
        if let Some(ref unit) = *self.owner.borrow() {
            unit.upgrade()
        } else {
            None
        }
    }
}

static TARGET_UM_COMM: Lazy<Arc<TargetUmComm>> = Lazy::new(|| {
    let comm = TargetUmComm::new();
    Arc::new(comm)
});

pub(super) struct TargetUmComm {
    data: RwLock<TargetUmCommData>,
}

unsafe impl Send for TargetUmComm {}

unsafe impl Sync for TargetUmComm {}

impl TargetUmComm {
    pub(super) fn new() -> Self {
        TargetUmComm {
            data: RwLock::new(TargetUmCommData::new()),
        }
    }

    pub(super) fn get_instance() -> Arc<TargetUmComm> {
        TARGET_UM_COMM.clone()
    }

    pub(super) fn attach_um(&self, um: Rc<dyn UmIf>) {
        let mut wdata = self.data.write().unwrap();
        wdata.attach_um(um);
    }
}

struct TargetUmCommData {
    // associated objects
    um: Option<Rc<dyn UmIf>>,
}

// the declaration "pub(self)" is for identification only.
impl TargetUmCommData {
    pub(self) fn new() -> TargetUmCommData {
        TargetUmCommData { um: None }
    }

    pub(self) fn attach_um(&mut self, um: Rc<dyn UmIf>) {
        if self.um.is_none() {
            log::debug!("TargetUmComm attach_um action.");
            self.um = Some(um)
        }
    }
}
