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
*scope_unit->scope_mng->scope_comm
*/
use core::unit::{UmIf, UnitBase};
use once_cell::sync::Lazy;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::{Arc, RwLock};

pub(super) struct ScopeUnitComm {
    owner: RefCell<Option<Weak<dyn UnitBase>>>,
    umcomm: Arc<ScopeUmComm>,
}

impl ScopeUnitComm {
    pub(super) fn new() -> Self {
        ScopeUnitComm {
            owner: RefCell::new(None),
            umcomm: ScopeUmComm::get_instance(),
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

    pub(super) fn owner_id(&self) -> String {
        self.owner().map(|u| u.id()).unwrap_or_default()
    }

    pub(super) fn um(&self) -> Rc<dyn UmIf> {
        self.umcomm.um()
    }
}

static SCOPE_UM_COMM: Lazy<Arc<ScopeUmComm>> = Lazy::new(|| {
    let comm = ScopeUmComm::new();
    Arc::new(comm)
});

pub(super) struct ScopeUmComm {
    data: RwLock<ScopeUmCommData>,
}

unsafe impl Send for ScopeUmComm {}

unsafe impl Sync for ScopeUmComm {}

impl ScopeUmComm {
    pub(super) fn new() -> Self {
        ScopeUmComm {
            data: RwLock::new(ScopeUmCommData::new()),
        }
    }

    pub(super) fn get_instance() -> Arc<ScopeUmComm> {
        SCOPE_UM_COMM.clone()
    }

    pub(super) fn attach_um(&self, um: Rc<dyn UmIf>) {
        let mut wdata = self.data.write().unwrap();
        wdata.attach_um(um);
    }

    pub(super) fn um(&self) -> Rc<dyn UmIf> {
        let rdata = self.data.read().unwrap();
        rdata.um()
    }
}

struct ScopeUmCommData {
    // associated objects
    um: Option<Rc<dyn UmIf>>,
}

// the declaration "pub(self)" is for identification only.
impl ScopeUmCommData {
    pub(self) fn new() -> ScopeUmCommData {
        ScopeUmCommData { um: None }
    }

    pub(self) fn attach_um(&mut self, um: Rc<dyn UmIf>) {
        if self.um.is_none() {
            log::debug!("ScopeUmComm attach_um action.");
            self.um = Some(um)
        }
    }

    pub(self) fn um(&self) -> Rc<dyn UmIf> {
        self.um.as_ref().cloned().unwrap()
    }
}
