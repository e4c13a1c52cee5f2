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

use crate::unit::util::{self};

use core::unit::{UmIf, UnitManagerObj, UnitType};
use std::cell::RefCell;
use std::collections::HashMap;
use std::convert::TryFrom;
use std::rc::{Rc, Weak};

pub(super) struct UnitSubManagers {
    // owned objects
    um: RefCell<Option<Weak<dyn UmIf>>>,
    db: RefCell<HashMap<UnitType, Box<dyn UnitManagerObj>>>,
}

impl UnitSubManagers {
    pub(super) fn new() -> UnitSubManagers {
        UnitSubManagers {
            um: RefCell::new(None),
            db: RefCell::new(HashMap::new()),
        }
    }

    pub(super) fn set_um(&self, um: Rc<dyn UmIf>) {
        // update um
        self.um.replace(Some(Rc::downgrade(&um)));

        // fill all unit-types
        for ut in 0..UnitType::UnitTypeMax as u32 {
            self.add_sub(UnitType::try_from(ut).ok().unwrap());
        }
    }

    pub(super) fn enumerate(&self) {
        for (_, sub) in self.db.borrow().iter() {
            sub.enumerate();
        }
    }

    pub(super) fn private_section(&self, unit_type: UnitType) -> String {
        if let Some(sub) = self.db.borrow().get(&unit_type) {
            sub.private_section(unit_type)
        } else {
            String::from("")
        }
    }

    pub(super) fn can_transient(&self, unit_type: UnitType) -> bool {
        if let Some(sub) = self.db.borrow().get(&unit_type) {
            sub.can_transient(unit_type)
        } else {
            false
        }
    }

    fn add_sub(&self, unit_type: UnitType) {
        assert!(!self.db.borrow().contains_key(&unit_type));

        let sub = self.new_sub(unit_type);
        if let Some(s) = sub {
            self.db.borrow_mut().insert(unit_type, s);
        }
    }

    fn new_sub(&self, unit_type: UnitType) -> Option<Box<dyn UnitManagerObj>> {
        let um = self.um();
        log::info!(
            "Creating UnitManagerObj for {:?} by __um_obj_create()",
            unit_type
        );
        let sub = match util::create_um_obj(unit_type) {
            Err(_) => {
                log::info!("__um_obj_create() of {:?} is not found", unit_type);
                return None;
            }
            Ok(v) => v,
        };

        sub.attach_um(um);
        Some(sub)
    }

    fn um(&self) -> Rc<dyn UmIf> {
        self.um.clone().into_inner().unwrap().upgrade().unwrap()
    }
}
