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

use core::unit::UnitType;
use std::cell::RefCell;

pub(super) struct UeBase {
    // owned objects
    id: RefCell<String>,
    unit_type: UnitType,
}

impl UeBase {
    pub(super) fn new(id: String, unit_type: UnitType) -> UeBase {
        UeBase {
            id: RefCell::new(id),
            unit_type,
        }
    }

    pub(super) fn id(&self) -> String {
        self.id.borrow().to_string()
    }

    // a stub picks the real name up at load time
    pub(super) fn set_id(&self, id: &str) {
        *self.id.borrow_mut() = String::from(id);
    }

    pub(super) fn unit_type(&self) -> UnitType {
        self.unit_type
    }
}
