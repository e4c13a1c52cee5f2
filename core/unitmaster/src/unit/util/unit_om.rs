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

use core::error::*;
use core::unit::UmIf;
use core::unit::{SubUnit, UnitManagerObj, UnitType};
use std::rc::Rc;

/// Create a obj for subclasses of unit manager
pub(crate) fn create_um_obj(unit_type: UnitType) -> Result<Box<dyn UnitManagerObj>> {
    #[cfg(feature = "noplugin")]
    return noplugin::create_um_obj(unit_type);
}

/// Create the subunit trait of unit
pub(crate) fn create_subunit_with_um(
    unit_type: UnitType,
    um: Rc<dyn UmIf>,
) -> Result<Box<dyn SubUnit>> {
    #[cfg(feature = "noplugin")]
    return noplugin::create_subunit_with_um(unit_type, um);
}

#[cfg(feature = "noplugin")]
mod noplugin {
    use core::error::*;
    use core::unit::UmIf;
    use core::unit::{SubUnit, UnitManagerObj, UnitType};
    use scope::{self};
    use std::rc::Rc;
    use target::{self};

    pub(super) fn create_um_obj(unit_type: UnitType) -> Result<Box<dyn UnitManagerObj>> {
        let fun = match unit_type {
            UnitType::UnitTarget => target::__um_obj_create,
            UnitType::UnitScope => scope::__um_obj_create,
            _ => {
                return Err(Error::Other {
                    msg: "Component doesn't exist".to_string(),
                })
            }
        };
        let boxed_raw = fun();
        Ok(unsafe { Box::from_raw(boxed_raw) })
    }

    pub(super) fn create_subunit_with_um(
        unit_type: UnitType,
        um: Rc<dyn UmIf>,
    ) -> Result<Box<dyn SubUnit>> {
        let fun = match unit_type {
            UnitType::UnitTarget => target::__subunit_create_with_params,
            UnitType::UnitScope => scope::__subunit_create_with_params,
            _ => {
                return Err(Error::Other {
                    msg: "Component doesn't exist".to_string(),
                })
            }
        };
        let boxed_raw = fun(um.clone());
        Ok(unsafe { Box::from_raw(boxed_raw) })
    }
}
