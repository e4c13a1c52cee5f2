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

use super::deps::{unit_name_to_type, UnitType, UnitWriteFlags};
use super::state::{UnitActiveState, UnitNotifyFlags};
use super::umif::UnitMngUtil;
use crate::error::*;
use nix::sys::socket::UnixCredentials;
use nix::sys::wait::WaitStatus;
use std::any::Any;
use std::{collections::HashMap, path::PathBuf, rc::Rc};

pub use basic::unit_name::UnitNameFlags;

///The trait Defining Shared Behavior from Base Unit  to SUB unit
///
/// only one impl,sub unit ref by impl UnitBase
///
pub trait UnitBase {
    ///
    fn id(&self) -> String;
    ///
    fn unit_type(&self) -> UnitType;
    ///
    fn test_start_limit(&self) -> bool;
    ///
    fn reset_start_limit(&self);

    ///
    fn notify(
        &self,
        original_state: UnitActiveState,
        new_state: UnitActiveState,
        flags: UnitNotifyFlags,
    );

    ///
    fn default_dependencies(&self) -> bool;

    ///
    fn cg_path(&self) -> PathBuf;

    ///
    fn ignore_on_isolate(&self) -> bool;

    ///
    fn set_ignore_on_isolate(&self, ignore_on_isolate: bool);

    ///
    fn is_load_stub(&self) -> bool;

    ///
    fn transient(&self) -> bool;

    ///
    fn transient_file(&self) -> Option<PathBuf>;

    ///
    fn last_section_private(&self) -> i8;

    ///
    fn set_last_section_private(&self, lsp: i8);
}

///The trait Defining Shared Behavior of sub unit
///
/// difference sub unit ref by dynamic trait
///
pub trait SubUnit: UnitMngUtil {
    ///
    fn as_any(&self) -> &dyn Any;
    ///
    fn init(&self) {}

    ///
    fn done(&self) {}

    ///
    fn load(&self, conf: Vec<PathBuf>) -> Result<()>;

    ///
    fn dump(&self) {}

    /// Start a Unit
    /// Each Sub Unit need to implement its own start function
    ///
    fn start(&self) -> Result<()> {
        Ok(())
    }

    ///
    // process reentrant with force
    fn stop(&self, _force: bool) -> Result<()> {
        Ok(())
    }

    /// return UnitActionEOpNotSupp for default, if the sub unit not realizing the method
    fn reload(&self) -> Result<()> {
        Err(Error::UnitActionEOpNotSupp)
    }

    ///
    fn can_reload(&self) -> bool {
        false
    }

    ///
    fn can_start(&self) -> bool {
        true
    }

    ///
    fn can_stop(&self) -> bool {
        true
    }

    /// restore the state machine from deserialized records, no actions taken
    fn coldplug(&self) {}

    /// reconcile with whatever happened while the manager was not watching
    fn catchup(&self) {}

    ///
    fn release_resources(&self) {}

    ///
    fn sigchld_events(&self, _wait_status: WaitStatus) {}

    ///
    fn reset_failed(&self) {}

    /// type private records for the state snapshot, keys are taken as-is
    fn serialize(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    /// one type private record read back from the state snapshot
    fn deserialize_item(&self, _key: &str, _value: &str) -> Result<()> {
        Ok(())
    }

    /// whether the unit may be collected now, a veto keeps it alive
    fn may_gc(&self) -> bool {
        true
    }

    /// the unit is about to be started again, keep it off the gc queue
    fn will_restart(&self) -> bool {
        false
    }

    ///
    fn notify_cgroup_empty(&self) {}

    ///
    fn notify_cgroup_oom(&self) {}

    ///Get the the unit state
    ///
    /// Every sub unit  can define self states and map to [`UnitActiveState`]
    ///
    fn current_active_state(&self) -> UnitActiveState;

    /// Return the state of subunit, i.e. (running for .scope, active for .target)
    fn get_subunit_state(&self) -> String;

    ///
    fn attach_unit(&self, unit: Rc<dyn UnitBase>);

    ///
    fn notify_message(
        &self,
        _ucred: &UnixCredentials,
        _events: &HashMap<&str, &str>,
        _fds: Vec<i32>,
    ) -> Result<()> {
        Ok(())
    }

    ///
    fn get_perpetual(&self) -> bool {
        false
    }

    /// apply one programmatic property of the type private section
    fn unit_set_property(&self, _key: &str, _value: &str, _flags: UnitWriteFlags) -> Result<()> {
        Err(Error::NotFound {
            what: "set property".to_string(),
        })
    }

    /// a unit of the Triggers list changed state
    fn trigger_notify(&self, _other: &str) {}

    /// jobs queued for this unit may be collected when nothing waits for them
    fn gc_jobs(&self) -> bool {
        false
    }

    /// the unit can only ever go through one start cycle
    fn once_only(&self) -> bool {
        false
    }

    /// processes of the unit run under a delegated cgroup subtree
    fn can_delegate(&self) -> bool {
        false
    }

    // ================ ONLY VALID FOR SCOPE ================
    ///
    fn abandon(&self) -> Result<()> {
        Err(Error::UnitActionEOpNotSupp)
    }
}

/// the macro for create a sub unit instance with dyn ref of UmIf,
/// which sub unit wants invoke um interface, about UmIf see doc of UmIf
#[macro_export]
macro_rules! declare_unitobj_plugin_with_param {
    ($unit_type:ty, $constructor:path) => {
        /// method for create the unit instance
        pub fn __subunit_create_with_params(
            um: std::rc::Rc<dyn $crate::unit::UmIf>,
        ) -> *mut dyn $crate::unit::SubUnit {
            let constructor: fn(um: std::rc::Rc<dyn $crate::unit::UmIf>) -> $unit_type =
                $constructor;
            let obj = constructor(um);
            let boxed: Box<dyn $crate::unit::SubUnit> = Box::new(obj);
            Box::into_raw(boxed)
        }
    };
}

/// check that the given name is well formed and names a known unit type
pub fn unit_name_is_valid(name: &str, flags: UnitNameFlags) -> bool {
    if !basic::unit_name::unit_name_is_valid(name, flags) {
        return false;
    }
    unit_name_to_type(name) != UnitType::UnitTypeInvalid
}

#[cfg(test)]
mod tests {
    use super::{unit_name_is_valid, UnitNameFlags};

    #[test]
    fn test_unit_name_is_valid() {
        let s_name = "foo.target";
        let s_temp_name = "bar@.target";
        let s_ins_name = "bar@123.target";
        assert!(unit_name_is_valid(s_name, UnitNameFlags::PLAIN));
        assert!(unit_name_is_valid(s_temp_name, UnitNameFlags::TEMPLATE));
        assert!(unit_name_is_valid(s_ins_name, UnitNameFlags::INSTANCE));
        assert!(unit_name_is_valid("session-4.scope", UnitNameFlags::ANY));
    }

    #[test]
    fn test_unit_name_is_not_valid() {
        let s_invalid_name = "@.target";
        let s_invalid_tmp_name = "@bar.target";
        let s_invalid_ins_name = "@bar123.target";
        assert!(!unit_name_is_valid(s_invalid_name, UnitNameFlags::PLAIN));
        assert!(!unit_name_is_valid(
            s_invalid_tmp_name,
            UnitNameFlags::TEMPLATE
        ),);
        assert!(!unit_name_is_valid(
            s_invalid_ins_name,
            UnitNameFlags::INSTANCE
        ),);
        /* well formed, but not a type this manager knows */
        assert!(!unit_name_is_valid("foo.service", UnitNameFlags::ANY));
        assert!(!unit_name_is_valid("foo.mount", UnitNameFlags::ANY));
    }
}
