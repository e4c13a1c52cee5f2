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

//! UnitManager interfaces
use super::{UnitDependencyMask, UnitRelationAtom, UnitRelations, UnitType};
use crate::error::*;
use nix::unistd::Pid;
use std::rc::Rc;

///The trait Defining Shared Behavior of UnitManager
///
///The Behavior shared with all SubUnit,
///
/// if SubUnit needs to obtain information about othes,
///
/// need create Self by attach a Impl UmIf
///
pub trait UmIf {
    /// get the unit the has atom relation with the unit
    fn get_dependency_list(&self, _unit_name: &str, _atom: UnitRelationAtom) -> Vec<String> {
        Vec::new()
    }

    /// judge the unit has default dependency
    fn unit_has_default_dependency(&self, _unit_name: &str) -> bool {
        false
    }

    /// check the unit s_u_name and t_u_name have atom relation
    fn unit_has_dependency(
        &self,
        _s_u_name: &str,
        _atom: UnitRelationAtom,
        _t_u_name: &str,
    ) -> bool {
        false
    }

    ///add a unit dependency to th unit deplist
    /// can called by sub unit
    /// sub unit add some default dependency
    ///
    fn unit_add_dependency(
        &self,
        _unit_name: &str,
        _relation: UnitRelations,
        _target_name: &str,
        _add_ref: bool,
        _mask: UnitDependencyMask,
    ) -> Result<()> {
        Ok(())
    }

    ///add two unit dependency to the unit
    /// can called by sub unit
    /// sub unit add some default dependency
    ///
    fn unit_add_two_dependency(
        &self,
        _unit_name: &str,
        _ra: UnitRelations,
        _rb: UnitRelations,
        _target_name: &str,
        _add_ref: bool,
        _mask: UnitDependencyMask,
    ) -> Result<()> {
        Ok(())
    }

    /// add pid and its correspond unit to the watch map,
    /// exclusive displaces whoever watched the pid before
    fn child_watch_pid(&self, _id: &str, _pid: Pid, _exclusive: bool) {}

    /// delete the pid from the watch map
    fn child_unwatch_pid(&self, _id: &str, _pid: Pid) {}

    /// add all the pid of unit id, read pids from cgroup path.
    fn child_watch_all_pids(&self, _id: &str) {}

    /// remove all the pid of unit id
    fn child_unwatch_all_pids(&self, _id: &str) {}
}

/// the trait used for attach UnitManager to sub unit
pub trait UnitMngUtil {
    /// the method of attach to UnitManager to sub unit
    fn attach_um(&self, um: Rc<dyn UmIf>);
}

///The trait Defining Shared Behavior of sub unit-manager
pub trait UnitManagerObj: UnitMngUtil {
    ///
    fn enumerate_perpetual(&self) {}
    ///
    fn enumerate(&self) {}
    ///
    fn shutdown(&self) {}
    ///
    fn private_section(&self, _unit_type: UnitType) -> String {
        null_str!("")
    }
    ///
    fn can_transient(&self, _unit_type: UnitType) -> bool {
        false
    }
}

/// the macro for create a sub unit-manager instance
#[macro_export]
macro_rules! declare_umobj_plugin {
    ($unit_type:ty, $constructor:path) => {
        /// method for create the sub-unit-manager instance
        pub fn __um_obj_create() -> *mut dyn $crate::unit::UnitManagerObj {
            let constructor: fn() -> $unit_type = $constructor;
            let obj = constructor();
            let boxed: Box<dyn $crate::unit::UnitManagerObj> = Box::new(obj);
            Box::into_raw(boxed)
        }
    };
}
