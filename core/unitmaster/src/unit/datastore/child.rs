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

use super::sets::UnitSets;
use super::UnitX;
use crate::utils::table::{TableOp, TableSubscribe};
use nix::unistd::Pid;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub(super) struct UnitChild {
    // associated objects
    units: Rc<UnitSets>,

    // owned objects
    sub_name: String, // key for table-subscriber: UnitSets
    data: Rc<UnitChildData>,
}

impl UnitChild {
    pub(super) fn new(unitsr: &Rc<UnitSets>) -> UnitChild {
        let uc = UnitChild {
            units: Rc::clone(unitsr),
            sub_name: String::from("UnitChild"),
            data: Rc::new(UnitChildData::new()),
        };
        uc.register();
        uc
    }

    pub(super) fn entry_clear(&self) {
        self.data.entry_clear();
    }

    pub(super) fn add_watch_pid(&self, id: &str, pid: Pid, exclusive: bool) {
        log::debug!("Adding watch_pids {} to {}", pid, id);
        let unit = self.units.get(id).unwrap();
        if self.data.add_watch_pid(Rc::clone(&unit), pid, exclusive) {
            unit.child_add_pids(pid);
        }
    }

    pub(super) fn unwatch_pid(&self, id: &str, pid: Pid) {
        let unit = self.units.get(id).unwrap();
        log::debug!("Removing watch_pids {} from {}", pid, id);
        self.data.unwatch_pid(&unit, pid);
        unit.child_remove_pids(pid);
    }

    pub(super) fn unwatch_all_pids(&self, id: &str) {
        log::debug!("Unwatching all watch_pids of {}", id);
        let unit = self.units.get(id).unwrap();
        let delete_pids = unit.get_pids();
        for pid in delete_pids {
            unit.child_remove_pids(pid);
            self.data.unwatch_pid(&unit, pid);
        }
    }

    pub(super) fn get_unit_by_pid(&self, pid: Pid) -> Option<Rc<UnitX>> {
        self.data.get_unit_by_pid(pid)
    }

    fn register(&self) {
        // db-units
        let subscriber = Rc::clone(&self.data);
        self.units.register(&self.sub_name, subscriber);
    }
}

struct UnitChildData {
    watch_pids: RefCell<HashMap<Pid, Rc<UnitX>>>, // key: pid, value: the owning unit
}

impl TableSubscribe<String, Rc<UnitX>> for UnitChildData {
    fn notify(&self, op: &TableOp<String, Rc<UnitX>>) {
        match op {
            TableOp::TableInsert(_, _) => {} // do nothing
            TableOp::TableRemove(_, unit) => self.remove_unit(unit),
        }
    }
}

// the declaration "pub(self)" is for identification only.
impl UnitChildData {
    pub(self) fn new() -> UnitChildData {
        UnitChildData {
            watch_pids: RefCell::new(HashMap::new()),
        }
    }

    pub(self) fn entry_clear(&self) {
        self.watch_pids.borrow_mut().clear();
    }

    // returns whether the pid is owned by the given unit afterwards
    pub(self) fn add_watch_pid(&self, unit: Rc<UnitX>, pid: Pid, exclusive: bool) -> bool {
        let mut watch_pids = self.watch_pids.borrow_mut();
        if let Some(old) = watch_pids.get(&pid) {
            if Rc::ptr_eq(old, &unit) {
                return true;
            }
            if !exclusive {
                log::debug!("pid {} is already watched by {}, keeping it", pid, old.id());
                return false;
            }
            // the new watcher displaces the old one
            old.child_remove_pids(pid);
        }
        watch_pids.insert(pid, unit);
        true
    }

    pub(self) fn unwatch_pid(&self, unit: &Rc<UnitX>, pid: Pid) {
        let mut watch_pids = self.watch_pids.borrow_mut();
        if let Some(owner) = watch_pids.get(&pid) {
            if !Rc::ptr_eq(owner, unit) {
                // the pid has been taken over, leave the map alone
                return;
            }
        }
        watch_pids.remove(&pid);
    }

    pub(self) fn get_unit_by_pid(&self, pid: Pid) -> Option<Rc<UnitX>> {
        self.watch_pids.borrow().get(&pid).cloned()
    }

    fn remove_unit(&self, unit: &Rc<UnitX>) {
        self.watch_pids
            .borrow_mut()
            .retain(|_, u| !Rc::ptr_eq(u, unit));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::data::DataManager;
    use crate::unit::test::test_utils;

    #[test]
    #[should_panic]
    fn child_add_watch_pid_empty() {
        let sets = UnitSets::new();
        let name_test3 = String::from("test3.target");
        let child = UnitChild::new(&Rc::new(sets));
        let pid = Pid::from_raw(1);

        child.add_watch_pid(&name_test3, pid, false);
    }

    #[test]
    fn child_add_watch_pid() {
        let dm = Rc::new(DataManager::new());
        let sets = UnitSets::new();
        let name_test1 = String::from("test1.target");
        let unit_test1 = create_unit(&dm, &name_test1);
        let name_test2 = String::from("test2.target");
        let unit_test2 = create_unit(&dm, &name_test2);
        sets.insert(name_test1.clone(), Rc::clone(&unit_test1));
        sets.insert(name_test2.clone(), Rc::clone(&unit_test2));
        let child = UnitChild::new(&Rc::new(sets));
        let pid1 = Pid::from_raw(1);
        let pid2 = Pid::from_raw(2);

        assert_eq!(child.data.watch_pids.borrow().len(), 0);

        child.add_watch_pid(&name_test1, pid1, false);
        assert_eq!(child.data.watch_pids.borrow().len(), 1);

        child.add_watch_pid(&name_test2, pid2, false);
        assert_eq!(child.data.watch_pids.borrow().len(), 2);
    }

    #[test]
    fn child_add_watch_pid_exclusive() {
        let dm = Rc::new(DataManager::new());
        let sets = UnitSets::new();
        let name_test1 = String::from("test1.target");
        let unit_test1 = create_unit(&dm, &name_test1);
        let name_test2 = String::from("test2.target");
        let unit_test2 = create_unit(&dm, &name_test2);
        sets.insert(name_test1.clone(), Rc::clone(&unit_test1));
        sets.insert(name_test2.clone(), Rc::clone(&unit_test2));
        let child = UnitChild::new(&Rc::new(sets));
        let pid = Pid::from_raw(7);

        child.add_watch_pid(&name_test1, pid, false);
        assert!(Rc::ptr_eq(
            &child.get_unit_by_pid(pid).unwrap(),
            &unit_test1
        ));

        // without exclusive the first watcher stays
        child.add_watch_pid(&name_test2, pid, false);
        assert!(Rc::ptr_eq(
            &child.get_unit_by_pid(pid).unwrap(),
            &unit_test1
        ));

        // with exclusive the pid changes hands and leaves the old pid set
        child.add_watch_pid(&name_test2, pid, true);
        assert!(Rc::ptr_eq(
            &child.get_unit_by_pid(pid).unwrap(),
            &unit_test2
        ));
        assert!(unit_test1.get_pids().is_empty());
        assert_eq!(unit_test2.get_pids(), vec![pid]);
    }

    #[test]
    fn child_unwatch_pid() {
        let dm = Rc::new(DataManager::new());
        let sets = UnitSets::new();
        let name_test1 = String::from("test1.target");
        let unit_test1 = create_unit(&dm, &name_test1);
        let name_test2 = String::from("test2.target");
        let unit_test2 = create_unit(&dm, &name_test2);
        sets.insert(name_test1.clone(), Rc::clone(&unit_test1));
        sets.insert(name_test2.clone(), Rc::clone(&unit_test2));
        let child = UnitChild::new(&Rc::new(sets));
        let pid1 = Pid::from_raw(1);
        let pid2 = Pid::from_raw(2);

        assert_eq!(child.data.watch_pids.borrow().len(), 0);

        child.add_watch_pid(&name_test1, pid1, false);
        child.add_watch_pid(&name_test2, pid2, false);
        assert_eq!(child.data.watch_pids.borrow().len(), 2);

        child.unwatch_pid(&name_test1, pid1);
        assert_eq!(child.data.watch_pids.borrow().len(), 1);

        child.unwatch_pid(&name_test2, pid2);
        assert_eq!(child.data.watch_pids.borrow().len(), 0);
    }

    fn create_unit(dmr: &Rc<DataManager>, name: &str) -> Rc<UnitX> {
        log::init_log_to_console("create_unit", log::Level::Trace);
        test_utils::create_unit_for_test_pub(dmr, name)
    }
}
