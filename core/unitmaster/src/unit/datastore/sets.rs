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

use super::super::entry::UnitX;
use crate::utils::table::{Table, TableSubscribe};
use std::rc::Rc;

pub(super) struct UnitSets {
    t: Table<String, Rc<UnitX>>,
}

impl UnitSets {
    pub(super) fn new() -> UnitSets {
        UnitSets { t: Table::new() }
    }

    pub(super) fn insert(&self, name: String, unit: Rc<UnitX>) -> Option<Rc<UnitX>> {
        self.t.insert(name, unit)
    }

    pub(super) fn remove(&self, name: &str) -> Option<Rc<UnitX>> {
        self.t.remove(&name.to_string())
    }

    pub(super) fn get(&self, name: &str) -> Option<Rc<UnitX>> {
        self.t.get(&name.to_string())
    }

    pub(super) fn get_all(&self) -> Vec<Rc<UnitX>> {
        self.t.values()
    }

    pub(super) fn register(
        &self,
        sub_name: &str,
        subscriber: Rc<dyn TableSubscribe<String, Rc<UnitX>>>,
    ) -> Option<Rc<dyn TableSubscribe<String, Rc<UnitX>>>> {
        self.t.subscribe(sub_name.to_string(), subscriber)
    }

    pub(super) fn entry_clear(&self) {
        self.t.data_clear();
    }

    pub(super) fn clear(&self) {
        self.t.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::data::DataManager;
    use crate::unit::test::test_utils;

    #[test]
    fn sets_insert() {
        let dm = Rc::new(DataManager::new());
        let sets = UnitSets::new();
        let name_test1 = String::from("test1.target");
        let unit_test1 = create_unit(&dm, &name_test1);
        let name_test2 = String::from("test2.target");
        let unit_test2 = create_unit(&dm, &name_test2);

        let old = sets.insert(name_test1.clone(), Rc::clone(&unit_test1));
        assert!(old.is_none());

        let old = sets.insert(name_test1, Rc::clone(&unit_test2));
        assert!(Rc::ptr_eq(&old.unwrap(), &unit_test1));

        let old = sets.insert(name_test2, Rc::clone(&unit_test2));
        assert!(old.is_none());
    }

    #[test]
    fn sets_remove() {
        let dm = Rc::new(DataManager::new());
        let sets = UnitSets::new();
        let name_test1 = String::from("test1.target");
        let unit_test1 = create_unit(&dm, &name_test1);
        let name_test2 = String::from("test2.target");
        let unit_test2 = create_unit(&dm, &name_test2);
        let name_test3 = String::from("test3.target");

        let old = sets.remove(&name_test1);
        assert!(old.is_none());

        sets.insert(name_test1.clone(), Rc::clone(&unit_test1));
        let old = sets.remove(&name_test1);
        assert!(Rc::ptr_eq(&old.unwrap(), &unit_test1));

        sets.insert(name_test1, Rc::clone(&unit_test1));
        sets.insert(name_test2.clone(), Rc::clone(&unit_test2));
        let old = sets.remove(&name_test3);
        assert!(old.is_none());
        let old = sets.remove(&name_test2);
        assert!(Rc::ptr_eq(&old.unwrap(), &unit_test2));
    }

    #[test]
    fn sets_get() {
        let dm = Rc::new(DataManager::new());
        let sets = UnitSets::new();
        let name_test1 = String::from("test1.target");
        let unit_test1 = create_unit(&dm, &name_test1);
        let name_test2 = String::from("test2.target");
        let unit_test2 = create_unit(&dm, &name_test2);

        let value = sets.get(&name_test1);
        assert!(value.is_none());

        sets.insert(name_test1.clone(), Rc::clone(&unit_test1));
        let value = sets.get(&name_test1);
        assert!(Rc::ptr_eq(&value.unwrap(), &unit_test1));
        let value = sets.get(&name_test2);
        assert!(value.is_none());

        sets.insert(name_test2.clone(), Rc::clone(&unit_test2));
        let value = sets.get(&name_test2);
        assert!(Rc::ptr_eq(&value.unwrap(), &unit_test2));
    }

    #[test]
    fn sets_getall() {
        let dm = Rc::new(DataManager::new());
        let sets = UnitSets::new();
        let name_test1 = String::from("test1.target");
        let unit_test1 = create_unit(&dm, &name_test1);
        let name_test2 = String::from("test2.target");
        let unit_test2 = create_unit(&dm, &name_test2);

        let units = sets.get_all();
        assert_eq!(units.len(), 0);

        sets.insert(name_test1.clone(), Rc::clone(&unit_test1));
        let units = sets.get_all();
        assert_eq!(units.len(), 1);
        assert!(contain_unit(&units, &unit_test1));
        sets.remove(&name_test1);
        let units = sets.get_all();
        assert_eq!(units.len(), 0);

        sets.insert(name_test1, Rc::clone(&unit_test1));
        sets.insert(name_test2, Rc::clone(&unit_test2));
        let units = sets.get_all();
        assert_eq!(units.len(), 2);
        assert!(contain_unit(&units, &unit_test1));
        assert!(contain_unit(&units, &unit_test2));
    }

    fn create_unit(dmr: &Rc<DataManager>, name: &str) -> Rc<UnitX> {
        log::init_log_to_console("create_unit", log::Level::Trace);
        test_utils::create_unit_for_test_pub(dmr, name)
    }

    fn contain_unit(units: &[Rc<UnitX>], unit: &Rc<UnitX>) -> bool {
        for u in units.iter() {
            if Rc::ptr_eq(u, unit) {
                return true;
            }
        }

        false
    }
}
