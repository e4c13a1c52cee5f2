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

use basic::condition::{Condition, ConditionType};
use std::cell::{Cell, RefCell};

pub(super) mod condition_keys {
    /* Attention: sort the following options by dictionary order. */
    pub(crate) const CONDITION_AC_POWER: &str = "ConditionACPower";
    pub(crate) const CONDITION_DIRECTORY_NOT_EMPTY: &str = "ConditionDirectoryNotEmpty";
    pub(crate) const CONDITION_FILE_IS_EXECUTABLE: &str = "ConditionFileIsExecutable";
    pub(crate) const CONDITION_FILE_NOT_EMPTY: &str = "ConditionFileNotEmpty";
    pub(crate) const CONDITION_FIRST_BOOT: &str = "ConditionFirstBoot";
    pub(crate) const CONDITION_PATH_EXISTS: &str = "ConditionPathExists";
    pub(crate) const CONDITION_PATH_EXISTS_GLOB: &str = "ConditionPathExistsGlob";
    pub(crate) const CONDITION_PATH_IS_DIRECTORY: &str = "ConditionPathIsDirectory";
    pub(crate) const CONDITION_USER: &str = "ConditionUser";
}

pub(super) mod assert_keys {
    /* Attention: sort the following options by dictionary order. */
    pub(crate) const ASSERT_FILE_NOT_EMPTY: &str = "AssertFileNotEmpty";
    pub(crate) const ASSERT_PATH_EXISTS: &str = "AssertPathExists";
}

/// Condition=/Assert= checks of one unit, evaluated right before start.
pub(super) struct UeCondition {
    init_flag: Cell<i8>,
    conditions: RefCell<Vec<Condition>>,
    asserts: RefCell<Vec<Condition>>,
}

impl UeCondition {
    pub fn new() -> UeCondition {
        Self {
            init_flag: Cell::new(0),
            conditions: RefCell::new(Vec::new()),
            asserts: RefCell::new(Vec::new()),
        }
    }

    pub(super) fn set_init_flag(&self, flag: i8) {
        self.init_flag.set(flag);
    }

    pub(super) fn init_flag(&self) -> i8 {
        self.init_flag.get()
    }

    pub(super) fn add_condition(&self, condop: &str, params: String) {
        use condition_keys::*;
        let c_type = match condop {
            CONDITION_AC_POWER => ConditionType::ACPower,
            CONDITION_DIRECTORY_NOT_EMPTY => ConditionType::DirectoryNotEmpty,
            CONDITION_FILE_IS_EXECUTABLE => ConditionType::FileIsExecutable,
            CONDITION_FILE_NOT_EMPTY => ConditionType::FileNotEmpty,
            CONDITION_FIRST_BOOT => ConditionType::FirstBoot,
            CONDITION_PATH_EXISTS => ConditionType::PathExists,
            CONDITION_PATH_EXISTS_GLOB => ConditionType::PathExistsGlob,
            CONDITION_PATH_IS_DIRECTORY => ConditionType::PathIsDirectory,
            CONDITION_USER => ConditionType::User,
            _ => return,
        };
        if let Some(condition) = parse_condition(c_type, &params) {
            self.conditions.borrow_mut().push(condition);
        }
    }

    pub(super) fn add_assert(&self, assertop: &str, params: String) {
        use assert_keys::*;
        let c_type = match assertop {
            ASSERT_FILE_NOT_EMPTY => ConditionType::FileNotEmpty,
            ASSERT_PATH_EXISTS => ConditionType::PathExists,
            _ => return,
        };
        if let Some(condition) = parse_condition(c_type, &params) {
            self.asserts.borrow_mut().push(condition);
        }
    }

    pub(super) fn conditions_test(&self) -> bool {
        test_all(&self.conditions.borrow())
    }

    pub(super) fn asserts_test(&self) -> bool {
        test_all(&self.asserts.borrow())
    }
}

/// Split the `|` (trigger) and `!` (negate) prefixes off the value, in
/// that order, and build the condition.
fn parse_condition(c_type: ConditionType, params: &str) -> Option<Condition> {
    if params.is_empty() {
        return None;
    }

    let (trigger, rest) = match params.strip_prefix('|') {
        Some(rest) => (1, rest),
        None => (0, params),
    };
    let (revert, rest) = match rest.strip_prefix('!') {
        Some(rest) => (1, rest),
        None => (0, rest),
    };

    Some(Condition::new(c_type, trigger, revert, rest.to_string()))
}

/// Every plain condition must hold; triggered ones form a disjunction of
/// which at least one must hold.
fn test_all(conditions: &[Condition]) -> bool {
    let mut triggered: Option<bool> = None;
    for cond in conditions {
        let ok = cond.test();
        if cond.trigger() == 0 {
            if !ok {
                return false;
            }
            continue;
        }
        triggered = Some(triggered.unwrap_or(false) || ok);
    }
    triggered.unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::{
        assert_keys::ASSERT_PATH_EXISTS,
        condition_keys::{CONDITION_FIRST_BOOT, CONDITION_PATH_EXISTS},
        parse_condition, UeCondition,
    };
    use basic::condition::ConditionType;

    #[test]
    fn test_condition_prefixes() {
        let c = parse_condition(ConditionType::FileNotEmpty, "|!test").unwrap();
        assert_eq!(c.trigger(), 1);
        assert_eq!(c.revert(), 1);

        let c = parse_condition(ConditionType::FileNotEmpty, "!test").unwrap();
        assert_eq!(c.trigger(), 0);
        assert_eq!(c.revert(), 1);

        let c = parse_condition(ConditionType::FileNotEmpty, "test").unwrap();
        assert_eq!(c.trigger(), 0);
        assert_eq!(c.revert(), 0);

        assert!(parse_condition(ConditionType::FileNotEmpty, "").is_none());
    }

    #[test]
    fn test_add_condition() {
        let uc = UeCondition::new();
        uc.add_condition(CONDITION_PATH_EXISTS, String::from("test"));
        assert_eq!(uc.conditions.borrow().len(), 1);
        uc.add_condition(CONDITION_FIRST_BOOT, String::from("true"));
        assert_eq!(uc.conditions.borrow().len(), 2);
        // unknown keys and empty values are ignored
        uc.add_condition("ConditionNoSuchThing", String::from("x"));
        uc.add_condition(CONDITION_PATH_EXISTS, String::new());
        assert_eq!(uc.conditions.borrow().len(), 2);
    }

    #[test]
    fn test_add_assert() {
        let uc = UeCondition::new();
        uc.add_assert(ASSERT_PATH_EXISTS, String::from("assert"));
        assert_eq!(uc.asserts.borrow().len(), 1);
    }
}
