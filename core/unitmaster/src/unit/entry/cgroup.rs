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

use super::base::UeBase;
use core::error::*;
use nix::NixPath;
use std::rc::Rc;
use std::{cell::RefCell, path::PathBuf};

pub(super) struct UeCgroup {
    data: RefCell<UnitCgroupData>,
}

impl UeCgroup {
    pub(super) fn new(baser: &Rc<UeBase>) -> UeCgroup {
        UeCgroup {
            data: RefCell::new(UnitCgroupData::new(baser)),
        }
    }

    pub(super) fn setup_cg_path(&self) {
        self.data.borrow_mut().setup_cg_path();
    }

    pub(super) fn set_cg_path(&self, cg_path: PathBuf) {
        self.data.borrow_mut().cg_path = cg_path;
    }

    pub(super) fn prepare_cg_exec(&self) -> Result<()> {
        self.data.borrow_mut().prepare_cg_exec()
    }

    pub(super) fn cg_path(&self) -> PathBuf {
        let cg_path = self.data.borrow().cg_path();

        cg_path
    }

    pub(super) fn cg_realized(&self) -> bool {
        self.data.borrow().realized
    }

    pub(super) fn set_cg_realized(&self, realized: bool) {
        self.data.borrow_mut().realized = realized;
    }
}

struct UnitCgroupData {
    // associated objects
    base: Rc<UeBase>,

    // owned objects
    cg_path: PathBuf,
    realized: bool,
}

impl UnitCgroupData {
    pub(self) fn new(baser: &Rc<UeBase>) -> UnitCgroupData {
        UnitCgroupData {
            base: Rc::clone(baser),
            cg_path: PathBuf::from(""),
            realized: false,
        }
    }

    pub(self) fn setup_cg_path(&mut self) {
        if !self.cg_path.is_empty() {
            return;
        }

        self.set_default_cg_path();
    }

    fn set_default_cg_path(&mut self) {
        let cg_tree_name = PathBuf::from(cgroup::cg_escape(&self.base.id()));

        self.cg_path = cg_tree_name;
    }

    pub(self) fn prepare_cg_exec(&mut self) -> Result<()> {
        log::debug!("cgroup: prepare cg exec");
        cgroup::cg_create(&self.cg_path).context(CgroupSnafu)?;
        self.realized = true;

        Ok(())
    }

    pub(self) fn cg_path(&self) -> PathBuf {
        self.cg_path.clone()
    }
}
