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

use nix::unistd::Pid;
use std::cell::RefCell;
use std::collections::HashSet;

pub(super) struct UeChild {
    data: RefCell<UeChildData>,
}

impl UeChild {
    pub(super) fn new() -> UeChild {
        UeChild {
            data: RefCell::new(UeChildData::new()),
        }
    }

    pub(super) fn get_pids(&self) -> Vec<Pid> {
        return self.data.borrow().get_pids();
    }

    pub(super) fn add_pids(&self, pid: Pid) {
        self.data.borrow_mut().add_pids(pid);
    }

    pub(super) fn remove_pids(&self, pid: Pid) {
        self.data.borrow_mut().remove_pids(pid);
    }

    /* The generation stamps guard against handing the same event to a unit
     * twice within one dispatcher iteration. */
    pub(super) fn sigchldgen(&self) -> u64 {
        self.data.borrow().sigchldgen
    }

    pub(super) fn set_sigchldgen(&self, gen: u64) {
        self.data.borrow_mut().sigchldgen = gen;
    }

    pub(super) fn notifygen(&self) -> u64 {
        self.data.borrow().notifygen
    }

    pub(super) fn set_notifygen(&self, gen: u64) {
        self.data.borrow_mut().notifygen = gen;
    }
}

struct UeChildData {
    // owned objects
    pids: HashSet<Pid>,
    sigchldgen: u64,
    notifygen: u64,
}

// the declaration "pub(self)" is for identification only.
impl UeChildData {
    pub(self) fn new() -> UeChildData {
        UeChildData {
            pids: HashSet::new(),
            sigchldgen: 0,
            notifygen: 0,
        }
    }

    pub(self) fn get_pids(&self) -> Vec<Pid> {
        let mut res = Vec::new();
        for pid in self.pids.iter() {
            res.push(*pid);
        }
        res
    }

    pub(self) fn add_pids(&mut self, pid: Pid) {
        self.pids.insert(pid);
    }

    pub(self) fn remove_pids(&mut self, pid: Pid) {
        self.pids.remove(&pid);
    }
}
