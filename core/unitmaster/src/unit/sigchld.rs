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

use super::datastore::UnitDb;
use event::{EventState, EventType, Events, Source};
use nix::errno::Errno;
use nix::sys::signal::Signal;
use nix::sys::wait::{self, Id, WaitPidFlag, WaitStatus};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Deferred reaping of exited children, routed to the owning unit.
pub(super) struct Sigchld {
    // associated objects
    event: Rc<Events>,

    // owned objects
    reaper: Rc<ChildReaper>,
}

impl Sigchld {
    pub(super) fn new(eventr: &Rc<Events>, dbr: &Rc<UnitDb>) -> Sigchld {
        let reaper = Rc::new(ChildReaper {
            event: Rc::clone(eventr),
            db: Rc::clone(dbr),
            me: RefCell::new(Weak::new()),
        });
        reaper.me.replace(Rc::downgrade(&reaper));
        eventr.add_source(reaper.clone()).unwrap();
        Sigchld {
            event: Rc::clone(eventr),
            reaper,
        }
    }

    pub(super) fn enable(&self, enable: bool) -> i32 {
        let state = if enable {
            EventState::On
        } else {
            EventState::Off
        };
        self.event
            .set_enabled(self.reaper.clone(), state)
            .unwrap_or(-1)
    }
}

struct ChildReaper {
    // associated objects
    event: Rc<Events>,
    db: Rc<UnitDb>,

    // self-reference, the dispatcher must be able to switch itself off
    me: RefCell<Weak<ChildReaper>>,
}

impl Source for ChildReaper {
    fn event_type(&self) -> EventType {
        EventType::Defer
    }

    fn epoll_event(&self) -> u32 {
        0
    }

    fn token(&self) -> u64 {
        let data: u64 = unsafe { std::mem::transmute(self) };
        data
    }

    fn priority(&self) -> i8 {
        -7
    }

    fn dispatch(&self, _event: &Events) -> i32 {
        if !self.reap_one() {
            self.turn_off();
        }
        0
    }
}

impl ChildReaper {
    /// Handle one exited child. Returns false when there is nothing left
    /// to wait for and the source should be switched off.
    fn reap_one(&self) -> bool {
        log::debug!("Dispatching sighandler waiting for pid");

        // peek without consuming, the status must survive until the unit
        // has seen it
        let flags = WaitPidFlag::WEXITED | WaitPidFlag::WNOHANG | WaitPidFlag::WNOWAIT;
        let wait_status = match wait::waitid(Id::All, flags) {
            Ok(status) => status,
            Err(err) => {
                if err != Errno::ECHILD {
                    log::error!("Error while waiting pid: {}", err);
                }
                return false;
            }
        };

        let (pid, code, signal) = match wait_status {
            WaitStatus::Exited(pid, code) => (pid, code, Signal::SIGCHLD),
            WaitStatus::Signaled(pid, signal, _dc) => (pid, -1, signal),
            WaitStatus::StillAlive => return false, // nothing pending
            other => {
                // stopped/continued and the like, keep listening
                log::debug!("Ignored child signal: {:?}", other);
                return true;
            }
        };

        log::debug!(
            "Process {} exited witch code: {}, signal: {:?}",
            pid.as_raw(),
            code,
            signal
        );
        if pid.as_raw() <= 0 {
            log::debug!("invalid pid in signal: {:?}", pid);
            return false;
        }

        // record + action
        match self.db.get_unit_by_pid(pid) {
            Some(unit) => {
                unit.sigchld_events(wait_status);
                self.db.child_unwatch_pid(&unit.id(), pid);
            }
            None => log::debug!("not found unit obj of pid: {:?}", pid),
        }

        // pop: reap the zombie
        match wait::waitid(Id::Pid(pid), WaitPidFlag::WEXITED) {
            Err(e) => log::error!("Failed to reap process {}: {}", pid.as_raw(), e),
            Ok(_) => log::debug!("Reaped process {}", pid.as_raw()),
        }

        true
    }

    fn turn_off(&self) {
        if let Some(me) = self.me.borrow().upgrade() {
            if self.event.set_enabled(me, EventState::Off).is_err() {
                log::error!("Failed to disable the child reaper source.");
            }
        }
    }
}
