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

//! ScopeUnit tracks externally created processes handed over by a client
//! ScopeUnit is the entrance of the sub unit, it implements the traits SubUnit and UnitMngUtil.
use super::comm::ScopeUnitComm;
use super::mng::{ScopeMng, ScopeState};
use core::error::*;
use core::unit::{SubUnit, UmIf, UnitActiveState, UnitBase, UnitMngUtil, UnitWriteFlags};
use nix::sys::wait::WaitStatus;
use nix::unistd::Pid;
use std::str::FromStr;
use std::{path::PathBuf, rc::Rc};

struct Scope {
    comm: Rc<ScopeUnitComm>,
    mng: Rc<ScopeMng>,
}

impl Scope {
    fn new(_um_if: Rc<dyn UmIf>) -> Scope {
        let _comm = Rc::new(ScopeUnitComm::new());
        Scope {
            comm: Rc::clone(&_comm),
            mng: Rc::new(ScopeMng::new(&_comm)),
        }
    }
}

impl SubUnit for Scope {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn load(&self, _conf: Vec<PathBuf>) -> Result<()> {
        let u = match self.comm.owner() {
            None => return Err(Error::Internal),
            Some(u) => u,
        };

        /* there is no on-disk configuration for scopes, a client hands the
         * processes over at creation time */
        if !u.transient() {
            return Err(Error::LoadError {
                msg: format!("scope unit {} can only be created transiently", u.id()),
            });
        }
        Ok(())
    }

    fn current_active_state(&self) -> UnitActiveState {
        self.mng.to_unit_state()
    }

    fn get_subunit_state(&self) -> String {
        self.mng.get_state()
    }

    fn attach_unit(&self, unit: Rc<dyn UnitBase>) {
        self.comm.attach_unit(Rc::clone(&unit));
    }

    fn init(&self) {}

    fn done(&self) {}

    fn dump(&self) {
        log::info!(
            "scope {}: state {}, pids {:?}",
            self.comm.owner_id(),
            self.mng.get_state(),
            self.mng.pids()
        );
    }

    fn start(&self) -> Result<()> {
        self.mng.start_check()?;

        log::info!("Starting {}", self.comm.owner_id());
        self.mng.start_action(true)
    }

    fn stop(&self, force: bool) -> Result<()> {
        if !force {
            self.mng.stop_check()?;
        }

        self.mng.stop_action(true);
        Ok(())
    }

    fn sigchld_events(&self, wait_status: WaitStatus) {
        self.mng.sigchld_event(wait_status)
    }

    fn reset_failed(&self) {
        if self.mng.state() == ScopeState::Failed {
            self.mng.set_state(ScopeState::Dead, false);
        }
    }

    fn serialize(&self) -> Vec<(String, String)> {
        let pids = self
            .mng
            .pids()
            .iter()
            .map(|p| p.as_raw().to_string())
            .collect::<Vec<_>>()
            .join(" ");
        vec![
            ("scope-state".to_string(), self.mng.get_state()),
            ("scope-pids".to_string(), pids),
        ]
    }

    fn deserialize_item(&self, key: &str, value: &str) -> Result<()> {
        match key {
            "scope-state" => {
                let state = ScopeState::from_str(value)?;
                self.mng.set_state(state, false);
            }
            "scope-pids" => {
                for token in value.split_whitespace() {
                    let pid = token.parse::<i32>()?;
                    self.mng.add_pid(Pid::from_raw(pid));
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn coldplug(&self) {
        self.mng.coldplug();
    }

    fn catchup(&self) {
        self.mng.catchup();
    }

    fn may_gc(&self) -> bool {
        self.mng.may_gc()
    }

    /* The payload was placed in the scope from outside, once its processes
     * are gone there is nothing the manager could start again. */
    fn once_only(&self) -> bool {
        true
    }

    fn can_delegate(&self) -> bool {
        true
    }

    fn gc_jobs(&self) -> bool {
        true
    }

    fn unit_set_property(&self, key: &str, value: &str, _flags: UnitWriteFlags) -> Result<()> {
        match key {
            "PIDs" => {
                for token in value.split_whitespace() {
                    let pid = token.parse::<i32>().map_err(|_| Error::InvalidData)?;
                    if pid <= 0 {
                        return Err(Error::InvalidData);
                    }
                    self.mng.add_pid(Pid::from_raw(pid));
                }
                Ok(())
            }
            str_key => Err(Error::NotFound {
                what: format!("set scope property:{}", str_key),
            }),
        }
    }

    fn abandon(&self) -> Result<()> {
        self.mng.abandon()
    }

    fn release_resources(&self) {}
}

impl UnitMngUtil for Scope {
    fn attach_um(&self, um: Rc<dyn UmIf>) {
        self.comm.attach_um(um);
    }
}

use core::declare_unitobj_plugin_with_param;
declare_unitobj_plugin_with_param!(Scope, Scope::new);

#[cfg(test)]
mod tests {
    use super::*;

    struct UmIfD;
    impl UmIf for UmIfD {}

    #[test]
    fn test_scope_type_flags() {
        let scope = Scope::new(Rc::new(UmIfD));

        // a scope never gets a second start cycle and hands its subtree
        // to the payload, queued jobs die with it
        assert!(scope.once_only());
        assert!(scope.can_delegate());
        assert!(scope.gc_jobs());
        assert!(!scope.can_reload());
    }
}
