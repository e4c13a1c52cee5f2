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

//! is the core of the target unit
//!
use super::comm::TargetUnitComm;
use core::error::*;
use core::unit::{UnitActiveState, UnitNotifyFlags};
use std::fmt;
use std::str::FromStr;
use std::{cell::RefCell, rc::Rc};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum TargetState {
    Dead,
    Active,
    StateMax,
}

impl TargetState {
    fn to_unit_state(self) -> UnitActiveState {
        match self {
            TargetState::Dead | TargetState::StateMax => UnitActiveState::InActive,
            TargetState::Active => UnitActiveState::Active,
        }
    }
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TargetState::Dead | TargetState::StateMax => "dead",
            TargetState::Active => "active",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for TargetState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dead" => Ok(TargetState::Dead),
            "active" => Ok(TargetState::Active),
            _ => Err(Error::InvalidData),
        }
    }
}

pub(super) struct TargetMng {
    comm: Rc<TargetUnitComm>,
    state: RefCell<TargetState>,
}

impl TargetMng {
    pub(super) fn new(_comm: &Rc<TargetUnitComm>) -> Self {
        TargetMng {
            comm: Rc::clone(_comm),
            state: RefCell::new(TargetState::StateMax),
        }
    }

    pub(super) fn start_check(&self) -> Result<()> {
        if self.state() == TargetState::Active {
            return Err(Error::UnitActionEAgain);
        }
        Ok(())
    }

    pub(super) fn start_action(&self, notify: bool) {
        self.set_state(TargetState::Active, notify);
    }

    pub(super) fn stop_check(&self) -> Result<()> {
        if self.state() == TargetState::Dead {
            return Err(Error::UnitActionEAgain);
        }
        Ok(())
    }

    pub(super) fn stop_action(&self, notify: bool) {
        self.set_state(TargetState::Dead, notify);
    }

    pub(super) fn get_state(&self) -> String {
        let state = *self.state.borrow();
        state.to_string()
    }

    pub(super) fn set_state(&self, new_state: TargetState, notify: bool) {
        let old_state = self.state();
        self.state.replace(new_state);

        if notify {
            self.state_notify(new_state, old_state);
        }
    }

    fn state_notify(&self, new_state: TargetState, old_state: TargetState) {
        if let Some(unit) = self.comm.owner() {
            if new_state != old_state {
                log::debug!(
                    "{} original state[{:?}] ->new state[{:?}]",
                    unit.id(),
                    old_state,
                    new_state,
                );
            }
            let old_unit_state = old_state.to_unit_state();
            let new_unit_state = new_state.to_unit_state();
            unit.notify(old_unit_state, new_unit_state, UnitNotifyFlags::EMPTY);
        }
    }

    pub(super) fn state(&self) -> TargetState {
        *self.state.borrow()
    }

    pub(super) fn to_unit_state(&self) -> UnitActiveState {
        self.state().to_unit_state()
    }
}

#[cfg(test)]
mod tests {
    use super::TargetMng;
    use super::TargetState;
    use super::TargetUnitComm;
    use std::rc::Rc;

    #[test]
    fn test_target_set_state() {
        let _comm = Rc::new(TargetUnitComm::new());
        let tm = TargetMng::new(&_comm);
        tm.set_state(TargetState::Active, false);
        assert_eq!(tm.state(), TargetState::Active)
    }

    #[test]
    fn test_target_stop_action() {
        let comm = Rc::new(TargetUnitComm::new());
        let tm = TargetMng::new(&comm);
        tm.stop_action(false);
        assert_eq!(tm.state(), TargetState::Dead)
    }

    #[test]
    fn test_target_start_action() {
        let comm = Rc::new(TargetUnitComm::new());
        let tm = TargetMng::new(&comm);
        tm.start_action(false);
        assert_eq!(tm.state(), TargetState::Active)
    }

    #[test]
    fn test_target_state_round_trip() {
        use std::str::FromStr;
        assert_eq!(
            TargetState::from_str(&TargetState::Active.to_string()).unwrap(),
            TargetState::Active
        );
        assert_eq!(
            TargetState::from_str(&TargetState::Dead.to_string()).unwrap(),
            TargetState::Dead
        );
        assert!(TargetState::from_str("bogus").is_err());
    }
}
