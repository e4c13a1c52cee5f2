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

use crate::error::Error;
use bitflags::bitflags;
use std::str::FromStr;

/**Unit stats：
 ```graph LR
 A[UnitActive]
 B[UnitReloading]
 C[UnitInActive]
 D[UnitFailed]
 E[UnitActivating]
 F[UnitDeActivating]
 G[UnitMaintenance]
 ```
 ```graph LR
C[UnitInActive] -> E[UnitActivating]
E->A[UnitActive]
B[UnitReloading] -> E
E->F[UnitDeActivating]
E->D[UnitFailed]
```
*/
#[derive(Eq, PartialEq, Clone, Copy, Debug)]
pub enum UnitActiveState {
    /// unit is activated
    Active,
    /// unit is in reloading
    Reloading,
    /// unit is not active
    InActive,
    /// unit action is failed
    Failed,
    /// unit is in starting
    Activating,
    /// unit is in stopping
    DeActivating,
    /// unit is in maintenance
    Maintenance,
}

impl UnitActiveState {
    ///
    pub fn is_active_or_reloading(&self) -> bool {
        matches!(self, UnitActiveState::Active | UnitActiveState::Reloading)
    }

    ///
    pub fn is_inactive_or_failed(&self) -> bool {
        matches!(self, UnitActiveState::InActive | UnitActiveState::Failed)
    }

    ///
    pub fn is_active_or_activating(&self) -> bool {
        matches!(
            self,
            UnitActiveState::Active | UnitActiveState::Activating | UnitActiveState::Reloading
        )
    }

    ///
    pub fn is_inactive_or_deactivating(&self) -> bool {
        matches!(
            self,
            UnitActiveState::InActive | UnitActiveState::Failed | UnitActiveState::DeActivating
        )
    }
}

impl std::fmt::Display for UnitActiveState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnitActiveState::Active => write!(f, "active"),
            UnitActiveState::Reloading => write!(f, "reloading"),
            UnitActiveState::InActive => write!(f, "inactive"),
            UnitActiveState::Failed => write!(f, "failed"),
            UnitActiveState::Activating => write!(f, "activating"),
            UnitActiveState::DeActivating => write!(f, "deactivating"),
            UnitActiveState::Maintenance => write!(f, "maintenance"),
        }
    }
}

impl FromStr for UnitActiveState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(UnitActiveState::Active),
            "reloading" => Ok(UnitActiveState::Reloading),
            "inactive" => Ok(UnitActiveState::InActive),
            "failed" => Ok(UnitActiveState::Failed),
            "activating" => Ok(UnitActiveState::Activating),
            "deactivating" => Ok(UnitActiveState::DeActivating),
            "maintenance" => Ok(UnitActiveState::Maintenance),
            _ => Err(Error::InvalidData),
        }
    }
}

/// how the unit configuration was taken in
#[derive(Eq, PartialEq, Clone, Copy, Debug)]
pub enum UnitLoadState {
    /// allocated, not processed by the loader yet
    Stub,
    /// fragment and drop-ins parsed successfully
    Loaded,
    /// no fragment found on any lookup path
    NotFound,
    /// loading failed for an io kind of reason, load_error holds it
    Error,
    /// the fragment exists but could not be parsed
    BadSetting,
    /// the unit was merged into another one as an alias
    Merged,
    /// the fragment is a symlink to /dev/null
    Masked,
}

impl UnitLoadState {
    /// the loader is still to run for this unit
    pub fn is_stub(&self) -> bool {
        matches!(self, UnitLoadState::Stub)
    }

    /// a unit in one of these states keeps its parsed configuration
    pub fn is_loaded_or_masked(&self) -> bool {
        matches!(self, UnitLoadState::Loaded | UnitLoadState::Masked)
    }
}

impl std::fmt::Display for UnitLoadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnitLoadState::Stub => write!(f, "stub"),
            UnitLoadState::Loaded => write!(f, "loaded"),
            UnitLoadState::NotFound => write!(f, "not-found"),
            UnitLoadState::Error => write!(f, "error"),
            UnitLoadState::BadSetting => write!(f, "bad-setting"),
            UnitLoadState::Merged => write!(f, "merged"),
            UnitLoadState::Masked => write!(f, "masked"),
        }
    }
}

impl FromStr for UnitLoadState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stub" => Ok(UnitLoadState::Stub),
            "loaded" => Ok(UnitLoadState::Loaded),
            "not-found" => Ok(UnitLoadState::NotFound),
            "error" => Ok(UnitLoadState::Error),
            "bad-setting" => Ok(UnitLoadState::BadSetting),
            "merged" => Ok(UnitLoadState::Merged),
            "masked" => Ok(UnitLoadState::Masked),
            _ => Err(Error::InvalidData),
        }
    }
}

bitflags! {
    /// notify unit state to manager
    pub struct UnitNotifyFlags: u8 {
        /// the default flags propagate to jobs, it means nothing.
        const EMPTY = 0;
        /// notify that the unit running reload failure
        const RELOAD_FAILURE = 1 << 0;
        /// notify that the unit is in auto restart state
        const WILL_AUTO_RESTART = 1 << 1;
        /// notify that the unit skipped startup because a condition did not hold
        const SKIP_CONDITION = 1 << 2;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_state_predicates() {
        assert!(UnitActiveState::Reloading.is_active_or_reloading());
        assert!(UnitActiveState::Reloading.is_active_or_activating());
        assert!(!UnitActiveState::Reloading.is_inactive_or_failed());
        assert!(UnitActiveState::Failed.is_inactive_or_failed());
        assert!(UnitActiveState::Failed.is_inactive_or_deactivating());
        assert!(UnitActiveState::DeActivating.is_inactive_or_deactivating());
        assert!(!UnitActiveState::DeActivating.is_inactive_or_failed());
    }

    #[test]
    fn test_state_string_round_trip() {
        for state in [
            UnitActiveState::Active,
            UnitActiveState::Reloading,
            UnitActiveState::InActive,
            UnitActiveState::Failed,
            UnitActiveState::Activating,
            UnitActiveState::DeActivating,
            UnitActiveState::Maintenance,
        ] {
            assert_eq!(state.to_string().parse::<UnitActiveState>().unwrap(), state);
        }
        assert!("bogus".parse::<UnitActiveState>().is_err());

        for state in [
            UnitLoadState::Stub,
            UnitLoadState::Loaded,
            UnitLoadState::NotFound,
            UnitLoadState::Error,
            UnitLoadState::BadSetting,
            UnitLoadState::Merged,
            UnitLoadState::Masked,
        ] {
            assert_eq!(state.to_string().parse::<UnitLoadState>().unwrap(), state);
        }
    }
}
