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
use std::{convert::TryFrom, num::ParseIntError, str::FromStr};

#[allow(missing_docs)]
#[derive(Hash, PartialEq, Eq, Copy, Clone, Debug)]
pub enum UnitRelations {
    UnitRequires,
    UnitRequisite,
    UnitWants,
    UnitBindsTo,
    UnitPartOf,

    UnitRequiredBy,
    UnitRequisiteOf,
    UnitWantedBy,
    UnitBoundBy,
    UnitConsistsOf,

    UnitConflicts,
    UnitConflictedBy,

    UnitBefore,
    UnitAfter,

    UnitOnSuccess,
    UnitOnSuccessOf,
    UnitOnFailure,
    UnitOnFailureOf,

    UnitTriggers,
    UnitTriggeredBy,

    UnitPropagatesReloadTo,
    UnitReloadPropagatedFrom,

    UnitJoinsNamespaceOf,

    UnitReferences,
    UnitReferencedBy,

    UnitInSlice,
    UnitSliceOf,
}

impl std::fmt::Display for UnitRelations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UnitRelations::UnitRequires => "Requires",
            UnitRelations::UnitRequisite => "Requisite",
            UnitRelations::UnitWants => "Wants",
            UnitRelations::UnitBindsTo => "BindsTo",
            UnitRelations::UnitPartOf => "PartOf",
            UnitRelations::UnitRequiredBy => "RequiredBy",
            UnitRelations::UnitRequisiteOf => "RequisiteOf",
            UnitRelations::UnitWantedBy => "WantedBy",
            UnitRelations::UnitBoundBy => "BoundBy",
            UnitRelations::UnitConsistsOf => "ConsistsOf",
            UnitRelations::UnitConflicts => "Conflicts",
            UnitRelations::UnitConflictedBy => "ConflictedBy",
            UnitRelations::UnitBefore => "Before",
            UnitRelations::UnitAfter => "After",
            UnitRelations::UnitOnSuccess => "OnSuccess",
            UnitRelations::UnitOnSuccessOf => "OnSuccessOf",
            UnitRelations::UnitOnFailure => "OnFailure",
            UnitRelations::UnitOnFailureOf => "OnFailureOf",
            UnitRelations::UnitTriggers => "Triggers",
            UnitRelations::UnitTriggeredBy => "TriggeredBy",
            UnitRelations::UnitPropagatesReloadTo => "PropagatesReloadTo",
            UnitRelations::UnitReloadPropagatedFrom => "ReloadPropagatedFrom",
            UnitRelations::UnitJoinsNamespaceOf => "JoinsNamespaceOf",
            UnitRelations::UnitReferences => "References",
            UnitRelations::UnitReferencedBy => "ReferencedBy",
            UnitRelations::UnitInSlice => "InSlice",
            UnitRelations::UnitSliceOf => "SliceOf",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for UnitRelations {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let r = match s {
            "Requires" => UnitRelations::UnitRequires,
            "Requisite" => UnitRelations::UnitRequisite,
            "Wants" => UnitRelations::UnitWants,
            "BindsTo" => UnitRelations::UnitBindsTo,
            "PartOf" => UnitRelations::UnitPartOf,
            "RequiredBy" => UnitRelations::UnitRequiredBy,
            "RequisiteOf" => UnitRelations::UnitRequisiteOf,
            "WantedBy" => UnitRelations::UnitWantedBy,
            "BoundBy" => UnitRelations::UnitBoundBy,
            "ConsistsOf" => UnitRelations::UnitConsistsOf,
            "Conflicts" => UnitRelations::UnitConflicts,
            "ConflictedBy" => UnitRelations::UnitConflictedBy,
            "Before" => UnitRelations::UnitBefore,
            "After" => UnitRelations::UnitAfter,
            "OnSuccess" => UnitRelations::UnitOnSuccess,
            "OnSuccessOf" => UnitRelations::UnitOnSuccessOf,
            "OnFailure" => UnitRelations::UnitOnFailure,
            "OnFailureOf" => UnitRelations::UnitOnFailureOf,
            "Triggers" => UnitRelations::UnitTriggers,
            "TriggeredBy" => UnitRelations::UnitTriggeredBy,
            "PropagatesReloadTo" => UnitRelations::UnitPropagatesReloadTo,
            "ReloadPropagatedFrom" => UnitRelations::UnitReloadPropagatedFrom,
            "JoinsNamespaceOf" => UnitRelations::UnitJoinsNamespaceOf,
            "References" => UnitRelations::UnitReferences,
            "ReferencedBy" => UnitRelations::UnitReferencedBy,
            "InSlice" => UnitRelations::UnitInSlice,
            "SliceOf" => UnitRelations::UnitSliceOf,
            _ => return Err(Error::InvalidData),
        };
        Ok(r)
    }
}

#[allow(missing_docs)]
#[derive(Eq, PartialEq, Clone, Copy, Debug)]
#[repr(u64)]
pub enum UnitRelationAtom {
    UnitAtomPullInStart = 1u64 << 0,
    UnitAtomPullInStartIgnored = 1u64 << 1,
    UnitAtomPullInVerify = 1u64 << 2,
    UnitAtomPullInStop = 1u64 << 3,
    UnitAtomPullInStopIgnored = 1u64 << 4,
    UnitAtomAddStopWhenUnneededQueue = 1u64 << 5,
    UnitAtomPinsStopWhenUnneeded = 1u64 << 6,
    UnitAtomCannotBeActiveWithout = 1u64 << 7,
    UnitAtomAddCannotBeActiveWithoutQueue = 1u64 << 8,
    UnitAtomRetroActiveStartReplace = 1u64 << 9,
    UnitAtomRetroActiveStartFail = 1u64 << 10,
    UnitAtomRetroActiveStopOnStart = 1u64 << 11,
    UnitAtomRetroActiveStopOnStop = 1u64 << 12,
    UnitAtomPropagateStartFailure = 1u64 << 13,
    UnitAtomPropagateStopFailure = 1u64 << 14,
    UnitAtomPropagateInactiveStartAsFailure = 1u64 << 15,
    UnitAtomPropagateStop = 1u64 << 16,
    UnitAtomPropagateRestart = 1u64 << 17,
    UnitAtomAddDefaultTargetDependencyQueue = 1u64 << 18,
    UnitAtomDefaultTargetDependencies = 1u64 << 19,
    UnitAtomBefore = 1u64 << 20,
    UnitAtomAfter = 1u64 << 21,
    UnitAtomOnSuccess = 1u64 << 22,
    UnitAtomOnFailure = 1u64 << 23,
    UnitAtomTriggers = 1u64 << 24,
    UnitAtomTriggeredBy = 1u64 << 25,
    UnitAtomPropagatesReloadTo = 1u64 << 26,
    UnitAtomJoinsNamespaceOf = 1u64 << 27,
    UnitAtomReferences = 1u64 << 28,
    UnitAtomReferencedBy = 1u64 << 29,
    UnitAtomInSlice = 1u64 << 30,
    UnitAtomSliceOf = 1u64 << 31,
}

bitflags! {
    /// why an edge of the dependency graph exists; an edge carries one mask
    /// for the origin side and one for the destination side, and is dropped
    /// only when both run empty
    pub struct UnitDependencyMask: u32 {
        /// configured in the unit file of the origin
        const FILE = 1 << 0;
        /// derived from another setting without being named there
        const IMPLICIT = 1 << 1;
        /// added by DefaultDependencies= handling
        const DEFAULT = 1 << 2;
        /// requested by a device event
        const UDEV = 1 << 3;
        /// expanded from RequiresMountsFor=
        const PATH_REQUIREMENT = 1 << 4;
        /// implied by an entry of the mount table
        const MOUNTINFO_IMPLICIT = 1 << 5;
        /// defaulted from an entry of the mount table
        const MOUNTINFO_DEFAULT = 1 << 6;
        /// implied by an active swap entry
        const PROC_SWAP = 1 << 7;
        /// requested over the manager api, transient units included
        const API = 1 << 8;
    }
}

bitflags! {
    /// where a programmatically applied setting is written back to
    pub struct UnitWriteFlags: u8 {
        /// runtime file
        const RUNTIME = 1 << 0;
        /// persistent file
        const PERSISTENT = 1 << 1;
        /// sub-unit type section in file
        const PRIVATE = 1 << 2;
    }
}

///
pub fn unit_write_flags_is_noop(flags: UnitWriteFlags) -> bool {
    !flags.intersects(UnitWriteFlags::RUNTIME | UnitWriteFlags::PERSISTENT)
}

#[allow(missing_docs)]
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum UnitType {
    UnitTarget = 0,
    UnitScope,
    UnitTypeMax,
    UnitTypeInvalid,
}

impl UnitType {
    ///
    pub fn iterator() -> impl Iterator<Item = UnitType> {
        [UnitType::UnitTarget, UnitType::UnitScope].iter().copied()
    }
}

impl FromStr for UnitType {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ret = match s.to_lowercase().as_str() {
            "target" => UnitType::UnitTarget,
            "scope" => UnitType::UnitScope,
            _ => UnitType::UnitTypeInvalid,
        };
        Ok(ret)
    }
}

impl From<UnitType> for String {
    fn from(u_t: UnitType) -> Self {
        match u_t {
            UnitType::UnitTarget => "target".into(),
            UnitType::UnitScope => "scope".into(),
            UnitType::UnitTypeMax => null_str!(""),
            UnitType::UnitTypeInvalid => null_str!(""),
        }
    }
}

impl TryFrom<u32> for UnitType {
    type Error = String;
    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(UnitType::UnitTarget),
            1 => Ok(UnitType::UnitScope),
            v => Err(format!("input {} is invalid", v)),
        }
    }
}

/// parse UnitType by unit_name
pub fn unit_name_to_type(unit_name: &str) -> UnitType {
    let words: Vec<&str> = unit_name.split('.').collect();
    if words.is_empty() {
        return UnitType::UnitTypeInvalid;
    }
    UnitType::from_str(words[words.len() - 1]).unwrap_or(UnitType::UnitTypeInvalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_name_to_type() {
        assert_eq!(unit_name_to_type("basic.target"), UnitType::UnitTarget);
        assert_eq!(unit_name_to_type("session-1.scope"), UnitType::UnitScope);
        assert_eq!(unit_name_to_type("foo.service"), UnitType::UnitTypeInvalid);
        assert_eq!(unit_name_to_type("foo"), UnitType::UnitTypeInvalid);
    }

    #[test]
    fn test_relation_string_round_trip() {
        for relation in [
            UnitRelations::UnitRequires,
            UnitRelations::UnitWantedBy,
            UnitRelations::UnitConflictedBy,
            UnitRelations::UnitAfter,
            UnitRelations::UnitOnFailureOf,
            UnitRelations::UnitTriggeredBy,
            UnitRelations::UnitJoinsNamespaceOf,
            UnitRelations::UnitSliceOf,
        ] {
            assert_eq!(
                relation.to_string().parse::<UnitRelations>().unwrap(),
                relation
            );
        }
        assert!("Require".parse::<UnitRelations>().is_err());
    }

    #[test]
    fn test_dependency_mask_ops() {
        let mut mask = UnitDependencyMask::FILE;
        mask |= UnitDependencyMask::DEFAULT;
        assert!(mask.contains(UnitDependencyMask::FILE));
        mask &= !UnitDependencyMask::FILE;
        assert_eq!(mask, UnitDependencyMask::DEFAULT);
        mask &= !UnitDependencyMask::DEFAULT;
        assert!(mask.is_empty());
    }
}
