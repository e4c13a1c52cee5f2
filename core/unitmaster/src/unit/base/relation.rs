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

use core::unit::UnitRelations;

pub(in super::super) fn unit_relation_to_inverse(relation: UnitRelations) -> UnitRelations {
    match relation {
        UnitRelations::UnitRequires => UnitRelations::UnitRequiredBy,
        UnitRelations::UnitRequisite => UnitRelations::UnitRequisiteOf,
        UnitRelations::UnitWants => UnitRelations::UnitWantedBy,
        UnitRelations::UnitBindsTo => UnitRelations::UnitBoundBy,
        UnitRelations::UnitPartOf => UnitRelations::UnitConsistsOf,
        UnitRelations::UnitRequiredBy => UnitRelations::UnitRequires,
        UnitRelations::UnitRequisiteOf => UnitRelations::UnitRequisite,
        UnitRelations::UnitWantedBy => UnitRelations::UnitWants,
        UnitRelations::UnitBoundBy => UnitRelations::UnitBindsTo,
        UnitRelations::UnitConsistsOf => UnitRelations::UnitPartOf,
        UnitRelations::UnitConflicts => UnitRelations::UnitConflictedBy,
        UnitRelations::UnitConflictedBy => UnitRelations::UnitConflicts,
        UnitRelations::UnitBefore => UnitRelations::UnitAfter,
        UnitRelations::UnitAfter => UnitRelations::UnitBefore,
        UnitRelations::UnitOnSuccess => UnitRelations::UnitOnSuccessOf,
        UnitRelations::UnitOnSuccessOf => UnitRelations::UnitOnSuccess,
        UnitRelations::UnitOnFailure => UnitRelations::UnitOnFailureOf,
        UnitRelations::UnitOnFailureOf => UnitRelations::UnitOnFailure,
        UnitRelations::UnitTriggers => UnitRelations::UnitTriggeredBy,
        UnitRelations::UnitTriggeredBy => UnitRelations::UnitTriggers,
        UnitRelations::UnitPropagatesReloadTo => UnitRelations::UnitReloadPropagatedFrom,
        UnitRelations::UnitReloadPropagatedFrom => UnitRelations::UnitPropagatesReloadTo,
        UnitRelations::UnitJoinsNamespaceOf => UnitRelations::UnitJoinsNamespaceOf,
        UnitRelations::UnitReferences => UnitRelations::UnitReferencedBy,
        UnitRelations::UnitReferencedBy => UnitRelations::UnitReferences,
        UnitRelations::UnitInSlice => UnitRelations::UnitSliceOf,
        UnitRelations::UnitSliceOf => UnitRelations::UnitInSlice,
    }
}

#[cfg(test)]
mod tests {
    use super::unit_relation_to_inverse;
    use core::unit::UnitRelations;

    #[test]
    fn inverse_is_an_involution() {
        for relation in [
            UnitRelations::UnitRequires,
            UnitRelations::UnitRequisite,
            UnitRelations::UnitWants,
            UnitRelations::UnitBindsTo,
            UnitRelations::UnitPartOf,
            UnitRelations::UnitConflicts,
            UnitRelations::UnitBefore,
            UnitRelations::UnitOnSuccess,
            UnitRelations::UnitOnFailure,
            UnitRelations::UnitTriggers,
            UnitRelations::UnitPropagatesReloadTo,
            UnitRelations::UnitJoinsNamespaceOf,
            UnitRelations::UnitReferences,
            UnitRelations::UnitInSlice,
        ] {
            let inverse = unit_relation_to_inverse(relation);
            assert_eq!(unit_relation_to_inverse(inverse), relation);
        }
    }

    #[test]
    fn joins_namespace_of_is_self_inverse() {
        assert_eq!(
            unit_relation_to_inverse(UnitRelations::UnitJoinsNamespaceOf),
            UnitRelations::UnitJoinsNamespaceOf
        );
    }
}
