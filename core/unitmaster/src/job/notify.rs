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

use super::entry::{JobConf, JobKind};
use crate::unit::JobMode;
use crate::unit::UnitDb;
use crate::unit::UnitX;
use core::unit::UnitRelationAtom;
use std::rc::Rc;

/// Expand OnSuccess=/OnFailure= of a concluded unit into start jobs on
/// the listed units.
pub(super) fn job_notify_result(
    db: &UnitDb,
    unit: Rc<UnitX>,
    atom: UnitRelationAtom,
    mode: JobMode,
) -> Vec<(JobConf, JobMode)> {
    assert!(
        atom == UnitRelationAtom::UnitAtomOnSuccess || atom == UnitRelationAtom::UnitAtomOnFailure
    );

    db.dep_gets_atom(&unit, atom)
        .iter()
        .map(|other| (JobConf::new(other, JobKind::Start), mode))
        .collect()
}

/// Expand a state change which happened outside any job into the follow-up
/// jobs the unit's relations ask for.
pub(super) fn job_notify_event(
    db: &UnitDb,
    config: &JobConf,
    mode_option: Option<JobMode>,
) -> Vec<(JobConf, JobMode)> {
    let unit = config.get_unit();
    let mut targets = Vec::new();

    match config.get_kind() {
        JobKind::Start => {
            // Requires=/Wants= pull the peer up retroactively, unless the
            // peer is ordered before us and had its chance already
            let groups = [
                (
                    UnitRelationAtom::UnitAtomRetroActiveStartReplace,
                    JobKind::Start,
                    JobMode::Replace,
                ),
                (
                    UnitRelationAtom::UnitAtomRetroActiveStartFail,
                    JobKind::Start,
                    JobMode::Fail,
                ),
                (
                    UnitRelationAtom::UnitAtomRetroActiveStopOnStart,
                    JobKind::Stop,
                    JobMode::Replace,
                ),
            ];
            for (atom, kind, dft_mode) in groups {
                let mode = mode_option.unwrap_or(dft_mode);
                for other in db.dep_gets_atom(unit, atom).iter() {
                    if kind == JobKind::Start
                        && db.dep_is_dep_atom_with(unit, UnitRelationAtom::UnitAtomAfter, other)
                    {
                        continue;
                    }
                    targets.push((JobConf::new(other, kind), mode));
                }
            }
        }
        JobKind::Stop => {
            let mode = mode_option.unwrap_or(JobMode::Replace);
            let atom = UnitRelationAtom::UnitAtomRetroActiveStopOnStop;
            for other in db.dep_gets_atom(unit, atom).iter() {
                targets.push((JobConf::new(other, JobKind::Stop), mode));
            }
        }
        JobKind::Reload => {
            // reload propagates only to peers which are already up, others
            // have nothing to re-read
            let mode = mode_option.unwrap_or(JobMode::Fail);
            let atom = UnitRelationAtom::UnitAtomPropagatesReloadTo;
            for other in db.dep_gets_atom(unit, atom).iter() {
                if other.active_state().is_active_or_reloading() {
                    targets.push((JobConf::new(other, JobKind::Reload), mode));
                }
            }
        }
        _ => unreachable!("kind of notify is not supported."),
    }

    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::test_utils;
    use crate::unit::DataManager;

    use crate::unit::UnitDb;
    use crate::unit::UnitX;

    #[test]
    fn jn_api() {
        let (db, unit_test1) = prepare_unit_single();

        // result
        let atom = UnitRelationAtom::UnitAtomOnSuccess;
        let confs = job_notify_result(&db, Rc::clone(&unit_test1), atom, JobMode::Replace);
        assert_eq!(confs.len(), 0);

        // event: start
        let conf = JobConf::new(&unit_test1, JobKind::Start);
        let ret = job_notify_event(&db, &conf, None);
        assert_eq!(ret.len(), 0);

        // event: stop
        let conf = JobConf::new(&unit_test1, JobKind::Stop);
        let ret = job_notify_event(&db, &conf, None);
        assert_eq!(ret.len(), 0);

        // event: reload
        let conf = JobConf::new(&unit_test1, JobKind::Reload);
        let ret = job_notify_event(&db, &conf, None);
        assert_eq!(ret.len(), 0);
    }

    fn prepare_unit_single() -> (Rc<UnitDb>, Rc<UnitX>) {
        let dm = Rc::new(DataManager::new());
        let db = Rc::new(UnitDb::new());
        let name_test1 = String::from("test1.target");
        let unit_test1 = create_unit(&dm, &name_test1);
        db.units_insert(name_test1, Rc::clone(&unit_test1));
        (db, unit_test1)
    }

    fn create_unit(dmr: &Rc<DataManager>, name: &str) -> Rc<UnitX> {
        log::init_log_to_console("create_unit", log::Level::Trace);
        log::info!("test");
        test_utils::create_unit_for_test_pub(dmr, name)
    }
}
