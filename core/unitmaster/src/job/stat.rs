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

use super::entry::{JobResult, JobStage};
use super::table::JobChanges;
use std::cell::RefCell;
use std::fmt;

/// Lifetime counters of the job engine, reported when the field is
/// cleared on reload or shutdown.
#[derive(Debug)]
pub(super) struct JobStat {
    data: RefCell<JobStatData>,
}

impl JobStat {
    pub(super) fn new() -> JobStat {
        JobStat {
            data: RefCell::new(JobStatData::default()),
        }
    }

    pub(super) fn clear(&self) {
        *self.data.borrow_mut() = JobStatData::default();
    }

    pub(super) fn count_changes(&self, changes: &JobChanges) {
        let mut data = self.data.borrow_mut();
        data.installed += changes.adds.len();
        data.merged += changes.updates.len();
        drop(data);
        for del in changes.dels.iter() {
            if let JobStage::End(result) = del.get_stage() {
                self.count_finish(result);
            }
        }
    }

    pub(super) fn count_finish(&self, result: JobResult) {
        let mut data = self.data.borrow_mut();
        match result {
            JobResult::Done => data.done += 1,
            JobResult::Failed | JobResult::Assert | JobResult::Invalid => data.failed += 1,
            JobResult::TimeOut => data.timeout += 1,
            JobResult::Cancelled | JobResult::Collected => data.cancelled += 1,
            JobResult::Dependency => data.dependency += 1,
            _ => data.other += 1,
        }
    }

    pub(super) fn report(&self) -> String {
        self.data.borrow().to_string()
    }
}

#[derive(Debug, Default)]
struct JobStatData {
    installed: usize,
    merged: usize,

    done: usize,
    failed: usize,
    timeout: usize,
    cancelled: usize,
    dependency: usize,
    other: usize,
}

impl fmt::Display for JobStatData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "jobs: {} installed, {} merged; {} done, {} failed, {} timed out, {} cancelled, {} for dependency, {} other",
            self.installed,
            self.merged,
            self.done,
            self.failed,
            self.timeout,
            self.cancelled,
            self.dependency,
            self.other
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stat_counts_results() {
        let stat = JobStat::new();
        stat.count_finish(JobResult::Done);
        stat.count_finish(JobResult::Done);
        stat.count_finish(JobResult::TimeOut);
        stat.count_finish(JobResult::Collected);

        let report = stat.report();
        assert!(report.contains("2 done"));
        assert!(report.contains("1 timed out"));
        assert!(report.contains("1 cancelled"));

        stat.clear();
        assert!(stat.report().contains("0 done"));
    }
}
