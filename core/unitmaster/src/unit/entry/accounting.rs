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

use std::cell::RefCell;
use std::path::Path;

const NSEC_PER_USEC: u64 = 1000;

/// one set of resource counters, either raw from the cgroup or relative
/// to the base taken at unit start
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct AccountingSnapshot {
    pub cpu_usage_nsec: u64,
    pub io_read_bytes: u64,
    pub io_write_bytes: u64,
    pub io_read_ops: u64,
    pub io_write_ops: u64,
    pub oom_kills: u64,
}

impl AccountingSnapshot {
    fn delta(&self, base: &AccountingSnapshot) -> AccountingSnapshot {
        /* The kernel counters never go backwards, but the base may come from
         * a dead cgroup of the previous invocation. */
        AccountingSnapshot {
            cpu_usage_nsec: self.cpu_usage_nsec.saturating_sub(base.cpu_usage_nsec),
            io_read_bytes: self.io_read_bytes.saturating_sub(base.io_read_bytes),
            io_write_bytes: self.io_write_bytes.saturating_sub(base.io_write_bytes),
            io_read_ops: self.io_read_ops.saturating_sub(base.io_read_ops),
            io_write_ops: self.io_write_ops.saturating_sub(base.io_write_ops),
            oom_kills: self.oom_kills.saturating_sub(base.oom_kills),
        }
    }
}

pub(super) struct UeAccounting {
    data: RefCell<UeAccountingData>,
}

struct UeAccountingData {
    base: AccountingSnapshot,
    last: AccountingSnapshot,
}

impl UeAccounting {
    pub(super) fn new() -> UeAccounting {
        UeAccounting {
            data: RefCell::new(UeAccountingData {
                base: AccountingSnapshot::default(),
                last: AccountingSnapshot::default(),
            }),
        }
    }

    /* Taken on every fresh start so the counters restart from zero while the
     * cgroup lives on. */
    pub(super) fn snapshot_base(&self, cg_path: &Path) {
        let raw = read_raw(cg_path);
        let mut data = self.data.borrow_mut();
        data.base = raw;
        data.last = AccountingSnapshot::default();
    }

    pub(super) fn reset_accounting(&self, cg_path: &Path) {
        self.snapshot_base(cg_path);
    }

    /// refresh from the cgroup, keeping the previous values when the
    /// cgroup is already gone
    pub(super) fn read_current(&self, cg_path: &Path) -> AccountingSnapshot {
        let mut data = self.data.borrow_mut();
        if cg_path.as_os_str().is_empty() {
            return data.last;
        }
        let raw = read_raw(cg_path);
        if raw != AccountingSnapshot::default() {
            data.last = raw.delta(&data.base);
        }
        data.last
    }

    pub(super) fn last(&self) -> AccountingSnapshot {
        self.data.borrow().last
    }

    pub(super) fn serialize(&self) -> Vec<(String, String)> {
        let data = self.data.borrow();
        let mut items = Vec::new();
        for (snapshot, suffix) in [(&data.base, "base"), (&data.last, "last")] {
            items.push((
                format!("accounting-cpu-{}", suffix),
                snapshot.cpu_usage_nsec.to_string(),
            ));
            items.push((
                format!("accounting-io-read-bytes-{}", suffix),
                snapshot.io_read_bytes.to_string(),
            ));
            items.push((
                format!("accounting-io-write-bytes-{}", suffix),
                snapshot.io_write_bytes.to_string(),
            ));
            items.push((
                format!("accounting-io-read-ops-{}", suffix),
                snapshot.io_read_ops.to_string(),
            ));
            items.push((
                format!("accounting-io-write-ops-{}", suffix),
                snapshot.io_write_ops.to_string(),
            ));
            items.push((
                format!("accounting-oom-kills-{}", suffix),
                snapshot.oom_kills.to_string(),
            ));
        }
        items
    }

    /// returns true when the key belongs to the accounting sub-object
    pub(super) fn deserialize_item(&self, key: &str, value: &str) -> bool {
        let v = value.parse::<u64>().unwrap_or(0);
        let mut data = self.data.borrow_mut();
        let (snapshot, field) = match key.rsplit_once('-') {
            Some((prefix, "base")) => (&mut data.base, prefix),
            Some((prefix, "last")) => (&mut data.last, prefix),
            _ => return false,
        };
        match field {
            "accounting-cpu" => snapshot.cpu_usage_nsec = v,
            "accounting-io-read-bytes" => snapshot.io_read_bytes = v,
            "accounting-io-write-bytes" => snapshot.io_write_bytes = v,
            "accounting-io-read-ops" => snapshot.io_read_ops = v,
            "accounting-io-write-ops" => snapshot.io_write_ops = v,
            "accounting-oom-kills" => snapshot.oom_kills = v,
            _ => return false,
        }
        true
    }
}

fn read_raw(cg_path: &Path) -> AccountingSnapshot {
    let mut raw = AccountingSnapshot::default();
    if let Ok(usec) = cgroup::cg_cpu_usage(cg_path) {
        raw.cpu_usage_nsec = usec.saturating_mul(NSEC_PER_USEC);
    }
    if let Ok(io) = cgroup::cg_io_stat(cg_path) {
        raw.io_read_bytes = io.rbytes;
        raw.io_write_bytes = io.wbytes;
        raw.io_read_ops = io.rios;
        raw.io_write_ops = io.wios;
    }
    if let Ok(kills) = cgroup::cg_oom_kill_count(cg_path) {
        raw.oom_kills = kills;
    }
    raw
}

#[cfg(test)]
mod tests {
    use super::{AccountingSnapshot, UeAccounting};

    #[test]
    fn test_delta_saturates() {
        let raw = AccountingSnapshot {
            cpu_usage_nsec: 100,
            io_read_bytes: 5,
            ..Default::default()
        };
        let base = AccountingSnapshot {
            cpu_usage_nsec: 70,
            io_read_bytes: 9,
            ..Default::default()
        };
        let d = raw.delta(&base);
        assert_eq!(d.cpu_usage_nsec, 30);
        assert_eq!(d.io_read_bytes, 0);
    }

    #[test]
    fn test_serialize_restores_base() {
        let acct = UeAccounting::new();
        assert!(acct.deserialize_item("accounting-cpu-base", "4200"));
        assert!(acct.deserialize_item("accounting-oom-kills-last", "2"));
        assert!(!acct.deserialize_item("not-an-accounting-key", "1"));

        let items = acct.serialize();
        assert!(items.contains(&("accounting-cpu-base".to_string(), "4200".to_string())));
        assert!(items.contains(&("accounting-oom-kills-last".to_string(), "2".to_string())));
        assert_eq!(acct.last().oom_kills, 2);
    }
}
