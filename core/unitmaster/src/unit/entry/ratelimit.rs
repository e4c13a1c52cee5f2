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

use std::cell::{Cell, RefCell};
use std::time::Instant;

#[derive(PartialEq, Eq, Clone)]
pub(crate) enum StartLimitResult {
    StartLimitNotHit,
    StartLimitHit,
}

/// StartLimitIntervalSec=/StartLimitBurst= bookkeeping of one unit.
pub(super) struct StartLimit {
    hit: Cell<bool>,
    window: RefCell<StartWindow>,
}

impl StartLimit {
    pub(super) fn new() -> Self {
        StartLimit {
            hit: Cell::new(false),
            window: RefCell::new(StartWindow::new(0, 0)),
        }
    }

    pub(super) fn set_hit(&self, hit: bool) {
        self.hit.set(hit);
    }

    pub(super) fn hit(&self) -> bool {
        self.hit.get()
    }

    /// Account one start attempt. False once the burst within the
    /// configured interval is used up.
    pub(super) fn ratelimit_below(&self) -> bool {
        self.window.borrow_mut().check_below()
    }

    pub(super) fn reset_limit(&self) {
        self.window.borrow_mut().count = 0;
    }

    pub(super) fn init_from_config(&self, interval: u64, burst: u32) {
        let mut window = self.window.borrow_mut();
        window.interval = interval;
        window.burst = burst;
    }
}

struct StartWindow {
    interval: u64, // seconds, 0 disables the limit
    burst: u32,

    opened: Option<Instant>,
    count: u32,
}

impl StartWindow {
    fn new(interval: u64, burst: u32) -> Self {
        StartWindow {
            interval,
            burst,
            opened: None,
            count: 0,
        }
    }

    fn check_below(&mut self) -> bool {
        if self.interval == 0 || self.burst == 0 {
            return true;
        }

        let now = Instant::now();
        let expired = match self.opened {
            None => true,
            Some(opened) => now.duration_since(opened).as_secs() > self.interval,
        };
        if expired {
            self.opened = Some(now);
            self.count = 1;
            return true;
        }

        if self.count < self.burst {
            self.count += 1;
            return true;
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::StartWindow;

    #[test]
    fn test_ratelimit() {
        // disabled limit never trips
        let mut unlimited = StartWindow::new(0, 0);
        assert!(unlimited.check_below());
        assert!(unlimited.check_below());

        // burst of two within the window, the third attempt trips
        let mut limited = StartWindow::new(3, 2);
        assert!(limited.check_below());
        assert!(limited.check_below());
        assert!(!limited.check_below());

        // resetting the counter opens the gate again
        limited.count = 0;
        assert!(limited.check_below());
    }
}
