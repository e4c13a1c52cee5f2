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

use std::{
    collections::{BinaryHeap, HashMap},
    mem,
    rc::Rc,
};

use crate::{EventType, Source};
use basic::time_util::{NSEC_PER_USEC, USEC_INFINITY, USEC_PER_SEC};

#[derive(Debug, Clone, Copy)]
pub(crate) struct Timestamp {
    realtime: u64,
    monotonic: u64,
    boottime: u64,
}

impl Timestamp {
    pub fn new() -> Timestamp {
        Self {
            realtime: 0,
            monotonic: 0,
            boottime: 0,
        }
    }

    pub fn now(&mut self) -> Self {
        unsafe {
            let mut tp = mem::MaybeUninit::zeroed().assume_init();
            libc::clock_gettime(libc::CLOCK_REALTIME, &mut tp);
            self.realtime = load_usec(tp);
            libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut tp);
            self.monotonic = load_usec(tp);
            libc::clock_gettime(libc::CLOCK_BOOTTIME, &mut tp);
            self.boottime = load_usec(tp);
        }
        *self
    }
}

fn load_usec(ts: libc::timespec) -> u64 {
    if ts.tv_sec < 0 || ts.tv_nsec < 0 {
        return USEC_INFINITY;
    }

    (ts.tv_sec as u64)
        .saturating_mul(USEC_PER_SEC)
        .saturating_add(ts.tv_nsec as u64 / NSEC_PER_USEC)
}

/// All pending timer sources, one expiry-ordered heap per clock.
#[derive(Debug)]
pub(crate) struct Timer {
    timer_set: HashMap<EventType, TimerInner>,
    timestamp: Timestamp,
}

impl Timer {
    pub fn new() -> Timer {
        Self {
            timer_set: HashMap::new(),
            timestamp: Timestamp::new(),
        }
    }

    pub fn clockid(&self, et: &EventType) -> libc::clockid_t {
        match et {
            EventType::TimerRealtime => libc::CLOCK_REALTIME,
            EventType::TimerBoottime => libc::CLOCK_BOOTTIME,
            EventType::TimerMonotonic => libc::CLOCK_MONOTONIC,
            _ => unreachable!(),
        }
    }

    /// the current time of the clock backing the event type
    pub fn timerid(&mut self, et: &EventType) -> u64 {
        self.now();
        match et {
            EventType::TimerRealtime => self.timestamp.realtime,
            EventType::TimerBoottime => self.timestamp.boottime,
            EventType::TimerMonotonic => self.timestamp.monotonic,
            _ => unreachable!(),
        }
    }

    /// the earliest expiry of the event type, None when no timer is armed
    pub fn next(&mut self, et: &EventType) -> Option<u64> {
        match self.timer_set.get_mut(et) {
            Some(inner) => Some(inner.data.peek()?.next()),
            None => None,
        }
    }

    pub fn timer_stored(&self, next: u64) -> libc::itimerspec {
        libc::itimerspec {
            it_interval: libc::timespec {
                tv_sec: 0,
                tv_nsec: 0,
            },
            it_value: libc::timespec {
                tv_sec: (next / USEC_PER_SEC) as i64,
                tv_nsec: ((next % USEC_PER_SEC) * NSEC_PER_USEC) as i64,
            },
        }
    }

    #[allow(clippy::wrong_self_convention)]
    pub fn is_empty(&mut self, et: &EventType) -> bool {
        if let Some(inner) = self.timer_set.get_mut(et) {
            return inner.data.is_empty();
        }
        true
    }

    pub fn push(&mut self, source: Rc<dyn Source>) {
        let et = source.event_type();
        let now = self.timerid(&et);

        // time_relative() wins, an overflowing sum falls back to the
        // absolute expiry
        let next = match now.checked_add(source.time_relative()) {
            Some(v) => v,
            None => source.time(),
        };

        self.timer_set
            .entry(et)
            .or_insert_with(TimerInner::new)
            .push(ClockData::new(source, next));
    }

    /// pop one source of the event type that is already due, if any
    pub fn pop(&mut self, et: &EventType) -> Option<Rc<dyn Source>> {
        let now = self.timerid(et);
        match self.timer_set.get_mut(et) {
            Some(inner) => {
                if inner.data.is_empty() {
                    self.timer_set.remove(et);
                    None
                } else {
                    Some(inner.pop(now)?.source())
                }
            }
            None => None,
        }
    }

    pub fn now(&mut self) -> Timestamp {
        self.timestamp.now()
    }

    pub fn remove(&mut self, et: &EventType, source: Rc<dyn Source>) {
        if let Some(inner) = self.timer_set.get_mut(et) {
            inner.remove(source);
        }
    }
}

#[derive(Debug)]
pub(crate) struct TimerInner {
    data: BinaryHeap<ClockData>,
}

impl TimerInner {
    pub fn new() -> TimerInner {
        Self {
            data: BinaryHeap::new(),
        }
    }

    pub fn push(&mut self, clock_data: ClockData) {
        self.data.push(clock_data);
    }

    pub fn pop(&mut self, now: u64) -> Option<ClockData> {
        match self.data.peek() {
            Some(clock_data) if clock_data.next() <= now => self.data.pop(),
            _ => None,
        }
    }

    pub fn remove(&mut self, source: Rc<dyn Source>) {
        let kept = self
            .data
            .drain()
            .filter(|clock_data| !clock_data.source().eq(&source))
            .collect::<Vec<_>>();
        self.data = BinaryHeap::from(kept);
    }
}

/// a timer source together with its absolute expiry time, ordered
/// earliest-first in the heap
#[derive(Debug)]
pub(crate) struct ClockData {
    source: Rc<dyn Source>,
    next: u64,
}

impl ClockData {
    pub fn new(source: Rc<dyn Source>, next: u64) -> ClockData {
        Self { source, next }
    }

    pub fn source(&self) -> Rc<dyn Source> {
        self.source.clone()
    }

    pub fn next(&self) -> u64 {
        self.next
    }
}

impl Ord for ClockData {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.next.cmp(&other.next).reverse()
    }
}

impl PartialOrd for ClockData {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ClockData {
    fn eq(&self, other: &Self) -> bool {
        self.next == other.next
    }
}

impl Eq for ClockData {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Events;

    struct Tick {
        relative: u64,
    }

    impl Source for Tick {
        fn event_type(&self) -> EventType {
            EventType::TimerMonotonic
        }

        fn time_relative(&self) -> u64 {
            self.relative
        }

        fn dispatch(&self, _: &Events) -> i32 {
            0
        }

        fn token(&self) -> u64 {
            let data: u64 = unsafe { std::mem::transmute(self) };
            data
        }

        fn priority(&self) -> i8 {
            0i8
        }
    }

    #[test]
    fn test_timestamp() {
        let mut stamp = Timestamp::new();
        stamp.now();
        let first = stamp.monotonic;
        stamp.now();
        assert!(stamp.monotonic >= first);
        assert_ne!(stamp.realtime, 0);
    }

    #[test]
    fn test_timer_push_pop() {
        let mut timer = Timer::new();
        let et = EventType::TimerMonotonic;
        assert!(timer.is_empty(&et));
        assert_eq!(timer.next(&et), None);

        let soon: Rc<dyn Source> = Rc::new(Tick { relative: 0 });
        let later: Rc<dyn Source> = Rc::new(Tick {
            relative: 3600 * USEC_PER_SEC,
        });
        timer.push(later.clone());
        timer.push(soon.clone());
        assert!(!timer.is_empty(&et));

        // the immediate timer is due at once, the one-hour timer is not
        let popped = timer.pop(&et);
        assert!(popped.is_some());
        assert!(popped.unwrap().eq(&soon));
        assert!(timer.pop(&et).is_none());

        timer.remove(&et, later);
        assert!(timer.is_empty(&et));
    }
}
