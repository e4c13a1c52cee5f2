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

//! An event source is registered to the event framework by implementing
//! this trait. Which callbacks are mandatory depends on the event type:
//! an Io source must supply `fd`, a Signal source `signals`, a timer
//! source `time` or `time_relative`. `token`, `priority` and `dispatch`
//! are required for all of them.
use crate::{EventType, Events};
use nix::sys::signal::Signal;
use std::fmt::Debug;
use std::hash::{Hash, Hasher};

/// event source
pub trait Source {
    /// the fd the source is polling, mandatory for an Io source
    fn fd(&self) -> std::os::unix::io::RawFd {
        todo!()
    }

    /// the signal set the source subscribes to, mandatory for a Signal source
    fn signals(&self) -> Vec<Signal> {
        vec![]
    }

    /// the absolute expiry time in microseconds, for timer sources
    fn time(&self) -> u64 {
        u64::MAX
    }

    /// the expiry time relative to now in microseconds, for timer sources
    fn time_relative(&self) -> u64 {
        u64::MAX
    }

    /// the type of the event source
    fn event_type(&self) -> EventType {
        EventType::Io
    }

    /// the epoll events the source is interested in
    fn epoll_event(&self) -> u32 {
        (libc::EPOLLIN | libc::EPOLLONESHOT) as u32
    }

    /// priority of the source, -127i8 ~ 128i8, the smaller the number,
    /// the higher the priority
    fn priority(&self) -> i8 {
        0i8
    }

    /// the callback of the event source
    fn dispatch(&self, event: &Events) -> i32;

    /// the unique token identifying the source
    fn token(&self) -> u64;

    /// description of the source
    fn description(&self) -> String {
        String::from("default")
    }
}

impl Hash for dyn Source {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.token().hash(state);
    }
}

impl PartialEq for dyn Source {
    fn eq(&self, other: &dyn Source) -> bool {
        self.token() == other.token()
    }
}

impl Eq for dyn Source {}

impl Ord for dyn Source {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.priority().cmp(&other.priority()).reverse()
    }
}

impl PartialOrd for dyn Source {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.priority().cmp(&other.priority()).reverse())
    }
}

impl Debug for dyn Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Source")
            .field("token", &self.token())
            .field("priority", &self.priority())
            .field("description", &self.description())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    struct Plain {
        t: u64,
        p: i8,
    }

    impl Source for Plain {
        fn event_type(&self) -> EventType {
            EventType::Defer
        }

        fn dispatch(&self, _: &Events) -> i32 {
            0
        }

        fn token(&self) -> u64 {
            self.t
        }

        fn priority(&self) -> i8 {
            self.p
        }
    }

    #[test]
    fn test_source_eq_by_token() {
        let a: Rc<dyn Source> = Rc::new(Plain { t: 1, p: 0 });
        let b: Rc<dyn Source> = Rc::new(Plain { t: 1, p: 5 });
        let c: Rc<dyn Source> = Rc::new(Plain { t: 2, p: 0 });
        assert_eq!(&a, &b);
        assert_ne!(&a, &c);
    }

    #[test]
    fn test_source_order_by_priority() {
        let high: Rc<dyn Source> = Rc::new(Plain { t: 1, p: -10 });
        let low: Rc<dyn Source> = Rc::new(Plain { t: 2, p: 10 });
        // smaller number means higher priority, reversed for the max-heap
        assert!(high > low);
    }
}
