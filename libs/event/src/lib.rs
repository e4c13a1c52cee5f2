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

//! # An event scheduling framework based on epoll
//!
//! Supports io/signal/timer/defer/post sources. Every source implements the
//! [`Source`] trait and is scheduled by priority; sources are dispatched one
//! at a time, so everything runs on the thread that calls [`Events::run`].
//!
//! ```no_run
//! # use std::rc::Rc;
//! # use event::{EventState, EventType, Events, Source};
//! #[derive(Debug)]
//! struct Tick;
//!
//! impl Source for Tick {
//!     fn event_type(&self) -> EventType {
//!         EventType::Defer
//!     }
//!
//!     fn priority(&self) -> i8 {
//!         0i8
//!     }
//!
//!     fn dispatch(&self, _: &Events) -> i32 {
//!         println!("tick");
//!         0
//!     }
//!
//!     fn token(&self) -> u64 {
//!         let data: u64 = unsafe { std::mem::transmute(self) };
//!         data
//!     }
//! }
//!
//! let e = Events::new().unwrap();
//! let s: Rc<dyn Source> = Rc::new(Tick);
//! e.add_source(s.clone()).unwrap();
//! e.set_enabled(s.clone(), EventState::OneShot).unwrap();
//! e.run(100).unwrap();
//! e.del_source(s.clone()).unwrap();
//! ```

pub mod error;
pub mod events;
mod poll;
pub mod source;
mod timer;

pub use crate::events::Events;
pub(crate) use crate::poll::Poll;
pub use crate::source::Source;
pub use error::*;

/// The source kinds the framework schedules.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub enum EventType {
    /// a file descriptor
    Io,
    /// CLOCK_REALTIME timer
    TimerRealtime,
    /// CLOCK_BOOTTIME timer
    TimerBoottime,
    /// CLOCK_MONOTONIC timer
    TimerMonotonic,
    /// a set of signals, delivered through one signalfd
    Signal,
    /// runs on every iteration while enabled
    Defer,
    /// runs after any non-post source dispatched
    Post,
}

/// The scheduling state of a source.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum EventState {
    /// dispatched whenever pending
    On,
    /// never dispatched
    Off,
    /// dispatched once, then turned off
    OneShot,
}
