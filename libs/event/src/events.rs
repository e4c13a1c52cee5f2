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

//! An event scheduling framework based on epoll
use crate::error::*;
use crate::timer::Timer;
use crate::{EventState, EventType, Poll, Source};
use nix::sys::signalfd::siginfo;
use nix::sys::signalfd::SfdFlags;
use nix::sys::signalfd::SigSet;
use nix::sys::signalfd::SignalFd;
use nix::unistd;
use snafu::ResultExt;
use std::cell::RefCell;
use std::collections::{BinaryHeap, HashMap};
use std::mem::MaybeUninit;
use std::os::unix::prelude::{AsRawFd, RawFd};
use std::rc::Rc;

/// An event scheduling framework based on epoll
#[derive(Debug)]
pub struct Events {
    data: RefCell<EventsData>,
}

impl Drop for Events {
    fn drop(&mut self) {
        // repeating protection
        self.clear();
    }
}

impl Events {
    /// create event
    pub fn new() -> Result<Events> {
        Ok(Events {
            data: RefCell::new(EventsData::new()?),
        })
    }

    /// for all: add source which implement Source trait
    pub fn add_source(&self, source: Rc<dyn Source>) -> Result<i32> {
        self.data.borrow_mut().add_source(source)
    }

    /// for all: check if the source exists
    pub fn has_source(&self, source: Rc<dyn Source>) -> bool {
        self.data.borrow().has_source(source)
    }

    /// for all: delete source
    pub fn del_source(&self, source: Rc<dyn Source>) -> Result<i32> {
        self.data.borrow_mut().del_source(source)
    }

    /// for all: set the source enabled state
    pub fn set_enabled(&self, source: Rc<dyn Source>, state: EventState) -> Result<i32> {
        self.data.borrow_mut().set_enabled(source, state)
    }

    /// for all: exit event loop
    pub fn set_exit(&self) {
        self.data.borrow_mut().set_exit()
    }

    /// for all: Scheduling once, processing an event
    pub fn run(&self, timeout: i32) -> Result<i32> {
        if self.data.borrow().exit() {
            return Ok(0);
        }

        if !self.data.borrow_mut().prepare() {
            self.data.borrow_mut().wait(timeout);
        }

        self.dispatch()?;
        Ok(0)
    }

    /// for all: Process the event in a loop until exiting actively
    pub fn rloop(&self) -> Result<i32> {
        loop {
            if self.data.borrow().exit() {
                return Ok(0);
            }
            self.run(-1i32)?;
        }
    }

    /// private: Fetch the highest priority event processing on the pending queue
    fn dispatch(&self) -> Result<i32> {
        if self.data.borrow().exit() {
            return Ok(0);
        }

        let top = match self.data.borrow_mut().pending_pop() {
            None => return Ok(0),
            Some(v) => v,
        };

        let state = match self.data.borrow_mut().source_state(top.token()) {
            None => return Ok(0),
            Some(v) => v.state,
        };

        /* If a non-post event source raised, mark all post event sources as pending. */
        if state != EventState::Off && top.event_type() != EventType::Post {
            self.data.borrow_mut().pending_posts();
        }

        match state {
            EventState::Off => {}
            EventState::On => {
                top.dispatch(self);
                if top.event_type() == EventType::Defer {
                    self.data.borrow_mut().pending_push(top.clone(), 0);
                }
            }
            EventState::OneShot => {
                self.data
                    .borrow_mut()
                    .set_enabled(top.clone(), EventState::Off)?;

                top.dispatch(self);
            }
        }
        Ok(0)
    }

    /// for signal: read the signal content when signal source emit
    pub fn read_signals(&self) -> Option<siginfo> {
        self.data.borrow_mut().read_signals()
    }

    /// The "events" represents the "epoll_event" returned by epoll_wait.
    pub fn epoll_event(&self, token: u64) -> u32 {
        self.data.borrow().epoll_event(token)
    }

    /// for test: clear all events to release resource
    /// repeating protection
    pub fn clear(&self) {
        self.data.borrow_mut().clear();
    }
}

#[derive(Debug, Clone)]
pub(crate) struct State {
    state: EventState,
    epoll_event: u32,
    in_pending: bool,
}

impl Default for State {
    fn default() -> State {
        State {
            state: EventState::Off,
            epoll_event: 0,
            in_pending: false,
        }
    }
}

#[derive(Debug)]
pub(crate) struct EventsData {
    poller: Poll,
    exit: bool,
    sources: HashMap<u64, Rc<dyn Source>>,
    defer_sources: HashMap<u64, Rc<dyn Source>>,
    post_sources: HashMap<u64, Rc<dyn Source>>,
    pending: BinaryHeap<Rc<dyn Source>>,
    state: HashMap<u64, State>,
    timerfd: HashMap<EventType, RawFd>,
    signalfd: SignalFd,
    timer: Timer,
}

// the declaration "pub(self)" is for identification only.
impl EventsData {
    pub(self) fn new() -> Result<EventsData> {
        Ok(Self {
            poller: Poll::new()?,
            exit: false,
            sources: HashMap::new(),
            defer_sources: HashMap::new(),
            post_sources: HashMap::new(),
            pending: BinaryHeap::new(),
            state: HashMap::new(),
            timerfd: HashMap::new(),
            signalfd: SignalFd::with_flags(
                &SigSet::empty(),
                SfdFlags::SFD_NONBLOCK | SfdFlags::SFD_CLOEXEC,
            )
            .context(NixSnafu)?,
            timer: Timer::new(),
        })
    }

    pub(self) fn add_source(&mut self, source: Rc<dyn Source>) -> Result<i32> {
        let et = source.event_type();
        let token = source.token();

        match et {
            EventType::Io | EventType::Signal => {
                self.sources.insert(token, source.clone());
            }
            EventType::Defer => {
                self.defer_sources.insert(token, source.clone());
            }
            EventType::Post => {
                self.post_sources.insert(token, source.clone());
            }
            EventType::TimerRealtime | EventType::TimerBoottime | EventType::TimerMonotonic => (),
        }

        // default state
        self.state.insert(token, State::default());

        Ok(0)
    }

    pub(self) fn has_source(&self, source: Rc<dyn Source>) -> bool {
        // every added source holds a state entry, whatever its type
        self.state.contains_key(&source.token())
    }

    pub(self) fn del_source(&mut self, source: Rc<dyn Source>) -> Result<i32> {
        self.source_offline(&source)?;

        let et = source.event_type();
        let token = source.token();
        match et {
            EventType::Io | EventType::Signal => {
                self.sources.remove(&token);
            }
            EventType::Defer => {
                self.defer_sources.remove(&token).ok_or(Error::Other {
                    word: "item not found",
                })?;
            }
            EventType::Post => {
                self.post_sources.remove(&token).ok_or(Error::Other {
                    word: "item not found",
                })?;
            }
            EventType::TimerRealtime | EventType::TimerBoottime | EventType::TimerMonotonic => {
                if self.timer.is_empty(&et) {
                    if let Some(fd) = self.timerfd.remove(&et) {
                        self.poller.unregister(fd.as_raw_fd())?;
                        let _ = unistd::close(fd);
                    }
                }
            }
        }

        // remove state
        self.state.remove(&token);

        Ok(0)
    }

    pub(self) fn set_enabled(&mut self, source: Rc<dyn Source>, state: EventState) -> Result<i32> {
        let token = source.token();
        if let Some(current) = self.state.get(&token) {
            if current.state == state {
                return Ok(0);
            }
        }
        match state {
            EventState::On | EventState::OneShot => {
                self.source_online(&source)?;
            }
            EventState::Off => {
                self.source_offline(&source)?;
            }
        }

        if let Some(current) = self.state.get_mut(&token) {
            current.state = state;
        }

        Ok(0)
    }

    /// when set to on, register events to the listening queue
    pub(self) fn source_online(&mut self, source: &Rc<dyn Source>) -> Result<i32> {
        let et = source.event_type();
        let token = source.token();
        let mut event = libc::epoll_event {
            events: source.epoll_event(),
            u64: token,
        };

        match et {
            EventType::Io => {
                self.poller.register(source.fd(), &mut event)?;
            }
            EventType::Signal => {
                let mut mask = SigSet::empty();
                for sig in source.signals() {
                    mask.add(sig);
                }
                mask.thread_set_mask().context(NixSnafu)?;
                self.signalfd.set_mask(&mask).context(NixSnafu)?;
                self.poller
                    .register(self.signalfd.as_raw_fd(), &mut event)?;
            }
            EventType::TimerRealtime | EventType::TimerBoottime | EventType::TimerMonotonic => {
                match self.timerfd.get(&et) {
                    None => {
                        let fd = unsafe {
                            libc::timerfd_create(
                                self.timer.clockid(&et),
                                libc::TFD_NONBLOCK | libc::TFD_CLOEXEC,
                            )
                        };
                        self.timerfd.insert(et, fd);
                        self.poller.register(fd, &mut event)?;
                        self.timer.push(source.clone());
                    }
                    Some(_) => self.timer.push(source.clone()),
                }
            }
            EventType::Defer => {
                self.pending_push(source.clone(), 0);
            }
            EventType::Post => {}
        }

        Ok(0)
    }

    /// move the event out of the listening queue
    pub(self) fn source_offline(&mut self, source: &Rc<dyn Source>) -> Result<i32> {
        // unneed unregister when source is already Offline
        if let Some(current) = self.state.get(&source.token()) {
            if current.state == EventState::Off {
                return Ok(0);
            }
        } else {
            return Ok(0);
        }

        let et = source.event_type();
        match et {
            EventType::Io => {
                self.poller.unregister(source.fd())?;
            }
            EventType::Signal => {
                self.poller.unregister(self.signalfd.as_raw_fd())?;
            }
            EventType::TimerRealtime | EventType::TimerBoottime | EventType::TimerMonotonic => {
                self.timer.remove(&et, source.clone());
            }
            EventType::Defer => (),
            EventType::Post => {}
        }

        Ok(0)
    }

    /// read the signal content when signal source emit
    pub(self) fn read_signals(&mut self) -> Option<siginfo> {
        self.signalfd.read_signal().unwrap_or(None)
    }

    pub(crate) fn epoll_event(&self, token: u64) -> u32 {
        match self.state.get(&token) {
            Some(t) => t.epoll_event,
            None => 0u32,
        }
    }

    /// Wait for events through the poller
    /// And add the corresponding sources to the pending queue
    pub(self) fn wait(&mut self, timeout: i32) -> bool {
        let events = if let Ok(s) = self.poller.poll(timeout) {
            s
        } else {
            return false;
        };

        for event in events.iter() {
            let token = event.u64;
            let source = match self.sources.get(&token) {
                Some(s) => s.clone(),
                None => continue,
            };
            self.pending_push(source, event.events);
        }

        for et in [
            EventType::TimerRealtime,
            EventType::TimerBoottime,
            EventType::TimerMonotonic,
        ] {
            let next = match self.timer.next(&et) {
                None => continue,
                Some(v) => v,
            };
            if self.timer.timerid(&et) < next {
                continue;
            }
            if !self.flush_timer(&et) {
                return false;
            }

            while let Some(source) = self.timer.pop(&et) {
                self.pending_push(source, 0);
            }
        }

        !self.pending_is_empty() || !events.is_empty()
    }

    pub(self) fn prepare(&mut self) -> bool {
        let mut ret = false;

        for et in [
            EventType::TimerRealtime,
            EventType::TimerBoottime,
            EventType::TimerMonotonic,
        ] {
            self.timer.now();
            let next = match self.timer.next(&et) {
                None => continue,
                Some(v) => v,
            };

            if self.timer.timerid(&et) >= next {
                while let Some(source) = self.timer.pop(&et) {
                    self.pending_push(source, 0);
                }
                ret = true;
            } else if let Some(fd) = self.timerfd.get(&et) {
                let new_value = self.timer.timer_stored(next);
                let mut old_value = MaybeUninit::<libc::itimerspec>::zeroed();
                unsafe {
                    libc::timerfd_settime(
                        fd.as_raw_fd(),
                        libc::TFD_TIMER_ABSTIME,
                        &new_value,
                        old_value.as_mut_ptr(),
                    );
                }
            }
        }

        if !self.pending_is_empty() {
            return self.wait(0);
        }

        ret
    }

    pub(self) fn pending_pop(&mut self) -> Option<Rc<dyn Source>> {
        if let Some(top) = self.pending.pop() {
            if let Some(state) = self.state.get_mut(&top.token()) {
                state.in_pending = false;
            }
            return Some(top);
        };

        None
    }

    pub(self) fn pending_push(&mut self, source: Rc<dyn Source>, event: u32) {
        if let Some(current) = self.state.get_mut(&source.token()) {
            if current.in_pending {
                current.epoll_event |= event;
            } else {
                current.epoll_event = event;
                self.pending.push(source);
                current.in_pending = true;
            }
        }
    }

    pub(self) fn pending_posts(&mut self) {
        for (token, post_source) in self.post_sources.iter() {
            if let Some(current) = self.state.get_mut(token) {
                if current.state == EventState::Off {
                    continue;
                }

                if !current.in_pending {
                    self.pending.push(post_source.clone());
                    current.in_pending = true;
                }
            }
        }
    }

    pub(self) fn source_state(&self, token: u64) -> Option<State> {
        self.state.get(&token).cloned()
    }

    pub(self) fn set_exit(&mut self) {
        self.exit = true;
    }

    pub(self) fn exit(&self) -> bool {
        self.exit
    }

    pub(self) fn pending_is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn flush_timer(&self, et: &EventType) -> bool {
        let timer_fd = match self.timerfd.get(et) {
            Some(fd) => fd.as_raw_fd(),
            None => return true,
        };
        match unistd::read(timer_fd, &mut [0u8; 8]) {
            Ok(_) => true,
            Err(nix::errno::Errno::EAGAIN) | Err(nix::errno::Errno::EINTR) => true,
            Err(_) => false,
        }
    }

    fn clear(&mut self) {
        self.sources.clear();
        self.defer_sources.clear();
        self.post_sources.clear();
        self.pending.clear();
        self.state.clear();
        for (_, fd) in self.timerfd.drain() {
            let _ = unistd::close(fd);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Counter {
        token: u64,
        et: EventType,
        hits: Cell<u32>,
    }

    impl Counter {
        fn new(token: u64, et: EventType) -> Counter {
            Counter {
                token,
                et,
                hits: Cell::new(0),
            }
        }
    }

    impl Source for Counter {
        fn event_type(&self) -> EventType {
            self.et
        }

        fn dispatch(&self, _: &Events) -> i32 {
            self.hits.set(self.hits.get() + 1);
            0
        }

        fn token(&self) -> u64 {
            self.token
        }

        fn priority(&self) -> i8 {
            0i8
        }
    }

    struct PipeRead {
        fd: RawFd,
        hits: Cell<u32>,
    }

    impl Source for PipeRead {
        fn fd(&self) -> RawFd {
            self.fd
        }

        fn event_type(&self) -> EventType {
            EventType::Io
        }

        fn dispatch(&self, _: &Events) -> i32 {
            self.hits.set(self.hits.get() + 1);
            let mut buf = [0u8; 8];
            let _ = unistd::read(self.fd, &mut buf);
            0
        }

        fn token(&self) -> u64 {
            7u64
        }

        fn priority(&self) -> i8 {
            0i8
        }
    }

    #[test]
    fn test_defer_oneshot() {
        let e = Events::new().unwrap();
        let s = Rc::new(Counter::new(1, EventType::Defer));
        e.add_source(s.clone()).unwrap();
        assert!(e.has_source(s.clone()));
        e.set_enabled(s.clone(), EventState::OneShot).unwrap();

        e.run(0).unwrap();
        assert_eq!(s.hits.get(), 1);

        // a one-shot source turned itself off after the dispatch
        e.run(0).unwrap();
        assert_eq!(s.hits.get(), 1);

        e.del_source(s.clone()).unwrap();
        assert!(!e.has_source(s.clone()));
    }

    #[test]
    fn test_defer_on_repeats() {
        let e = Events::new().unwrap();
        let s = Rc::new(Counter::new(2, EventType::Defer));
        e.add_source(s.clone()).unwrap();
        e.set_enabled(s.clone(), EventState::On).unwrap();

        e.run(0).unwrap();
        e.run(0).unwrap();
        assert_eq!(s.hits.get(), 2);

        e.set_enabled(s.clone(), EventState::Off).unwrap();
        e.del_source(s.clone()).unwrap();
    }

    #[test]
    fn test_post_runs_after_other_source() {
        let e = Events::new().unwrap();
        let defer = Rc::new(Counter::new(3, EventType::Defer));
        let post = Rc::new(Counter::new(4, EventType::Post));
        e.add_source(defer.clone()).unwrap();
        e.add_source(post.clone()).unwrap();
        e.set_enabled(post.clone(), EventState::On).unwrap();

        // nothing pending, the post source alone never raises
        e.run(0).unwrap();
        assert_eq!(post.hits.get(), 0);

        e.set_enabled(defer.clone(), EventState::OneShot).unwrap();
        e.run(0).unwrap();
        assert_eq!(defer.hits.get(), 1);
        e.run(0).unwrap();
        assert_eq!(post.hits.get(), 1);

        e.del_source(defer.clone()).unwrap();
        e.del_source(post.clone()).unwrap();
    }

    #[test]
    fn test_io_pipe() {
        let e = Events::new().unwrap();
        let (r, w) = unistd::pipe().unwrap();
        let s = Rc::new(PipeRead {
            fd: r,
            hits: Cell::new(0),
        });
        e.add_source(s.clone()).unwrap();
        e.set_enabled(s.clone(), EventState::On).unwrap();

        unistd::write(w, b"x").unwrap();
        e.run(1000).unwrap();
        assert_eq!(s.hits.get(), 1);

        e.del_source(s.clone()).unwrap();
        let _ = unistd::close(r);
        let _ = unistd::close(w);
    }

    #[test]
    fn test_timer_monotonic_fires() {
        struct Soon(Counter);
        impl Source for Soon {
            fn event_type(&self) -> EventType {
                EventType::TimerMonotonic
            }
            fn time_relative(&self) -> u64 {
                0
            }
            fn dispatch(&self, e: &Events) -> i32 {
                self.0.dispatch(e)
            }
            fn token(&self) -> u64 {
                self.0.token()
            }
            fn priority(&self) -> i8 {
                0i8
            }
        }

        let e = Events::new().unwrap();
        let s = Rc::new(Soon(Counter::new(5, EventType::TimerMonotonic)));
        e.add_source(s.clone()).unwrap();
        e.set_enabled(s.clone(), EventState::OneShot).unwrap();

        e.run(100).unwrap();
        assert_eq!(s.0.hits.get(), 1);
    }
}
