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

//! The outermost daemon layer: signal handling, the main loop, daemon
//! reload and the serialize/re-exec handoff.

pub(crate) mod config;
pub(crate) mod signals;
use self::config::ManagerConfig;
use crate::unit::UnitManagerX;
use basic::path_lookup::LookupPaths;
use basic::special::{CTRL_ALT_DEL_TARGET, DEFAULT_TARGET};
use constants::{LOG_FILE_PATH, RELOAD_STATE_FILE, RUN_DIR};
use core::error::*;
use core::serialize::{FdStore, SnapshotReader, SnapshotWriter};
use event::{EventState, EventType, Events, Source};
use log::Level;
use nix::sys::reboot::{self, RebootMode};
use nix::sys::signalfd::siginfo;
use signals::{SignalDispatcher, Signals};
use std::cell::RefCell;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::rc::Rc;
use std::str::FromStr;

struct SignalMgr {
    um: Rc<UnitManagerX>,
}

impl SignalMgr {
    fn new(um: Rc<UnitManagerX>) -> Self {
        SignalMgr { um: Rc::clone(&um) }
    }

    fn reexec(&self) -> Result<i32> {
        self.um.set_state(State::ReExecute);
        Ok(1)
    }

    fn reload(&self) -> Result<i32> {
        self.um.set_state(State::ReLoad);
        Ok(1)
    }
}

impl SignalDispatcher for SignalMgr {
    fn dispatch_signal(&self, signal: &siginfo) -> Result<i32> {
        /* Received signal should be in the set defined in EVENT_SIGNALS */
        match signal.ssi_signo as libc::c_int {
            libc::SIGHUP => self.reload(),
            libc::SIGTERM => self.reexec(),
            libc::SIGCHLD => Ok(self.um.child_sigchld_enable(true)),
            /* Kernel will send SIGINT to PID1 when users press ctrl-alt-del,
             * init should forward SIGINT to unitmaster. */
            libc::SIGINT => self
                .um
                .start_unit(CTRL_ALT_DEL_TARGET, false, "replace")
                .map(|_| 1),
            libc::SIGUSR1 => {
                self.um.dump_units();
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}

/// drains the nine work queues after any other source dispatched
struct QueueDrain {
    um: Rc<UnitManagerX>,
}

impl QueueDrain {
    fn new(um: Rc<UnitManagerX>) -> Self {
        QueueDrain { um }
    }
}

impl Source for QueueDrain {
    fn event_type(&self) -> EventType {
        EventType::Post
    }

    fn dispatch(&self, _e: &Events) -> i32 {
        if self.um.has_work() {
            self.um.dispatch_work_queues();
        }
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

/// Encapsulate manager and expose api to the outside
pub struct Manager {
    event: Rc<Events>,
    signal: Rc<Signals<SignalMgr>>,
    queues: Rc<QueueDrain>,
    mode: Mode,
    _action: Action,
    state: Rc<RefCell<State>>,
    um: Rc<UnitManagerX>,
    #[allow(dead_code)]
    lookup_path: Rc<LookupPaths>,
    config: Rc<RefCell<ManagerConfig>>,
}

impl Drop for Manager {
    fn drop(&mut self) {
        log::debug!("Manager drop, clear.");
        // repeating protection
        self.event.clear();
    }
}

impl Manager {
    /// create factory instance
    pub fn new(mode: Mode, action: Action, manager_config: Rc<RefCell<ManagerConfig>>) -> Self {
        let event = Rc::new(Events::new().unwrap());
        let mut l_path = LookupPaths::new();
        l_path.init_lookup_paths();
        let lookup_path = Rc::new(l_path);
        let state = Rc::new(RefCell::new(State::Init));
        let um = Rc::new(UnitManagerX::new(
            &event,
            &lookup_path,
            Rc::clone(&state),
            manager_config.clone(),
        ));

        Manager {
            event,
            signal: Rc::new(Signals::new(SignalMgr::new(Rc::clone(&um)))),
            queues: Rc::new(QueueDrain::new(Rc::clone(&um))),
            mode,
            _action: action,
            state,
            um,
            lookup_path,
            config: manager_config,
        }
    }

    fn add_default_job(&self) -> Result<i32> {
        if let Err(e) = self.um.start_unit(DEFAULT_TARGET, false, "replace") {
            log::error!("Failed to start {}: {:?}", DEFAULT_TARGET, e);
        }
        Ok(0)
    }

    fn rloop(&self) -> Result<State> {
        while self.state() == State::Ok {
            self.um.dispatch_work_queues();

            let ret = self.event.run(-1);
            if ret.is_err() {
                log::error!("event run loop error is: {:?}", ret);
            }
        }

        Ok(self.state())
    }

    /// start up, picking up a snapshot when the daemon was re-executed
    pub fn startup(&self, deserialize: Option<&Path>) -> Result<i32> {
        let reload = deserialize.is_some();
        log::info!("startup with reload[{}]", reload);

        let inherited = match deserialize {
            Some(path) => self.recover(path)?,
            None => None,
        };

        // setup external connections
        self.register_ex(inherited)?;

        /* restore entry state machines before the first event dispatch */
        if reload {
            self.um.entry_coldplug();
            self.um.entry_catchup();
        } else {
            // add the first job: default job
            self.add_default_job()?;
        }

        // it's ok now
        self.set_state(State::Ok);

        Ok(0)
    }

    /// read the snapshot back; returns the inherited notify socket fd
    fn recover(&self, path: &Path) -> Result<Option<std::os::unix::io::RawFd>> {
        let file = File::open(path).context(IoSnafu)?;
        let mut reader = SnapshotReader::new(BufReader::new(file));

        /* the fd-store-size record leads the preamble, the store must exist
         * before any record can reference an entry by index */
        let fds = match reader.next_record()? {
            Some(rec) if rec.key == "fd-store-size" => {
                let n = rec.value.parse::<usize>()?;
                FdStore::inherit(n)
            }
            _ => return Err(Error::InvalidData),
        };

        let inherited = self.um.deserialize(&mut reader, &fds)?;
        fds.close_all();

        if let Err(e) = fs::remove_file(path) {
            log::warn!("Failed to remove state file {:?}: {}", path, e);
        }
        Ok(inherited)
    }

    /// enter the main loop
    pub fn main_loop(&self) -> Result<bool> {
        loop {
            let state = self.rloop()?;
            match state {
                State::ReLoad => self.reload(),
                State::ReExecute => return self.reexec(),
                State::Exit => return Ok(false),
                State::Reboot => self.reboot(RebootMode::RB_AUTOBOOT),
                State::PowerOff => self.reboot(RebootMode::RB_POWER_OFF),
                _ => return Ok(false),
            };
        }
    }

    fn reload(&self) {
        self.config.borrow_mut().reload(None);
        log::init_log(
            "unitmaster",
            Level::from_str(&self.config.borrow().LogLevel).unwrap_or(Level::Info),
            self.config
                .borrow()
                .LogTarget
                .split(&[' ', '-'][..])
                .collect(),
            LOG_FILE_PATH,
            self.config.borrow().LogFileSize,
            self.config.borrow().LogFileNumber,
        );

        log::info!("reload start.");

        // re-read every unit file, runtime state stays intact
        self.um.entry_reload();
        self.um.dispatch_load_queue();

        // it's ok now
        self.set_state(State::Ok);
    }

    fn reexec(&self) -> Result<bool> {
        self.set_state(State::ReExecute);
        self.prepare_reexec()?;
        Ok(true)
    }

    /// write the snapshot and renumber the stored fds so the re-executed
    /// manager finds them where the indices promise
    fn prepare_reexec(&self) -> Result<()> {
        let fds = FdStore::new();

        let mut body = Vec::new();
        {
            let mut writer = SnapshotWriter::new(&mut body);
            self.um.serialize(&mut writer, &fds)?;
        }

        fs::create_dir_all(RUN_DIR).context(IoSnafu)?;
        let file = File::create(RELOAD_STATE_FILE).context(IoSnafu)?;
        let mut out = BufWriter::new(file);
        {
            let mut writer = SnapshotWriter::new(&mut out);
            writer.item("fd-store-size", &fds.len().to_string())?;
        }
        out.write_all(&body).context(IoSnafu)?;
        out.flush().context(IoSnafu)?;

        fds.pack()?;
        Ok(())
    }

    fn reboot(&self, reboot_mode: RebootMode) {
        log::info!("Rebooting with mode {:?}...", reboot_mode);
        log::flush!();
        let _ = reboot::reboot(reboot_mode); // make lint happy
    }

    fn register_ex(&self, inherited_notify: Option<std::os::unix::io::RawFd>) -> Result<()> {
        // data
        self.um.register_ex(inherited_notify)?;

        // signal
        let signal = Rc::clone(&self.signal);
        self.event.add_source(signal)?;
        let signal = Rc::clone(&self.signal);
        self.event.set_enabled(signal, EventState::On)?;

        // queue drain
        let queues = Rc::clone(&self.queues);
        self.event.add_source(queues)?;
        let queues = Rc::clone(&self.queues);
        self.event.set_enabled(queues, EventState::On)?;

        Ok(())
    }
}

/// manager running mode
#[allow(missing_docs)]
#[allow(dead_code)]
#[derive(PartialEq, Eq, Debug)]
pub enum Mode {
    System,
    User,
}

/// manager action mode
#[allow(missing_docs)]
#[allow(dead_code)]
pub enum Action {
    Run,
    Help,
    Test,
}

/// manager running states
#[allow(missing_docs)]
#[allow(dead_code)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum State {
    Init,
    Ok,
    Exit,
    ReLoad,
    ReExecute,
    Reboot,
    PowerOff,
}

impl Manager {
    #[allow(dead_code)]
    pub(crate) fn exit(&self) -> Result<i32> {
        self.set_state(State::Exit);
        Ok(0)
    }

    fn set_state(&self, state: State) {
        *self.state.borrow_mut() = state;
    }

    fn state(&self) -> State {
        *self.state.borrow()
    }

    #[allow(dead_code)]
    pub(crate) fn mode(&self) -> &Mode {
        &self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manager_new_starts_init() {
        log::init_log_to_console("manager_new_starts_init", log::Level::Trace);
        let manager = Manager::new(
            Mode::System,
            Action::Run,
            Rc::new(RefCell::new(ManagerConfig::new(None))),
        );
        assert_eq!(manager.state(), State::Init);
        assert_eq!(manager.mode(), &Mode::System);

        manager.exit().unwrap();
        assert_eq!(manager.state(), State::Exit);
        /* the main loop leaves on Exit without touching the system */
        assert!(!manager.main_loop().unwrap());
    }
}
