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

//! unitmaster daemon bin

mod job;
mod manager;
mod unit;
mod utils;

extern crate clap;
use crate::manager::config::ManagerConfig;
use crate::manager::{Action, Manager, Mode};
use clap::Parser;
use constants::{LOG_FILE_PATH, MANAGER_ENV};
use core::error::*;
use libc::{c_int, getppid, prctl, PR_SET_CHILD_SUBREAPER};
use log::Level;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use std::cell::RefCell;
use std::env;
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{exit, Command};
use std::rc::Rc;
use std::str::FromStr;

/// parse program arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Recover the state serialized into the given file by a previous
    /// instance before it re-executed.
    #[clap(long)]
    deserialize: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    /* unitmaster is not necessarily PID1, so instead of resetting all signal
     * handlers we ignore everything explicitly and register the signals we
     * are interested in afterwards. */
    ignore_all_signals();
    register_reexec_signal(true);

    let manager_config = Rc::new(RefCell::new(ManagerConfig::new(None)));
    log::init_log(
        "unitmaster",
        Level::from_str(&manager_config.borrow().LogLevel).unwrap_or(Level::Info),
        manager_config
            .borrow()
            .LogTarget
            .split(&[' ', '-'][..])
            .collect(),
        LOG_FILE_PATH,
        manager_config.borrow().LogFileSize,
        manager_config.borrow().LogFileNumber,
    );
    log::info!("unitmaster running in system mode.");

    set_child_reaper();

    let manager = Manager::new(Mode::System, Action::Run, manager_config);

    // startup
    manager.startup(args.deserialize.as_deref())?;

    // main loop
    let ret = manager.main_loop();
    log::info!("unitmaster end its main loop with result: {:?}", ret);

    // re-exec
    if ret.map_or(false, |reexec| reexec) {
        let args: Vec<String> = env::args().collect();
        do_reexecute(&args, true);
    }

    Ok(())
}

fn set_child_reaper() {
    let ret = unsafe { prctl(PR_SET_CHILD_SUBREAPER, 1, 0, 0, 0) };

    if ret < 0 {
        log::warn!("failed to set child reaper, errno: {}", ret);
    }
}

fn do_reexecute(args: &[String], reload: bool) {
    let path;
    let mut argv = [].to_vec();
    if args.is_empty() {
        let (ppath, pargv) = execarg_build_default();
        path = ppath;
        argv = pargv;
    } else {
        path = args[0].clone();
        if args.len() >= 2 {
            argv = args[1..].to_vec();
        }
    }

    // Strip any '--deserialize <path>' remaining from the previous start.
    if let Some(idx) = argv.iter().position(|a| a == "--deserialize") {
        argv.remove(idx);
        if idx < argv.len() {
            argv.remove(idx);
        }
    }

    if reload {
        argv.push("--deserialize".to_string());
        argv.push(constants::RELOAD_STATE_FILE.to_string());
    }

    log::info!("do_reexecute path:{:?} argv:{:?}", path, argv);

    let mut command = Command::new(&path);
    command.args(&argv);
    let comm = command.env(MANAGER_ENV, format!("{}", unsafe { libc::getpid() }));
    let err = comm.exec();
    match err.raw_os_error() {
        Some(e) => {
            log::error!("MANAGER exit err:{:?}", e);
            exit(e);
        }
        None => exit(0),
    }
}

fn execarg_build_default() -> (String, Vec<String>) {
    let path = env::current_exe().unwrap();
    let str_path = String::from(path.to_str().unwrap());

    let mut argv = [].to_vec();
    let args: Vec<String> = env::args().collect();
    if args.len() >= 2 {
        argv = args[1..].to_vec();
    }
    (str_path, argv)
}

extern "C" fn crash_reexec(_signo: c_int, siginfo: *mut libc::siginfo_t, _con: *mut libc::c_void) {
    unsafe {
        if (*siginfo).si_pid() == getppid() {
            let args: Vec<String> = env::args().collect();
            do_reexecute(&args, false);
        }
    };
}

extern "C" fn crash_none(_signo: c_int, _siginfo: *mut libc::siginfo_t, _con: *mut libc::c_void) {
    // nothing to do.
}

fn register_reexec_signal(enable: bool) {
    let manager_signal: Signal = Signal::SIGABRT;
    let handler = match enable {
        true => SigHandler::SigAction(crash_reexec),
        false => SigHandler::SigAction(crash_none),
    };
    let flags = SaFlags::SA_NODEFER;
    let action = SigAction::new(handler, flags, SigSet::empty());

    unsafe { signal::sigaction(manager_signal, &action).expect("failed to set signal handler") };
}

fn ignore_all_signals() {
    /* nix::sys::signal::Signal doesn't support SIGRTMAX, use libc. */
    for sig in 1..libc::SIGRTMAX() + 1 {
        if [libc::SIGKILL, libc::SIGSTOP].contains(&sig) {
            continue;
        }

        let mut sig_action: libc::sigaction = unsafe { std::mem::zeroed() };
        sig_action.sa_flags = libc::SA_RESTART;
        sig_action.sa_sigaction = libc::SIG_IGN;
        let r = unsafe { libc::sigaction(sig, &sig_action, std::ptr::null_mut()) };
        if r < 0 {
            log::warn!(
                "Failed to ignore signal {}: {}",
                sig,
                nix::Error::from_i32(r)
            );
        }
    }
}
