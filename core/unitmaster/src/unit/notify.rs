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

use super::datastore::UnitDb;
use basic::fd_util;
use constants::{INVALID_FD, NOTIFY_SOCKET};
use core::error::*;
use event::{EventState, EventType, Events, Source};
use nix::cmsg_space;
use nix::errno::Errno;
use nix::sys::socket::{
    self, sockopt, AddressFamily, MsgFlags, RecvMsg, SockFlag, SockType, UnixAddr, UnixCredentials,
};
use nix::sys::stat::{self, Mode};
use nix::unistd::Pid;
use std::{
    cell::Cell, collections::HashMap, fs, io::IoSliceMut, os::unix::prelude::RawFd, path::PathBuf,
    rc::Rc,
};

/// The datagram socket units report READY=/STATUS=/... messages on.
pub(super) struct NotifyManager {
    // associated objects
    events: Rc<Events>,

    // owned objects
    notify: Rc<Notify>,
}

impl NotifyManager {
    pub(super) fn new(eventr: &Rc<Events>, dbr: &Rc<UnitDb>) -> NotifyManager {
        NotifyManager {
            events: Rc::clone(eventr),
            notify: Rc::new(Notify::new(dbr, PathBuf::from(NOTIFY_SOCKET))),
        }
    }

    pub(super) fn startup(&self, inherited: Option<RawFd>) -> Result<()> {
        // take over the socket surviving the re-execution, or open a fresh one
        match inherited {
            Some(fd) => self.notify.fd.set(fd),
            None => self.notify.open_socket().context(NixSnafu)?,
        }

        // event
        self.events.add_source(self.notify.clone()).unwrap();
        self.events
            .set_enabled(self.notify.clone(), EventState::On)
            .unwrap();

        Ok(())
    }

    pub(super) fn notify_sock(&self) -> Option<PathBuf> {
        Some(self.notify.sock_path.clone())
    }

    pub(super) fn rawfd(&self) -> RawFd {
        self.notify.fd.get()
    }
}

const NOTIFY_INVALID_PID: libc::pid_t = -1;

struct Notify {
    // associated objects
    db: Rc<UnitDb>,

    // owned objects
    sock_path: PathBuf,
    fd: Cell<RawFd>,
}

impl Notify {
    fn new(dbr: &Rc<UnitDb>, sock_path: PathBuf) -> Notify {
        Notify {
            db: Rc::clone(dbr),
            sock_path,
            fd: Cell::new(INVALID_FD),
        }
    }

    // process reentrant
    fn open_socket(&self) -> Result<(), Errno> {
        // process reentrant protection
        if self.fd.get() >= 0 {
            return Ok(());
        }

        let fd = socket::socket(
            AddressFamily::Unix,
            SockType::Datagram,
            SockFlag::SOCK_CLOEXEC | SockFlag::SOCK_NONBLOCK,
            None,
        )?;
        log::debug!("notify listend fd is: {}", fd);

        if let Some(parent) = self.sock_path.parent() {
            fs::create_dir_all(parent).map_err(|_e| Errno::EINVAL)?;
        }
        let unix_addr = UnixAddr::new(&self.sock_path)?;
        if let Err(e) = nix::unistd::unlink(&self.sock_path) {
            log::warn!("unlink path failed: {:?}, error: {}", self.sock_path, e);
        }

        // create the notify socket with mode 666
        let old_mask = stat::umask(Mode::from_bits_truncate(!0o666));
        let ret = socket::bind(fd, &unix_addr);
        let _ = stat::umask(old_mask);
        if let Err(e) = ret {
            log::error!("Failed to bind socket {:?}: {}", self.sock_path, e);
            return Err(e);
        }

        socket::setsockopt(fd, sockopt::PassCred, &true)?;
        if let Err(e) = basic::socket::set_receive_buffer(fd, 1024 * 1024 * 8) {
            log::error!("Failed to set the notify socket receive buffer: {}", e);
        }

        self.fd.set(fd);
        Ok(())
    }

    fn notify_dispatch(&self) -> Result<i32> {
        let flags = MsgFlags::MSG_DONTWAIT | MsgFlags::MSG_CMSG_CLOEXEC | MsgFlags::MSG_TRUNC;

        // peek the sender first, only then consume the datagram
        let pid = self.peek_sender(flags)?;
        let unit = self.db.get_unit_by_pid(Pid::from_raw(pid));

        let mut buffer = [0u8; 4096];
        let mut iov = [IoSliceMut::new(&mut buffer)];
        let mut space = cmsg_space!(libc::ucred, RawFd);
        let msgs = socket::recvmsg::<()>(self.fd.get(), &mut iov, Some(&mut space), flags)
            .context(NixSnafu)?;
        let meta = NotifyMeta::from_recvmsg(&msgs)?;

        // check: peek == pop
        if meta.pid() != pid {
            log::error!("the received notify message has been destroyed");
            return Err(Error::Other {
                msg: "the received notify message has been destroyed".to_string(),
            });
        }

        let ucred = meta.cred.unwrap();
        let contents = String::from_utf8(buffer.to_vec()).unwrap();
        let mut messages = HashMap::new();
        for line in contents.lines() {
            // lines which are not exactly KEY=VALUE are dropped
            let mut fields = line.split('=').map(|s| s.trim_end_matches(char::from(0)));
            if let (Some(key), Some(value), None) = (fields.next(), fields.next(), fields.next()) {
                messages.insert(key, value.trim_end());
            }
        }
        log::debug!("[notify] ucred: {:?}, messages: {:?}", &ucred, messages);

        // action
        if let Some(u) = unit {
            log::debug!("[notify] unit: {:?}", u.id());
            let _ = u.notify_message(&ucred, &messages, meta.fds);
        }

        Ok(0)
    }

    fn peek_sender(&self, flags: MsgFlags) -> Result<libc::pid_t> {
        let mut buffer = [0u8; 4096];
        let mut iov = [IoSliceMut::new(&mut buffer)];
        let mut space = cmsg_space!(libc::ucred, RawFd);

        let peek_flags = flags | MsgFlags::MSG_PEEK;
        let msgs = socket::recvmsg::<()>(self.fd.get(), &mut iov, Some(&mut space), peek_flags)
            .context(NixSnafu)?;
        let meta = NotifyMeta::from_recvmsg(&msgs)?;

        // peeked fds are delivered again on the real receive
        for fd in meta.fds.iter() {
            fd_util::close(*fd);
        }

        let pid = meta.pid();
        if pid < 0 {
            log::error!("there is no credentials in the received notify message");
            return Err(Error::Other {
                msg: "no credentials in the received notify message".to_string(),
            });
        }

        Ok(pid)
    }
}

/// Sender credentials and passed fds of one received datagram.
struct NotifyMeta {
    cred: Option<UnixCredentials>,
    fds: Vec<RawFd>,
}

impl NotifyMeta {
    fn from_recvmsg(msgs: &RecvMsg<()>) -> Result<NotifyMeta> {
        if msgs.flags.contains(MsgFlags::MSG_CTRUNC) {
            return Err(Error::Nix {
                source: nix::Error::EXFULL,
            });
        }

        let mut meta = NotifyMeta {
            cred: None,
            fds: Vec::new(),
        };
        for msg in msgs.cmsgs() {
            match msg {
                socket::ControlMessageOwned::ScmRights(fds) => meta.fds = fds,
                socket::ControlMessageOwned::ScmCredentials(cred) => meta.cred = Some(cred),
                _ => log::debug!("unexpected control message"),
            }
        }
        Ok(meta)
    }

    fn pid(&self) -> libc::pid_t {
        self.cred
            .as_ref()
            .map(|c| c.pid())
            .unwrap_or(NOTIFY_INVALID_PID)
    }
}

impl Source for Notify {
    fn fd(&self) -> RawFd {
        self.fd.get()
    }

    fn event_type(&self) -> EventType {
        EventType::Io
    }

    fn epoll_event(&self) -> u32 {
        (libc::EPOLLIN) as u32
    }

    fn priority(&self) -> i8 {
        -8i8
    }

    fn dispatch(&self, _e: &Events) -> i32 {
        self.notify_dispatch().unwrap_or(-1)
    }

    fn token(&self) -> u64 {
        let data: u64 = unsafe { std::mem::transmute(self) };
        data
    }
}
