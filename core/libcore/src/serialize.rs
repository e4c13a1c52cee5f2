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

//! Line oriented state snapshot written around daemon re-execution.
//!
//! A snapshot is a sequence of `key=value` records. The manager preamble
//! comes first; each unit block is introduced by a `unit=<id>` record and
//! closed by a blank line. Values must stay on one line, keys must not
//! contain `=`. File descriptors never enter the text, they are pushed into
//! the [FdStore] and referenced by index.

use crate::error::*;
use constants::INVALID_FD;
use nix::fcntl::{fcntl, FcntlArg};
use nix::unistd;
use std::cell::RefCell;
use std::io::{BufRead, Write};
use std::os::unix::io::RawFd;

/// fds packed by [FdStore::pack] occupy a contiguous range starting right
/// above stderr, index i lands on fd FDSTORE_FIRST_FD + i after the exec
pub const FDSTORE_FIRST_FD: RawFd = 3;

/// one `key=value` line of a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    ///
    pub key: String,
    ///
    pub value: String,
}

/// writes snapshot records to any io sink
pub struct SnapshotWriter<W: Write> {
    inner: W,
}

impl<W: Write> SnapshotWriter<W> {
    ///
    pub fn new(inner: W) -> SnapshotWriter<W> {
        SnapshotWriter { inner }
    }

    /// append one record to the current block
    pub fn item(&mut self, key: &str, value: &str) -> Result<()> {
        if key.is_empty() || key.contains(&['=', '\n'][..]) || value.contains('\n') {
            return Err(Error::InvalidData);
        }
        writeln!(self.inner, "{}={}", key, value).context(IoSnafu)
    }

    /// close the running block and open the one of the given unit
    pub fn open_unit(&mut self, id: &str) -> Result<()> {
        self.inner.write_all(b"\n").context(IoSnafu)?;
        self.item("unit", id)
    }

    ///
    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush().context(IoSnafu)
    }
}

/// reads snapshot records back, blank separator lines are skipped
pub struct SnapshotReader<R: BufRead> {
    inner: R,
}

impl<R: BufRead> SnapshotReader<R> {
    ///
    pub fn new(inner: R) -> SnapshotReader<R> {
        SnapshotReader { inner }
    }

    /// the next record, None once the input is exhausted
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        loop {
            let mut line = String::new();
            let n = self.inner.read_line(&mut line).context(IoSnafu)?;
            if n == 0 {
                return Ok(None);
            }
            let line = line.trim_end_matches('\n');
            if line.is_empty() {
                continue;
            }
            match line.split_once('=') {
                None => return Err(Error::InvalidData),
                Some((key, value)) => {
                    return Ok(Some(Record {
                        key: key.to_string(),
                        value: value.to_string(),
                    }))
                }
            }
        }
    }
}

/// Descriptors that have to survive the re-execution. Snapshot records refer
/// to an entry by its index; [FdStore::pack] renumbers the fds into the range
/// the index scheme promises and drops close-on-exec right before the exec,
/// [FdStore::inherit] picks them up again on the other side.
#[derive(Debug, Default)]
pub struct FdStore {
    fds: RefCell<Vec<RawFd>>,
}

impl FdStore {
    ///
    pub fn new() -> FdStore {
        FdStore {
            fds: RefCell::new(Vec::new()),
        }
    }

    /// duplicate the fd into the store, the caller keeps its own copy;
    /// returns the index snapshot records should reference
    pub fn push(&self, fd: RawFd) -> Result<usize> {
        /* close-on-exec stays set until pack() runs, an exec that skips
         * packing must not leak the duplicates */
        let dup = fcntl(fd, FcntlArg::F_DUPFD_CLOEXEC(FDSTORE_FIRST_FD)).context(NixSnafu)?;
        let mut fds = self.fds.borrow_mut();
        fds.push(dup);
        Ok(fds.len() - 1)
    }

    ///
    pub fn len(&self) -> usize {
        self.fds.borrow().len()
    }

    ///
    pub fn is_empty(&self) -> bool {
        self.fds.borrow().is_empty()
    }

    /// take ownership of the fd at the given index; a second take of the
    /// same index fails and close_all no longer touches the entry
    pub fn take(&self, index: usize) -> Result<RawFd> {
        let mut fds = self.fds.borrow_mut();
        match fds.get_mut(index) {
            Some(fd) if *fd != INVALID_FD => {
                let v = *fd;
                *fd = INVALID_FD;
                Ok(v)
            }
            _ => Err(Error::InvalidData),
        }
    }

    /// renumber every stored fd onto FDSTORE_FIRST_FD..FDSTORE_FIRST_FD+n so
    /// the indices stay meaningful across execve; returns n
    pub fn pack(&self) -> Result<usize> {
        let mut fds = self.fds.borrow_mut();
        let n = fds.len();

        /* first move everything above the target window, otherwise dup2
         * below could clobber a stored fd that still waits for its turn */
        for fd in fds.iter_mut() {
            if *fd < FDSTORE_FIRST_FD + n as RawFd {
                let moved = fcntl(*fd, FcntlArg::F_DUPFD_CLOEXEC(FDSTORE_FIRST_FD + n as RawFd))
                    .context(NixSnafu)?;
                let _ = unistd::close(*fd);
                *fd = moved;
            }
        }

        for (i, fd) in fds.iter_mut().enumerate() {
            let target = FDSTORE_FIRST_FD + i as RawFd;
            /* dup2 leaves close-on-exec off for the duplicate */
            unistd::dup2(*fd, target).context(NixSnafu)?;
            let _ = unistd::close(*fd);
            *fd = target;
        }
        Ok(n)
    }

    /// rebuild the store in the re-executed manager from the packed range
    pub fn inherit(n: usize) -> FdStore {
        let mut fds = Vec::with_capacity(n);
        for i in 0..n {
            let fd = FDSTORE_FIRST_FD + i as RawFd;
            if basic::fd_util::fd_is_valid(fd) {
                let _ = basic::fd_util::fd_cloexec(fd, true);
                fds.push(fd);
            } else {
                log::warn!("Inherited fd store entry {} is not open, dropping it.", i);
                fds.push(INVALID_FD);
            }
        }
        FdStore {
            fds: RefCell::new(fds),
        }
    }

    /// close every fd that was not claimed with take
    pub fn close_all(&self) {
        for fd in self.fds.borrow_mut().iter_mut() {
            if *fd != INVALID_FD {
                if let Err(e) = unistd::close(*fd) {
                    log::warn!("Failed to close stored fd {}: {}", fd, e);
                }
                *fd = INVALID_FD;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_snapshot_round_trip() {
        let mut buf = Vec::new();
        let mut writer = SnapshotWriter::new(&mut buf);
        writer.item("version", "1").unwrap();
        writer.item("fd-store-size", "0").unwrap();
        writer.open_unit("foo.target").unwrap();
        writer.item("active-state", "active").unwrap();
        writer.open_unit("bar.scope").unwrap();
        writer.item("controller", "a=b=c").unwrap();
        writer.flush().unwrap();

        let mut reader = SnapshotReader::new(Cursor::new(buf));
        let mut records = Vec::new();
        while let Some(rec) = reader.next_record().unwrap() {
            records.push((rec.key, rec.value));
        }
        assert_eq!(
            records,
            vec![
                ("version".to_string(), "1".to_string()),
                ("fd-store-size".to_string(), "0".to_string()),
                ("unit".to_string(), "foo.target".to_string()),
                ("active-state".to_string(), "active".to_string()),
                ("unit".to_string(), "bar.scope".to_string()),
                ("controller".to_string(), "a=b=c".to_string()),
            ]
        );
    }

    #[test]
    fn test_snapshot_rejects_bad_records() {
        let mut buf = Vec::new();
        let mut writer = SnapshotWriter::new(&mut buf);
        assert!(writer.item("", "v").is_err());
        assert!(writer.item("a=b", "v").is_err());
        assert!(writer.item("key", "two\nlines").is_err());

        let mut reader = SnapshotReader::new(Cursor::new(b"no separator\n".to_vec()));
        assert!(reader.next_record().is_err());
    }

    #[test]
    fn test_fd_store_push_take() {
        let (r, w) = nix::unistd::pipe().unwrap();
        let store = FdStore::new();
        let idx = store.push(r).unwrap();
        assert_eq!(store.len(), 1);

        let stored = store.take(idx).unwrap();
        assert_ne!(stored, r);
        assert!(basic::fd_util::fd_is_valid(stored));
        /* the same index cannot be claimed twice */
        assert!(store.take(idx).is_err());
        assert!(store.take(7).is_err());

        let _ = nix::unistd::close(stored);
        let _ = nix::unistd::close(r);
        let _ = nix::unistd::close(w);
    }

    #[test]
    fn test_fd_store_close_all() {
        let (r, w) = nix::unistd::pipe().unwrap();
        let store = FdStore::new();
        let idx = store.push(r).unwrap();
        let dup = {
            /* peek at the duplicate before close_all drops it */
            let fds = store.fds.borrow();
            fds[idx]
        };
        store.close_all();
        assert!(!basic::fd_util::fd_is_valid(dup));
        assert!(store.take(idx).is_err());

        let _ = nix::unistd::close(r);
        let _ = nix::unistd::close(w);
    }
}
