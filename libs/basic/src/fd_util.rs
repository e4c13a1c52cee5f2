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

//! fd flag helpers
use crate::error::*;
use nix::fcntl::{fcntl, FcntlArg, FdFlag, OFlag};
use std::os::unix::io::RawFd;

/// check whether the fd refers to something open
pub fn fd_is_valid(fd: RawFd) -> bool {
    fcntl(fd, FcntlArg::F_GETFD).is_ok()
}

/// switch O_NONBLOCK on or off
pub fn fd_nonblock(fd: RawFd, nonblock: bool) -> Result<()> {
    let flags = OFlag::from_bits_truncate(fcntl(fd, FcntlArg::F_GETFL)?);
    let new_flags = if nonblock {
        flags | OFlag::O_NONBLOCK
    } else {
        flags & !OFlag::O_NONBLOCK
    };
    fcntl(fd, FcntlArg::F_SETFL(new_flags))?;
    Ok(())
}

/// switch FD_CLOEXEC on or off; fds crossing an exec must turn it off
pub fn fd_cloexec(fd: RawFd, cloexec: bool) -> Result<()> {
    let flags = FdFlag::from_bits_truncate(fcntl(fd, FcntlArg::F_GETFD)?);
    let new_flags = if cloexec {
        flags | FdFlag::FD_CLOEXEC
    } else {
        flags & !FdFlag::FD_CLOEXEC
    };
    fcntl(fd, FcntlArg::F_SETFD(new_flags))?;
    Ok(())
}

/// close the fd, swallowing EBADF and friends
pub fn close(fd: RawFd) {
    if let Err(e) = nix::unistd::close(fd) {
        log::warn!("Error when closing fd {}: {}", fd, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fd_flags() {
        let file = tempfile::tempfile().unwrap();
        let fd = std::os::unix::io::AsRawFd::as_raw_fd(&file);
        assert!(fd_is_valid(fd));
        fd_nonblock(fd, true).unwrap();
        fd_nonblock(fd, false).unwrap();
        fd_cloexec(fd, false).unwrap();
        fd_cloexec(fd, true).unwrap();
        assert!(!fd_is_valid(-1));
    }
}
