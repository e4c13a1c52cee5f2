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

//! socket option helpers
use crate::error::*;
use nix::{
    errno::Errno,
    sys::socket::{self, sockopt},
};
use std::os::unix::prelude::RawFd;

/// enable or disable SO_PASSCRED on the socket
pub fn set_pass_cred(fd: RawFd, v: bool) -> Result<()> {
    socket::setsockopt(fd, sockopt::PassCred, &v).context(NixSnafu)
}

/// set the receive buffer of the socket to v bytes, falling back to
/// SO_RCVBUFFORCE when the kernel limit got in the way
pub fn set_receive_buffer(fd: RawFd, v: usize) -> Result<()> {
    /* Type of value is usize, so the v should smaller than the half of the value
     *  as the value = 2 * n.
     */
    if v > (std::isize::MAX) as usize {
        return Err(Error::Nix {
            source: Errno::ERANGE,
        });
    }

    socket::setsockopt(fd, sockopt::RcvBuf, &v).context(NixSnafu)?;

    // The kernel doubles the value in the setsockopt, so we check that with 2 * v.
    match socket::getsockopt(fd, sockopt::RcvBuf) {
        Ok(value) => {
            if value != 2 * v {
                return socket::setsockopt(fd, sockopt::RcvBufForce, &v).context(NixSnafu);
            }
            Ok(())
        }
        Err(e) => Err(Error::Nix { source: e }),
    }
}
