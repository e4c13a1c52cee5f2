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

//! process probing helpers
use nix::sys::signal::kill;
use nix::unistd::Pid;

/// pid 0 and negative pids never name a process here
pub fn valid_pid(pid: Pid) -> bool {
    pid.as_raw() > 0
}

/// whether the process still exists (it may well be a zombie)
pub fn alive(pid: Pid) -> bool {
    if !valid_pid(pid) {
        return false;
    }

    // signal 0 performs the permission checks without sending anything
    match kill(pid, None) {
        Ok(_) => true,
        Err(nix::errno::Errno::EPERM) => true,
        Err(_) => false,
    }
}

/// read the comm of a process, None when it is gone
pub fn get_process_comm(pid: Pid) -> Option<String> {
    std::fs::read_to_string(format!("/proc/{}/comm", pid.as_raw()))
        .map(|s| s.trim_end().to_string())
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alive() {
        assert!(alive(nix::unistd::getpid()));
        assert!(!alive(Pid::from_raw(0)));
        assert!(!alive(Pid::from_raw(-1)));
    }

    #[test]
    fn test_get_process_comm() {
        assert!(get_process_comm(nix::unistd::getpid()).is_some());
        assert!(get_process_comm(Pid::from_raw(0)).is_none());
    }
}
