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

use super::CgFlags;
use crate::error::*;
use crate::CgType;
use nix::libc;
use nix::sys::signal::Signal;
use nix::sys::statfs::{statfs, FsType};
use nix::unistd::Pid;
use std::collections::HashSet;
use std::fs;
use std::fs::File;
use std::io;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::path::PathBuf;
use walkdir::{DirEntry, WalkDir};

#[cfg(target_env = "musl")]
type FsTypeT = libc::c_ulong;

#[cfg(not(target_env = "musl"))]
type FsTypeT = libc::c_long;

/// the base dir of the cgroup
pub const CG_BASE_DIR: &str = "/sys/fs/cgroup";
const CGROUP_PROCS: &str = "cgroup.procs";

const CG_UNIFIED_DIR: &str = "/sys/fs/cgroup/unified";
const CG_V1_DIR: &str = "/sys/fs/cgroup/unitmaster";
const CG_SYSTEMD_DIR: &str = "/sys/fs/cgroup/systemd";

/// return the cgroup mounted type, if not support cgroup return CgroupErr.
pub fn cg_type() -> Result<CgType> {
    let stat = statfs(CG_BASE_DIR).map_err(|_| Error::NotSupported)?;

    if stat.filesystem_type() == FsType(libc::CGROUP2_SUPER_MAGIC as FsTypeT) {
        return Ok(CgType::UnifiedV2);
    }

    if stat.filesystem_type() != FsType(libc::TMPFS_MAGIC as FsTypeT) {
        return Err(Error::NotSupported);
    }

    if let Ok(s) = statfs(CG_UNIFIED_DIR) {
        if s.filesystem_type() == FsType(libc::CGROUP2_SUPER_MAGIC as FsTypeT) {
            return Ok(CgType::UnifiedV1);
        }
    }

    if let Ok(s) = statfs(CG_V1_DIR) {
        if s.filesystem_type() == FsType(libc::CGROUP_SUPER_MAGIC as FsTypeT) {
            return Ok(CgType::Legacy);
        }
    }

    if let Ok(s) = statfs(CG_SYSTEMD_DIR) {
        if s.filesystem_type() == FsType(libc::CGROUP_SUPER_MAGIC as FsTypeT) {
            return Ok(CgType::LegacySystemd);
        } else {
            return Ok(CgType::None);
        }
    }

    Err(Error::NotSupported)
}

fn cgtype_to_path(cg_type: CgType) -> &'static str {
    match cg_type {
        CgType::None => "",
        CgType::UnifiedV1 => CG_UNIFIED_DIR,
        CgType::UnifiedV2 => CG_BASE_DIR,
        CgType::Legacy => CG_V1_DIR,
        CgType::LegacySystemd => CG_SYSTEMD_DIR,
    }
}

fn cg_abs_path(cg_path: &Path, suffix: &Path) -> Result<PathBuf> {
    let cg_type = cg_type()?;
    if cg_type == CgType::None {
        return Err(Error::NotFound {
            what: "cgroup is not mounted".to_string(),
        });
    }
    let base_path = cgtype_to_path(cg_type);
    let path_buf: PathBuf = PathBuf::from(base_path);
    Ok(path_buf.join(cg_path).join(suffix))
}

/// attach the pid to the controller which is depend the cg_path
pub fn cg_attach(pid: Pid, cg_path: &Path) -> Result<()> {
    log::debug!("attach pid {} to path {:?}", pid, cg_path);
    let cg_procs = cg_abs_path(cg_path, &PathBuf::from(CGROUP_PROCS))?;

    if !cg_procs.exists() {
        return Err(Error::NotFound {
            what: cg_procs.to_string_lossy().to_string(),
        });
    }

    let p = if pid == Pid::from_raw(0) {
        nix::unistd::getpid()
    } else {
        pid
    };

    fs::write(cg_procs, format!("{}\n", p)).context(IoSnafu)?;

    Ok(())
}

/// create the cg_path which is relative to cg_abs_path.
pub fn cg_create(cg_path: &Path) -> Result<()> {
    log::debug!("cgroup create path {:?}", cg_path);
    let abs_cg_path: PathBuf = cg_abs_path(cg_path, &PathBuf::from(""))?;
    fs::create_dir_all(&abs_cg_path).context(IoSnafu)?;

    Ok(())
}

/// escape the cg_path which is conflicts with controller name.
pub fn cg_escape(id: &str) -> &str {
    id
}

fn get_pids(cg_path: &Path, item: &str) -> Result<Vec<Pid>> {
    let path = cg_abs_path(cg_path, &PathBuf::from(item))?;
    let file = fs::OpenOptions::new()
        .read(true)
        .open(path)
        .context(IoSnafu)?;

    let reader = BufReader::new(file);
    let mut pids = Vec::new();
    for line in reader.lines() {
        let line = line.context(IoSnafu)?;
        let pid = Pid::from_raw(
            line.trim_matches(|c: char| !c.is_numeric())
                .parse::<i32>()
                .context(ParseIntSnafu)?,
        );

        pids.push(pid);
    }

    Ok(pids)
}

/// return all the pids in the cg_path, read from cgroup.procs.
pub fn cg_get_pids(cg_path: &Path) -> Vec<Pid> {
    match get_pids(cg_path, CGROUP_PROCS) {
        Ok(pids) => pids,
        Err(_) => Vec::new(),
    }
}

fn remove_dir(cg_path: &Path) -> Result<()> {
    if !cg_path.is_absolute() {
        log::error!("We only support remove absolute directory.");
        return Err(Error::NotSupported);
    }
    /* Note: We can't just call fs::remove_dir_all here. This is because /sys/fs/cgroup
     * is a pseudo file system, we can only remove directory, but can't remove regular
     * file. */
    let read_dir = match cg_path.read_dir() {
        Err(e) => {
            log::error!("Failed to read dir: {:?}", cg_path);
            return Err(Error::Io { source: e });
        }
        Ok(v) => v,
    };

    for entry in read_dir {
        let entry = match entry {
            Err(e) => {
                log::error!("Failed to get directory entry: {}", e);
                return Err(Error::Io { source: e });
            }
            Ok(v) => v,
        };
        let entry_file_type = match entry.file_type() {
            Err(e) => {
                log::error!(
                    "Failed to get the file type of {:?}: {}",
                    entry.file_name(),
                    e
                );
                return Err(Error::Io { source: e });
            }
            Ok(v) => v,
        };
        if !entry_file_type.is_dir() {
            continue;
        }
        remove_dir(&entry.path())?;
    }

    /* Sometimes there are still tasks in cg_path, and rmdir will return EBUSY,
     * we wait 10 us for 10 times. */
    let mut try_times = 0;
    loop {
        let e = match fs::remove_dir(cg_path) {
            Ok(()) => {
                log::debug!("Successfully removed {:?}", cg_path);
                return Ok(());
            }
            Err(e) => e,
        };
        let os_errno = match e.raw_os_error() {
            None => return Err(Error::Io { source: e }),
            Some(v) => v,
        };
        if os_errno == libc::EBUSY && try_times < 10 {
            std::thread::sleep(std::time::Duration::from_micros(10));
            try_times += 1;
            continue;
        }
        log::error!("Failed to remove {:?}: {}", cg_path, e);
        return Err(Error::Io { source: e });
    }
}

fn cg_kill_process(
    cg_path: &Path,
    signal: Signal,
    mut flags: CgFlags,
    pids: HashSet<Pid>,
    item: &str,
) -> Result<()> {
    if matches!(signal, Signal::SIGCONT | Signal::SIGKILL) {
        flags &= !CgFlags::SIGCONT;
    }

    let path = cg_abs_path(cg_path, &PathBuf::from(item))?;
    let file = fs::OpenOptions::new()
        .read(true)
        .open(path)
        .context(IoSnafu)?;

    let cur_pid = nix::unistd::getpid();

    let reader = BufReader::new(file);
    for line in reader.lines() {
        let line = line.context(IoSnafu)?;
        let pid = Pid::from_raw(
            line.trim_matches(|c: char| !c.is_numeric())
                .parse::<i32>()
                .context(ParseIntSnafu)?,
        );

        if flags.contains(CgFlags::IGNORE_SELF) && cur_pid == pid {
            continue;
        }

        if pids.contains(&pid) {
            continue;
        }

        log::debug!(
            "kill pid {} in cgroup {:?} with signal {}",
            pid,
            cg_path,
            signal
        );
        match nix::sys::signal::kill(pid, signal) {
            Ok(_) => {
                if flags.contains(CgFlags::SIGCONT)
                    && nix::sys::signal::kill(pid, Signal::SIGCONT).is_err()
                {
                    log::debug!("send SIGCONT to cgroup process failed");
                }
            }
            Err(e) => {
                log::warn!("Failed to kill process in cgroup: error: {}", e);
                return Err(Error::KillProcess {
                    what: e.to_string(),
                });
            }
        }
    }

    Ok(())
}

fn cg_kill(cg_path: &Path, signal: Signal, flags: CgFlags, pids: HashSet<Pid>) -> Result<()> {
    cg_kill_process(cg_path, signal, flags, pids, CGROUP_PROCS)?;

    Ok(())
}

/// kill all the process in the cg_path, and remove the dir of the cg_path.
/// cg_path: the controller that will be killed.
/// signal: send signal to the process in the cgroup.
/// flags: the flags that will be operated on the controller.
/// pids: not kill the process which is in the pids.
pub fn cg_kill_recursive(
    cg_path: &Path,
    signal: Signal,
    flags: CgFlags,
    pids: HashSet<Pid>,
) -> Result<()> {
    cg_kill(cg_path, signal, flags, pids)?;

    if flags.contains(CgFlags::REMOVE) {
        let abs_cg_path = cg_abs_path(cg_path, &PathBuf::from(""))?;
        remove_dir(&abs_cg_path)?;
    }

    Ok(())
}

/// return the supported controllers, read from /proc/cgroups, if failed return the IOError.
pub fn cg_controllers() -> Result<Vec<String>> {
    let file = File::open("/proc/cgroups").context(IoSnafu)?;

    let lines = io::BufReader::new(file).lines();
    let mut controllers = Vec::new();

    for line in lines.flatten() {
        if line.starts_with('#') {
            continue;
        }

        let r: Vec<&str> = line.split_whitespace().collect();
        if r.len() != 4 {
            continue;
        }

        // the controller was disabled
        if r[3] != "1" {
            continue;
        }
        controllers.push(r[0].to_string());
    }

    Ok(controllers)
}

fn cg_read_event(cg_path: &Path, event: &str) -> Result<String> {
    let events_path = cg_abs_path(cg_path, &PathBuf::from("cgroup.events"))?;
    let file = File::open(events_path).context(IoSnafu)?;
    let reader = BufReader::new(file);

    for line in reader.lines() {
        let content = line.context(IoSnafu)?;
        let words: Vec<String> = content.split_whitespace().map(|c| c.to_string()).collect();

        if words.len() != 2 {
            continue;
        }

        if words[0].trim() != event {
            continue;
        }

        return Ok(words[1].trim().to_string());
    }

    Ok("".to_string())
}

fn cg_is_empty(cg_path: &Path) -> bool {
    let procs_path = match cg_abs_path(cg_path, &PathBuf::from(CGROUP_PROCS)) {
        Ok(v) => v,
        Err(_) => return true,
    };

    if !procs_path.exists() {
        return true;
    }

    if let Ok(pids) = get_pids(cg_path, CGROUP_PROCS) {
        if pids.is_empty() {
            return true;
        }
    }

    false
}

fn is_dir(entry: &DirEntry) -> bool {
    if entry.file_type().is_dir() {
        return false;
    }

    true
}

/// whether the cg_path cgroup is empty, return true if empty.
pub fn cg_is_empty_recursive(cg_path: &Path) -> Result<bool> {
    if cg_path == Path::new("") || cg_path == Path::new("/") {
        return Ok(true);
    }

    if !cg_is_empty(cg_path) {
        return Ok(false);
    }

    match cg_type()? {
        CgType::UnifiedV1 | CgType::UnifiedV2 => match cg_read_event(cg_path, "populated") {
            Ok(v) => {
                log::debug!("cg read event value:{}", v);
                Ok(v == "0")
            }
            Err(e) => match e {
                Error::NotFound { what: _ } => Ok(true),
                _ => Err(e),
            },
        },
        CgType::Legacy | CgType::LegacySystemd => {
            let cgroup_path = cg_abs_path(cg_path, &PathBuf::from(""))?;

            for entry in WalkDir::new(cgroup_path)
                .min_depth(1)
                .max_depth(1)
                .into_iter()
                .filter_entry(|e| !is_dir(e))
            {
                let entry = match entry {
                    Ok(v) => v,
                    Err(_) => continue,
                };

                let sub_cg = cg_path.join(entry.file_name());
                if !cg_is_empty_recursive(&sub_cg)? {
                    return Ok(false);
                }
            }

            Ok(true)
        }
        CgType::None => Ok(false),
    }
}

/// create cgroup path and attach pid to this cgroup
pub fn cg_create_and_attach(cg_path: &Path, pid: Pid) -> Result<bool> {
    cg_create(cg_path)?;

    cg_attach(pid, cg_path)?;

    Ok(true)
}

fn cg_read_to_string(cg_path: &Path, item: &str) -> Result<String> {
    let path = cg_abs_path(cg_path, &PathBuf::from(item))?;
    if !path.exists() {
        return Err(Error::NotFound {
            what: path.to_string_lossy().to_string(),
        });
    }
    fs::read_to_string(path).context(IoSnafu)
}

fn parse_cpu_stat_usec(content: &str) -> Option<u64> {
    for line in content.lines() {
        let mut it = line.split_whitespace();
        if it.next() != Some("usage_usec") {
            continue;
        }
        return it.next().and_then(|v| v.parse::<u64>().ok());
    }
    None
}

/// the cpu time consumed by the cgroup in microseconds, read from cpu.stat.
/// Only the unified hierarchy carries the file.
pub fn cg_cpu_usage(cg_path: &Path) -> Result<u64> {
    match cg_type()? {
        CgType::UnifiedV1 | CgType::UnifiedV2 => {}
        _ => return Err(Error::NotSupported),
    }

    let content = cg_read_to_string(cg_path, "cpu.stat")?;
    parse_cpu_stat_usec(&content).ok_or(Error::DataFormat {
        data: "cpu.stat without usage_usec".to_string(),
    })
}

/// io.stat counters of one cgroup, summed over all devices
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CgIoStat {
    /// bytes read
    pub rbytes: u64,
    /// bytes written
    pub wbytes: u64,
    /// read operations
    pub rios: u64,
    /// write operations
    pub wios: u64,
}

fn parse_io_stat(content: &str) -> CgIoStat {
    let mut stat = CgIoStat::default();
    for line in content.lines() {
        // $MAJ:$MIN rbytes=N wbytes=N rios=N wios=N ...
        for field in line.split_whitespace().skip(1) {
            if let Some(v) = field.strip_prefix("rbytes=") {
                stat.rbytes += v.parse::<u64>().unwrap_or(0);
            } else if let Some(v) = field.strip_prefix("wbytes=") {
                stat.wbytes += v.parse::<u64>().unwrap_or(0);
            } else if let Some(v) = field.strip_prefix("rios=") {
                stat.rios += v.parse::<u64>().unwrap_or(0);
            } else if let Some(v) = field.strip_prefix("wios=") {
                stat.wios += v.parse::<u64>().unwrap_or(0);
            }
        }
    }
    stat
}

/// the bytes and operations the cgroup read and wrote, summed over all
/// devices of io.stat.
pub fn cg_io_stat(cg_path: &Path) -> Result<CgIoStat> {
    match cg_type()? {
        CgType::UnifiedV1 | CgType::UnifiedV2 => {}
        _ => return Err(Error::NotSupported),
    }

    let content = cg_read_to_string(cg_path, "io.stat")?;
    Ok(parse_io_stat(&content))
}

fn parse_memory_events(content: &str, event: &str) -> u64 {
    for line in content.lines() {
        let mut it = line.split_whitespace();
        if it.next() != Some(event) {
            continue;
        }
        return it.next().and_then(|v| v.parse::<u64>().ok()).unwrap_or(0);
    }
    0
}

/// how many times the kernel oom killer struck inside the cgroup,
/// read from memory.events.
pub fn cg_oom_kill_count(cg_path: &Path) -> Result<u64> {
    match cg_type()? {
        CgType::UnifiedV1 | CgType::UnifiedV2 => {}
        _ => return Err(Error::NotSupported),
    }

    let content = cg_read_to_string(cg_path, "memory.events")?;
    Ok(parse_memory_events(&content, "oom_kill"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cgroup() {
        use crate::CgFlags;
        use nix::sys::signal::Signal;
        use nix::unistd::{fork, ForkResult};
        use std::path::PathBuf;
        use std::thread;
        use std::{collections::HashSet, time::Duration};

        if !nix::unistd::getuid().is_root() {
            println!("Unprivileged users cannot attach processes to cgroups, skipping.");
            return;
        }

        let cg_type = if let Ok(cg_type) = super::cg_type() {
            cg_type
        } else {
            println!("cgroup is not supported");
            return;
        };

        let cg_path = PathBuf::from("unitmaster-test.slice");
        let ret = super::cg_create(&cg_path);
        assert!(ret.is_ok());

        let base_path = super::cgtype_to_path(cg_type);
        let path_buf: PathBuf = PathBuf::from(base_path);

        if let Ok(p) = super::cg_abs_path(&cg_path, &PathBuf::from("")) {
            assert_eq!(p, path_buf.join(&cg_path).join(PathBuf::from("")),)
        }

        let t_thread = unsafe { fork() };

        let pid = match t_thread {
            Ok(ForkResult::Parent { child }) => {
                let ret = super::cg_attach(child, &cg_path);
                assert!(ret.is_ok());
                child
            }
            Ok(ForkResult::Child) => {
                thread::sleep(Duration::from_secs(78));
                std::process::exit(0);
            }
            Err(_e) => return,
        };

        let pids = super::cg_get_pids(&cg_path);
        assert_ne!(pids.len(), 0);
        assert!(pids.contains(&pid));

        let ret = super::cg_is_empty_recursive(&cg_path);
        assert!(ret.is_ok());
        assert!(!ret.unwrap());

        let ret = super::cg_kill_recursive(
            &cg_path,
            Signal::SIGKILL,
            CgFlags::IGNORE_SELF | CgFlags::REMOVE,
            HashSet::new(),
        );
        assert!(ret.is_ok());

        thread::sleep(Duration::from_secs(1));

        let ret = super::cg_is_empty_recursive(&cg_path);
        assert!(ret.is_ok());
        assert!(ret.unwrap());

        let pids = super::cg_get_pids(&cg_path);
        assert_eq!(pids.len(), 0);
        assert!(!pids.contains(&pid));
    }

    #[test]
    fn test_parse_cpu_stat() {
        let content = "usage_usec 144405\nuser_usec 96105\nsystem_usec 48300\n";
        assert_eq!(parse_cpu_stat_usec(content), Some(144405));

        assert_eq!(parse_cpu_stat_usec("user_usec 96105\n"), None);
        assert_eq!(parse_cpu_stat_usec(""), None);
    }

    #[test]
    fn test_parse_io_stat() {
        let content = "8:0 rbytes=180224 wbytes=8192 rios=4 wios=2 dbytes=0 dios=0\n\
                       253:0 rbytes=1024 wbytes=4096 rios=1 wios=1 dbytes=0 dios=0\n";
        let stat = parse_io_stat(content);
        assert_eq!(stat.rbytes, 181248);
        assert_eq!(stat.wbytes, 12288);
        assert_eq!(stat.rios, 5);
        assert_eq!(stat.wios, 3);
        assert_eq!(parse_io_stat(""), CgIoStat::default());
    }

    #[test]
    fn test_parse_memory_events() {
        let content = "low 0\nhigh 0\nmax 0\noom 3\noom_kill 2\n";
        assert_eq!(parse_memory_events(content, "oom_kill"), 2);
        assert_eq!(parse_memory_events(content, "oom"), 3);
        assert_eq!(parse_memory_events(content, "missing"), 0);
    }
}
