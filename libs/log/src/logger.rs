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

//! Concrete log targets: console, kmsg and rotated file.
use log::Log;
use std::{
    fs::{self, File, OpenOptions},
    io::Write,
    io::{Error, ErrorKind},
    os::unix::prelude::{OpenOptionsExt, PermissionsExt},
    path::{Path, PathBuf},
    sync::Mutex,
};

pub use log::Level;

/// Logger instances must know how to reopen their backing resources, the
/// daemon re-execs and reloads without restarting the process tree.
pub trait ReInit: Log {
    /// Define how a logger instance reinitializes.
    fn reinit(&self) {}
}

fn write_msg_common(writer: &mut impl Write, module: &str, msg: String) {
    let time: libc::time_t = unsafe { libc::time(std::ptr::null_mut()) };
    let now = unsafe { libc::localtime(&time) };
    let now_str = unsafe {
        format!(
            "{:0>4}-{:0>2}-{:0>2} {:0>2}:{:0>2}:{:0>2} ",
            (*now).tm_year + 1900, /* tm_year is years since 1900 */
            (*now).tm_mon + 1,     /* tm_mon is months since Jan: [0, 11] */
            (*now).tm_mday,
            (*now).tm_hour,
            (*now).tm_min,
            (*now).tm_sec
        )
    };

    if let Err(e) = writer.write(now_str.as_bytes()) {
        eprintln!("Failed to log time message: {}", e);
        return;
    }

    if let Err(e) = writer.write((module.to_string() + " ").as_bytes()) {
        eprintln!("Failed to log module message: {}", e);
        return;
    }

    if let Err(e) = writer.write((msg + "\n").as_bytes()) {
        eprintln!("Failed to log message: {}", e);
    }
}

struct ConsoleLogger;

impl ReInit for ConsoleLogger {}

impl log::Log for ConsoleLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        let mut stdout = std::io::stdout();
        let module_path = record.module_path().unwrap_or("unknown");
        write_msg_common(&mut stdout, module_path, record.args().to_string());
    }

    fn flush(&self) {}
}

struct KmsgLogger {
    kmsg: Mutex<Option<File>>,
}

impl KmsgLogger {
    fn new() -> Result<Self, Error> {
        let kmsg = Self::open()?;
        Ok(Self {
            kmsg: Mutex::new(Some(kmsg)),
        })
    }

    fn open() -> Result<File, Error> {
        OpenOptions::new().write(true).open("/dev/kmsg")
    }

    /* Map to the syslog priority kmsg expects in its '<N>' prefix. */
    fn priority(level: log::Level) -> u8 {
        match level {
            log::Level::Error => 3,
            log::Level::Warn => 4,
            log::Level::Info => 6,
            log::Level::Debug | log::Level::Trace => 7,
        }
    }
}

impl ReInit for KmsgLogger {
    fn reinit(&self) {
        match Self::open() {
            Ok(file) => *self.kmsg.lock().expect("failed to lock kmsg logger") = Some(file),
            Err(e) => eprintln!("Failed to reopen /dev/kmsg: {}", e),
        }
    }
}

impl log::Log for KmsgLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        let module_path = record.module_path().unwrap_or("unknown");
        let msg = format!(
            "<{}>{} {}\n",
            Self::priority(record.level()),
            module_path,
            record.args()
        );
        match self.kmsg.lock().expect("failed to lock kmsg logger").as_mut() {
            Some(kmsg) => {
                if let Err(e) = kmsg.write(msg.as_bytes()) {
                    eprintln!("Failed to send message to kmsg: {}", e);
                }
            }
            None => eprintln!("kmsg logger is invalid."),
        }
    }

    fn flush(&self) {}
}

struct FileLogger {
    level: log::Level,
    file_path: PathBuf,
    file_mode: u32,
    file_number: u32,
    max_size: u32,
    file: Mutex<Option<File>>,
}

impl ReInit for FileLogger {
    fn reinit(&self) {
        match Self::file_open(self.file_path.as_path(), self.file_mode) {
            Ok(file) => *self.file.lock().expect("failed to lock file logger") = Some(file),
            Err(e) => {
                eprintln!(
                    "Failed to open log file '{}': {}",
                    self.file_path.display(),
                    e
                );
            }
        }
    }
}

impl log::Log for FileLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let current_size: u32;
        {
            let mut file = match self.file.lock() {
                Err(_) => return,
                Ok(v) => v,
            };

            let module_path = record.module_path().unwrap_or("unknown");

            match &mut *file {
                Some(file) => {
                    write_msg_common(file, module_path, record.args().to_string());
                    current_size = match file.metadata() {
                        Err(_) => return,
                        Ok(v) => v.len() as u32,
                    };
                }
                None => return,
            }
            /* file is automatically unlocked. */
        }
        if current_size > self.max_size {
            let file = match self.file.lock() {
                Err(_) => return,
                Ok(v) => v,
            };

            if let Err(e) = self.rotate() {
                eprintln!("Failed to rotate log file: {}", e);
            }

            if let Some(file) = &*file {
                if let Err(e) = file.set_len(0) {
                    eprintln!("Failed to clear log file: {}", e);
                }
            }
        }
    }

    fn flush(&self) {
        let mut file = match self.file.lock() {
            Err(_) => return,
            Ok(v) => v,
        };
        if let Some(file) = &mut *file {
            if let Err(e) = file.flush() {
                eprintln!("Failed to flush log file: {}", e);
            }
        }
    }
}

impl FileLogger {
    fn file_open(file_path: &Path, file_mode: u32) -> Result<File, Error> {
        let dir = match file_path.parent() {
            None => return Err(Error::from(ErrorKind::NotFound)),
            Some(v) => v,
        };
        if !dir.exists() {
            fs::create_dir_all(dir)?;
        }

        fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;

        OpenOptions::new()
            .write(true)
            .create(true)
            .append(true)
            .mode(file_mode)
            .open(file_path)
    }

    fn new(
        level: log::Level,
        file_path: PathBuf,
        file_mode: u32,
        max_size: u32,
        file_number: u32,
    ) -> Result<Self, Error> {
        let file = Self::file_open(&file_path, file_mode)?;

        Ok(Self {
            level,
            file_path,
            file_mode,
            file_number,
            max_size: max_size * 1024,
            file: Mutex::new(Some(file)),
        })
    }

    fn mv_file_in_dir(src: &str, dst: Option<&str>, dir: &Path) {
        let src = dir.join(src);
        let dst = match dst {
            None => {
                if let Err(e) = fs::remove_file(src) {
                    eprintln!("Failed to remove old log file: {}", e);
                }
                return;
            }
            Some(v) => dir.join(v),
        };
        if let Err(e) = fs::rename(src, dst) {
            eprintln!("Failed to rotate log file: {}", e);
        }
    }

    fn cp_file_in_dir(src: &str, dst: &str, dir: &Path) {
        let src = dir.join(src);
        let dst = dir.join(dst);
        if let Err(e) = fs::copy(src, &dst) {
            eprintln!("Failed to copy rotated log file: {}", e);
        }
        if let Err(e) = fs::set_permissions(dst, fs::Permissions::from_mode(0o400)) {
            eprintln!("Failed to set log file mode: {}", e);
        }
    }

    fn rotate(&self) -> Result<(), Error> {
        let dir = match self.file_path.parent() {
            None => return Err(Error::from(ErrorKind::NotFound)),
            Some(v) => v,
        };
        let file_name = match self.file_path.file_name() {
            None => return Err(Error::from(ErrorKind::InvalidData)),
            Some(v) => v.to_string_lossy().to_string(),
        };
        let file_name_dot = String::from(&file_name) + ".";

        /* Walk through the parent directory, save the suffix rotate number in num_list */
        let mut num_list: Vec<usize> = Vec::new();
        for de in dir.read_dir()? {
            let de = match de {
                Err(_) => continue,
                Ok(v) => v,
            };

            let file_type = match de.file_type() {
                Err(_) => continue,
                Ok(v) => v,
            };
            if !file_type.is_file() {
                continue;
            }

            let de_file_name = de.file_name().to_string_lossy().to_string();
            let rotated_num = de_file_name.trim_start_matches(&file_name_dot);
            let rotated_num = match rotated_num.parse::<usize>() {
                Err(_) => continue,
                Ok(v) => v,
            };
            num_list.push(rotated_num);
        }

        num_list.sort_unstable();

        /* 1. delete surplus rotated files, keeping room for the new one */
        while num_list.len() > (self.file_number - 1) as usize {
            let num = num_list.pop().unwrap(); /* safe here */
            let src = String::from(&file_name_dot) + &num.to_string();
            Self::mv_file_in_dir(&src, None, dir);
        }

        /* 2. {file.1, file.2, ...} => {file.2, file.3, ...} */
        while let Some(num) = num_list.pop() {
            let src = String::from(&file_name_dot) + &num.to_string();
            let dst = String::from(&file_name_dot) + &(num + 1).to_string();
            Self::mv_file_in_dir(&src, Some(&dst), dir);
        }

        /* 3. **copy** file => file.1, the writer keeps its open fd */
        let src = String::from(&file_name);
        let dst = String::from(&file_name_dot) + "1";
        Self::cp_file_in_dir(&src, &dst, dir);
        Ok(())
    }
}

/// Fan-out over every configured target.
struct CombinedLogger {
    loggers: Vec<Box<dyn ReInit>>,
}

impl ReInit for CombinedLogger {
    fn reinit(&self) {
        for logger in self.loggers.iter() {
            logger.as_ref().reinit()
        }
    }
}

impl Log for CombinedLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        for logger in &self.loggers {
            logger.log(record);
        }
    }

    fn flush(&self) {
        for logger in &self.loggers {
            logger.flush();
        }
    }
}

impl CombinedLogger {
    fn new() -> Self {
        Self {
            loggers: Vec::new(),
        }
    }

    fn push(&mut self, logger: Box<dyn ReInit>) {
        self.loggers.push(logger)
    }

    fn is_empty(&self) -> bool {
        self.loggers.is_empty()
    }
}

/// Initialize the global static logger instance.
/// Available log `targets` include `console`, `kmsg` and `file`.
/// The `file_*` arguments only take effect on the `file` target.
///
/// Repeated targets take effect only once.
pub fn init_log(
    name: &str,
    level: Level,
    targets: Vec<&str>,
    file_path: &str,
    file_size: u32,
    file_number: u32,
) {
    crate::inner::set_max_level(level);

    let mut combined_loggers = CombinedLogger::new();

    for target in targets {
        let logger = match target {
            "console" => Box::new(ConsoleLogger) as Box<dyn ReInit>,
            "kmsg" => match KmsgLogger::new() {
                Ok(logger) => Box::new(logger) as Box<dyn ReInit>,
                Err(e) => {
                    eprintln!("{} failed to create kmsg logger: {:?}", name, e);
                    continue;
                }
            },
            "file" => {
                match FileLogger::new(
                    log::Level::Debug,
                    PathBuf::from(file_path),
                    0o600,
                    file_size,
                    file_number,
                ) {
                    Ok(logger) => Box::new(logger) as Box<dyn ReInit>,
                    Err(e) => {
                        eprintln!(
                            "{} failed to create '{}' file logger: {:?}",
                            name, file_path, e
                        );
                        continue;
                    }
                }
            }
            _ => {
                eprintln!("{}: log target '{}' is strange, ignoring.", name, target);
                continue;
            }
        };

        combined_loggers.push(logger);
    }

    if combined_loggers.is_empty() {
        eprintln!("{}: no available log targets.", name);
    }

    if let Err(e) = crate::inner::set_boxed_logger(Box::new(combined_loggers)) {
        eprintln!("{}: failed to set global logger: {:?}", name, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_logger_rotate() {
        let dir = std::env::temp_dir().join("unitmaster-log-test");
        let _ = fs::remove_dir_all(&dir);
        let path = dir.join("unitmaster.log");
        init_log(
            "test",
            Level::Debug,
            vec!["file"],
            &path.to_string_lossy(),
            1,
            2,
        );
        for i in 0..256 {
            crate::info!("rotation filler line {}", i);
        }
        crate::flush!();
        assert!(path.exists());
        let _ = fs::remove_dir_all(&dir);
    }
}
