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

use super::super::job::JobManager;
use super::entry::{UnitLoadState, UnitX};
use super::submanager::UnitSubManagers;
use super::uload::UnitLoad;
use constants::TRANSIENT_DIR;
use core::error::*;
use core::unit::{self, unit_name_to_type, UnitType, UnitWriteFlags};
use nix::sys::stat::{self, Mode};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// one programmatic setting of a transient unit, keyed the way a unit file is
pub(crate) struct UnitProperty {
    ///
    pub key: String,
    ///
    pub value: String,
}

/// Creation of transient units out of programmatic property lists.
pub(super) struct UnitBus {
    // associated objects
    load: Rc<UnitLoad>,
    jm: Rc<JobManager>,
    sms: Rc<UnitSubManagers>,
}

impl UnitBus {
    pub(super) fn new(
        loadr: &Rc<UnitLoad>,
        jmr: &Rc<JobManager>,
        smsr: &Rc<UnitSubManagers>,
    ) -> UnitBus {
        UnitBus {
            load: Rc::clone(loadr),
            jm: Rc::clone(jmr),
            sms: Rc::clone(smsr),
        }
    }

    pub(super) fn transient_unit_from_message(
        &self,
        properties: &[UnitProperty],
        name: &str,
    ) -> Result<Rc<UnitX>> {
        let unit_type = unit_name_to_type(name);
        if unit_type == UnitType::UnitTypeInvalid || !self.sms.can_transient(unit_type) {
            return Err(Error::InvalidData);
        }

        // the first incomplete loading
        let unit = self.load.load_unit(name).ok_or(Error::UnitActionENoent)?;

        // prevent duplicate actions
        if !self.unit_is_pristine(&unit) {
            return Err(Error::UnitActionEAlready);
        }

        // write the configuration file of the transient unit, dropping the
        // half-made state again on any failure
        if let Err(e) = self.unit_make_transient(&unit, properties) {
            unit.remove_transient();
            return Err(e);
        }

        // the second real loading
        self.load.load_update(&unit);

        Ok(unit)
    }

    /// Nothing may exist for the name yet: no fragment on disk, no merge
    /// target, no pending job.
    fn unit_is_pristine(&self, unit: &Rc<UnitX>) -> bool {
        match unit.load_state() {
            UnitLoadState::Loaded | UnitLoadState::NotFound => {}
            _ => return false,
        }

        unit.load_paths().is_empty() && unit.merged_into().is_none() && !self.jm.has_job(unit)
    }

    fn unit_make_transient(&self, unit: &Rc<UnitX>, properties: &[UnitProperty]) -> Result<()> {
        let name = unit.id();
        let path = transient_file_path(&name);

        unit.make_transient(Some(path)); // record first
        create_transient_file(&name)?; // create file
        for property in properties {
            // write file
            self.unit_set_property(unit, &property.key, &property.value, UnitWriteFlags::RUNTIME)?;
        }

        Ok(())
    }

    fn unit_set_property(
        &self,
        unit: &Rc<UnitX>,
        key: &str,
        value: &str,
        flags: UnitWriteFlags,
    ) -> Result<()> {
        let mut ret = unit.set_sub_property(key, value, flags);
        if let Err(Error::NotFound { what: _ }) = ret {
            if unit.transient() && unit.load_state() == UnitLoadState::Stub {
                ret = self.unit_set_transient_property(unit, key, value, flags);
            }
        }

        if let Err(Error::NotFound { what: _ }) = ret {
            ret = self.unit_set_live_property(unit, key, value, flags);
        }

        ret
    }

    fn unit_set_transient_property(
        &self,
        unit: &Rc<UnitX>,
        key: &str,
        value: &str,
        flags: UnitWriteFlags,
    ) -> Result<()> {
        if !transient_settable(key) {
            return Err(Error::NotFound {
                what: format!("set transient property:{}", key),
            });
        }

        let ps = self.sms.private_section(unit.unit_type());
        self.unit_write_property(unit, &ps, key, value, flags, false)
    }

    fn unit_set_live_property(
        &self,
        unit: &Rc<UnitX>,
        key: &str,
        value: &str,
        flags: UnitWriteFlags,
    ) -> Result<()> {
        let ps = self.sms.private_section(unit.unit_type());
        match key {
            "Description" => self.unit_write_property(unit, &ps, key, value, flags, true),
            str_key => Err(Error::NotFound {
                what: format!("set live property:{}", str_key),
            }),
        }
    }

    fn unit_write_property(
        &self,
        unit: &Rc<UnitX>,
        ps: &str,
        key: &str,
        value: &str,
        flags: UnitWriteFlags,
        update: bool,
    ) -> Result<()> {
        if unit::unit_write_flags_is_noop(flags) {
            return Ok(());
        }

        if update {
            unit.set_property(key, value)?;
        }
        unit.write_settingf(ps, flags, key, format_args!("{}={}", key, value))
    }
}

/// The [Unit] section keys a transient setting may carry.
fn transient_settable(key: &str) -> bool {
    matches!(
        key,
        "RefuseManualStart"
            | "RefuseManualStop"
            | "DefaultDependencies"
            | "OnSuccessJobMode"
            | "OnFailureJobMode"
            | "IgnoreOnIsolate"
            | "StopWhenUnneeded"
            | "CollectMode"
            | "JobTimeoutSec"
            | "JobTimeoutAction"
            | "StartLimitIntervalSec"
            | "StartLimitBurst"
            | "StartLimitAction"
            | "FailureAction"
            | "SuccessAction"
            | "ConditionACPower"
            | "ConditionDirectoryNotEmpty"
            | "ConditionFileIsExecutable"
            | "ConditionFileNotEmpty"
            | "ConditionFirstBoot"
            | "ConditionPathExists"
            | "ConditionPathExistsGlob"
            | "ConditionPathIsDirectory"
            | "ConditionUser"
            | "AssertFileNotEmpty"
            | "AssertPathExists"
            | "Documentation"
            | "Wants"
            | "Requires"
            | "BindsTo"
            | "Requisite"
            | "PartOf"
            | "OnFailure"
            | "OnSuccess"
            | "Before"
            | "After"
            | "Conflicts"
            | "PropagatesReloadTo"
            | "RequiresMountsFor"
    )
}

fn create_transient_file(name: &str) -> Result<()> {
    // create '/run/unitmaster/transient' with mode 750
    if let Err(e) = with_umask(0o750, || {
        let dir = Path::new(TRANSIENT_DIR);
        if !dir.exists() {
            fs::create_dir_all(dir).context(IoSnafu)?;
            log::info!("create transient directory successfully: {}.", TRANSIENT_DIR);
        }
        Ok(())
    }) {
        log::error!("create transient directory failed: {}", e);
        return Err(e);
    }

    // create '/run/unitmaster/transient/<name>' with mode 640
    if let Err(e) = with_umask(0o640, || {
        let path = transient_file_path(name);
        fs::write(&path, "# This is a transient unit file, created programmatically via the unitmaster API. Do not edit.\n")?;
        log::info!("create transient file successfully: {:?}.", path);
        Ok(())
    }) {
        log::error!("create transient file failed:dir{:?}, {}", name, e);
        return Err(e);
    }

    Ok(())
}

fn with_umask<T>(mode: u32, body: impl FnOnce() -> Result<T>) -> Result<T> {
    let old_mask = stat::umask(Mode::from_bits_truncate(!mode));
    let ret = body();
    let _ = stat::umask(old_mask);
    ret
}

fn transient_file_path(name: &str) -> PathBuf {
    Path::new(TRANSIENT_DIR).join(name)
}
