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

#![allow(non_snake_case)]
use crate::unit::util::UnitFile;
use core::error::*;
use std::cell::RefCell;
use std::rc::Rc;
use std::str::FromStr;
use unit_parser::prelude::{SectionParser, UnitConfig, UnitEntry, UnitParser, UnitSection};

pub(crate) struct UeConfig {
    // owned objects
    data: Rc<RefCell<UeConfigData>>,
}

#[allow(missing_docs)]
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub enum UnitEmergencyAction {
    None,
    Reboot,
    RebootForce,
    RebootImmediate,
    Poweroff,
    PoweroffForce,
    PoweroffImmediate,
    Exit,
    ExitForce,
}

impl Default for UnitEmergencyAction {
    fn default() -> Self {
        Self::None
    }
}

impl From<String> for UnitEmergencyAction {
    fn from(action: String) -> Self {
        match action.as_ref() {
            "none" => UnitEmergencyAction::None,
            "reboot" => UnitEmergencyAction::Reboot,
            "reboot-force" => UnitEmergencyAction::RebootForce,
            "reboot-immediate" => UnitEmergencyAction::RebootImmediate,
            "poweroff" => UnitEmergencyAction::Poweroff,
            "poweroff-force" => UnitEmergencyAction::PoweroffForce,
            "poweroff-immediate" => UnitEmergencyAction::PoweroffImmediate,
            "exit" => UnitEmergencyAction::Exit,
            "exit-force" => UnitEmergencyAction::ExitForce,
            _ => UnitEmergencyAction::None,
        }
    }
}

impl UnitEntry for UnitEmergencyAction {
    type Error = basic::error::Error;

    fn parse_from_str<S: AsRef<str>>(input: S) -> std::result::Result<Self, Self::Error> {
        Ok(UnitEmergencyAction::from(input.as_ref().to_string()))
    }
}

#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub(crate) enum JobMode {
    Fail,
    Replace,
    ReplaceIrreversible,
    Isolate,
    Flush,
    IgnoreDependencies,
    IgnoreRequirements,
    Trigger,
}

impl Default for JobMode {
    fn default() -> Self {
        Self::Replace
    }
}

impl FromStr for JobMode {
    type Err = basic::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fail" => Ok(JobMode::Fail),
            "replace" => Ok(JobMode::Replace),
            "replace_irreversible" => Ok(JobMode::ReplaceIrreversible),
            "isolate" => Ok(JobMode::Isolate),
            "flush" => Ok(JobMode::Flush),
            "ignore_dependencies" => Ok(JobMode::IgnoreDependencies),
            "ignore_requirements" => Ok(JobMode::IgnoreRequirements),
            "trigger" => Ok(JobMode::Trigger),
            &_ => Ok(JobMode::Replace),
        }
    }
}

impl UnitEntry for JobMode {
    type Error = basic::error::Error;

    fn parse_from_str<S: AsRef<str>>(input: S) -> std::result::Result<Self, Self::Error> {
        let job_mode = JobMode::from_str(input.as_ref())?;
        Ok(job_mode)
    }
}

/// which inactive states make a unit eligible for garbage collection
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub(crate) enum CollectMode {
    Inactive,
    InactiveOrFailed,
}

impl Default for CollectMode {
    fn default() -> Self {
        Self::Inactive
    }
}

impl FromStr for CollectMode {
    type Err = basic::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inactive" => Ok(CollectMode::Inactive),
            "inactive-or-failed" => Ok(CollectMode::InactiveOrFailed),
            &_ => Ok(CollectMode::Inactive),
        }
    }
}

impl UnitEntry for CollectMode {
    type Error = basic::error::Error;

    fn parse_from_str<S: AsRef<str>>(input: S) -> std::result::Result<Self, Self::Error> {
        let mode = CollectMode::from_str(input.as_ref())?;
        Ok(mode)
    }
}

impl UeConfig {
    pub(super) fn new() -> UeConfig {
        UeConfig {
            data: Rc::new(RefCell::new(UeConfigData::default())),
        }
    }

    pub(super) fn load_fragment_and_dropin(&self, files: &UnitFile, name: &str) -> Result<()> {
        /* Later files override or extend earlier ones, the fragment comes
         * first and the sorted drop-ins follow. */
        let unit_conf_frag = files.get_unit_id_fragment_pathbuf(name);
        if unit_conf_frag.is_empty() {
            return Err(format!("{} doesn't have corresponding config file", name).into());
        }

        let mut configer = match UeConfigData::load_config(unit_conf_frag, name) {
            Err(e) => return Err(map_parse_error(name, e)),
            Ok(v) => v,
        };

        // dropin
        for v in files.get_unit_wants_symlink_units(name) {
            configer.Unit.Wants.push(v.to_string_lossy().to_string());
            configer.Unit.After.push(v.to_string_lossy().to_string());
        }

        for v in files.get_unit_requires_symlink_units(name) {
            configer.Unit.Requires.push(v.to_string_lossy().to_string());
            configer.Unit.After.push(v.to_string_lossy().to_string());
        }

        *self.data.borrow_mut() = configer;

        Ok(())
    }

    pub(super) fn set_property(&self, key: &str, value: &str) -> Result<()> {
        let mut data = self.data.borrow_mut();
        match key {
            "Alias" | "WantedBy" | "RequiredBy" | "Also" => data.Install.set_property(key, value),
            _ => data.Unit.set_property(key, value),
        }
    }

    pub(crate) fn config_data(&self) -> Rc<RefCell<UeConfigData>> {
        self.data.clone()
    }
}

fn map_parse_error(name: &str, e: unit_parser::prelude::Error) -> Error {
    match e {
        unit_parser::prelude::Error::NoUnitFoundError { .. } => Error::NotFound {
            what: name.to_string(),
        },
        unit_parser::prelude::Error::ReadFileError { source, .. } => Error::Io { source },
        /* Anything else is a malformed unit file. */
        _ => Error::ConfigureError { msg: e.to_string() },
    }
}

#[derive(Default, Debug)]
pub(crate) struct UeConfigData {
    pub Unit: UeConfigUnit,
    pub Install: UeConfigInstall,
}

impl UnitConfig for UeConfigData {
    // shared by every unit type, the private section is parsed by the sub unit
    const SUFFIX: &'static str = "";

    fn __parse_unit(mut source: UnitParser, res: &mut Self) -> unit_parser::prelude::Result<()> {
        while let Some(mut section) = source.next() {
            if section.name == "Unit" {
                UeConfigUnit::__parse_section(&mut section, &mut res.Unit)?;
            } else if section.name == "Install" {
                UeConfigInstall::__parse_section(&mut section, &mut res.Install)?;
            }
            let i = section.finish();
            source.progress(i);
        }
        Ok(())
    }

    fn __load_default(_res: &mut Self) {}
}

#[derive(Clone, Debug)]
pub(crate) struct UeConfigUnit {
    pub Description: String,
    pub Documentation: String,
    //When set to true, the unit will not be stopped when isolating another
    //unit. For target units the default value is false.
    pub IgnoreOnIsolate: bool,
    pub DefaultDependencies: bool,
    pub RefuseManualStart: bool,
    pub RefuseManualStop: bool,
    pub StopWhenUnneeded: bool,
    pub OnFailureJobMode: JobMode,
    pub OnSuccessJobMode: JobMode,
    pub CollectMode: CollectMode,
    pub Wants: Vec<String>,
    pub Requires: Vec<String>,
    pub BindsTo: Vec<String>,
    pub Requisite: Vec<String>,
    pub PartOf: Vec<String>,
    pub OnFailure: Vec<String>,
    pub OnSuccess: Vec<String>,
    pub Before: Vec<String>,
    pub After: Vec<String>,
    pub Conflicts: Vec<String>,
    pub PropagatesReloadTo: Vec<String>,
    pub RequiresMountsFor: Vec<String>,

    /* Conditions */
    pub ConditionACPower: Option<bool>,
    pub ConditionDirectoryNotEmpty: String,
    pub ConditionFileIsExecutable: String,
    pub ConditionFileNotEmpty: String,
    pub ConditionFirstBoot: Option<bool>,
    pub ConditionPathExists: String,
    pub ConditionPathExistsGlob: String,
    pub ConditionPathIsDirectory: String,
    pub ConditionUser: String,

    /* Asserts */
    pub AssertFileNotEmpty: String,
    pub AssertPathExists: String,

    pub StartLimitInterval: u64,
    pub StartLimitIntervalSec: u64,
    pub StartLimitBurst: u32,
    pub SuccessAction: UnitEmergencyAction,
    pub FailureAction: UnitEmergencyAction,
    pub StartLimitAction: UnitEmergencyAction,
    pub JobTimeoutSec: u64,
    pub JobTimeoutAction: UnitEmergencyAction,
}

impl Default for UeConfigUnit {
    fn default() -> Self {
        UeConfigUnit {
            Description: String::new(),
            Documentation: String::new(),
            IgnoreOnIsolate: false,
            DefaultDependencies: true,
            RefuseManualStart: false,
            RefuseManualStop: false,
            StopWhenUnneeded: false,
            OnFailureJobMode: JobMode::Replace,
            OnSuccessJobMode: JobMode::Replace,
            CollectMode: CollectMode::Inactive,
            Wants: Vec::new(),
            Requires: Vec::new(),
            BindsTo: Vec::new(),
            Requisite: Vec::new(),
            PartOf: Vec::new(),
            OnFailure: Vec::new(),
            OnSuccess: Vec::new(),
            Before: Vec::new(),
            After: Vec::new(),
            Conflicts: Vec::new(),
            PropagatesReloadTo: Vec::new(),
            RequiresMountsFor: Vec::new(),
            ConditionACPower: None,
            ConditionDirectoryNotEmpty: String::new(),
            ConditionFileIsExecutable: String::new(),
            ConditionFileNotEmpty: String::new(),
            ConditionFirstBoot: None,
            ConditionPathExists: String::new(),
            ConditionPathExistsGlob: String::new(),
            ConditionPathIsDirectory: String::new(),
            ConditionUser: String::new(),
            AssertFileNotEmpty: String::new(),
            AssertPathExists: String::new(),
            StartLimitInterval: 10,
            StartLimitIntervalSec: 10,
            StartLimitBurst: 5,
            SuccessAction: UnitEmergencyAction::None,
            FailureAction: UnitEmergencyAction::None,
            StartLimitAction: UnitEmergencyAction::None,
            JobTimeoutSec: 0,
            JobTimeoutAction: UnitEmergencyAction::None,
        }
    }
}

impl UnitSection for UeConfigUnit {
    fn __parse_section(
        source: &mut SectionParser,
        res: &mut Self,
    ) -> unit_parser::prelude::Result<()> {
        while let Some((key, value)) = source.next() {
            match key {
                "Description" => res.Description = value,
                "Documentation" => res.Documentation = value,
                "IgnoreOnIsolate" => res.IgnoreOnIsolate = parse_entry(key, value)?,
                "DefaultDependencies" => res.DefaultDependencies = parse_entry(key, value)?,
                "RefuseManualStart" => res.RefuseManualStart = parse_entry(key, value)?,
                "RefuseManualStop" => res.RefuseManualStop = parse_entry(key, value)?,
                "StopWhenUnneeded" => res.StopWhenUnneeded = parse_entry(key, value)?,
                "OnFailureJobMode" => res.OnFailureJobMode = parse_entry(key, value)?,
                "OnSuccessJobMode" => res.OnSuccessJobMode = parse_entry(key, value)?,
                "CollectMode" => res.CollectMode = parse_entry(key, value)?,
                "Wants" => parse_list(&mut res.Wants, &value),
                "Requires" => parse_list(&mut res.Requires, &value),
                "BindsTo" => parse_list(&mut res.BindsTo, &value),
                "Requisite" => parse_list(&mut res.Requisite, &value),
                "PartOf" => parse_list(&mut res.PartOf, &value),
                "OnFailure" => parse_list(&mut res.OnFailure, &value),
                "OnSuccess" => parse_list(&mut res.OnSuccess, &value),
                "Before" => parse_list(&mut res.Before, &value),
                "After" => parse_list(&mut res.After, &value),
                "Conflicts" => parse_list(&mut res.Conflicts, &value),
                "PropagatesReloadTo" => parse_list(&mut res.PropagatesReloadTo, &value),
                "RequiresMountsFor" => parse_list(&mut res.RequiresMountsFor, &value),

                /* Conditions */
                "ConditionACPower" => res.ConditionACPower = Some(parse_entry(key, value)?),
                "ConditionDirectoryNotEmpty" => res.ConditionDirectoryNotEmpty = value,
                "ConditionFileIsExecutable" => res.ConditionFileIsExecutable = value,
                "ConditionFileNotEmpty" => res.ConditionFileNotEmpty = value,
                "ConditionFirstBoot" => res.ConditionFirstBoot = Some(parse_entry(key, value)?),
                "ConditionPathExists" => res.ConditionPathExists = value,
                "ConditionPathExistsGlob" => res.ConditionPathExistsGlob = value,
                "ConditionPathIsDirectory" => res.ConditionPathIsDirectory = value,
                "ConditionUser" => res.ConditionUser = value,

                /* Asserts */
                "AssertFileNotEmpty" => res.AssertFileNotEmpty = value,
                "AssertPathExists" => res.AssertPathExists = value,

                "StartLimitInterval" => res.StartLimitInterval = parse_entry(key, value)?,
                "StartLimitIntervalSec" => res.StartLimitIntervalSec = parse_entry(key, value)?,
                "StartLimitBurst" => res.StartLimitBurst = parse_entry(key, value)?,
                "SuccessAction" => res.SuccessAction = parse_entry(key, value)?,
                "FailureAction" => res.FailureAction = parse_entry(key, value)?,
                "StartLimitAction" => res.StartLimitAction = parse_entry(key, value)?,
                "JobTimeoutSec" => res.JobTimeoutSec = parse_entry(key, value)?,
                "JobTimeoutAction" => res.JobTimeoutAction = parse_entry(key, value)?,
                str_key => log::warn!("Unknown key {} in [Unit] section, ignoring", str_key),
            }
        }
        Ok(())
    }

    fn __load_default(_res: &mut Self) {}
}

impl UeConfigUnit {
    pub(crate) fn set_property(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "Description" => self.Description = value.to_string(),
            "Documentation" => self.Documentation = value.to_string(),
            "IgnoreOnIsolate" => self.IgnoreOnIsolate = basic::config::parse_boolean(value)?,
            "DefaultDependencies" => {
                self.DefaultDependencies = basic::config::parse_boolean(value)?
            }
            "RefuseManualStart" => self.RefuseManualStart = basic::config::parse_boolean(value)?,
            "RefuseManualStop" => self.RefuseManualStop = basic::config::parse_boolean(value)?,
            "StopWhenUnneeded" => self.StopWhenUnneeded = basic::config::parse_boolean(value)?,
            "OnFailureJobMode" => self.OnFailureJobMode = JobMode::parse_from_str(value)?,
            "OnSuccessJobMode" => self.OnSuccessJobMode = JobMode::parse_from_str(value)?,
            "CollectMode" => self.CollectMode = CollectMode::parse_from_str(value)?,
            "Wants" => self.Wants = vec_str_2_string(value),
            "Requires" => self.Requires = vec_str_2_string(value),
            "BindsTo" => self.BindsTo = vec_str_2_string(value),
            "Requisite" => self.Requisite = vec_str_2_string(value),
            "PartOf" => self.PartOf = vec_str_2_string(value),
            "OnFailure" => self.OnFailure = vec_str_2_string(value),
            "OnSuccess" => self.OnSuccess = vec_str_2_string(value),
            "Before" => self.Before = vec_str_2_string(value),
            "After" => self.After = vec_str_2_string(value),
            "Conflicts" => self.Conflicts = vec_str_2_string(value),
            "PropagatesReloadTo" => self.PropagatesReloadTo = vec_str_2_string(value),
            "RequiresMountsFor" => self.RequiresMountsFor = vec_str_2_string(value),

            /* Conditions */
            "ConditionACPower" => {
                self.ConditionACPower = Some(basic::config::parse_boolean(value)?)
            }
            "ConditionDirectoryNotEmpty" => self.ConditionDirectoryNotEmpty = value.to_string(),
            "ConditionFileIsExecutable" => self.ConditionFileIsExecutable = value.to_string(),
            "ConditionFileNotEmpty" => self.ConditionFileNotEmpty = value.to_string(),
            "ConditionFirstBoot" => {
                self.ConditionFirstBoot = Some(basic::config::parse_boolean(value)?)
            }
            "ConditionPathExists" => self.ConditionPathExists = value.to_string(),
            "ConditionPathExistsGlob" => self.ConditionPathExistsGlob = value.to_string(),
            "ConditionPathIsDirectory" => self.ConditionPathIsDirectory = value.to_string(),
            "ConditionUser" => self.ConditionUser = value.to_string(),

            /* Asserts */
            "AssertFileNotEmpty" => self.AssertFileNotEmpty = value.to_string(),
            "AssertPathExists" => self.AssertPathExists = value.to_string(),

            "StartLimitInterval" => self.StartLimitInterval = value.parse::<u64>()?,
            "StartLimitIntervalSec" => self.StartLimitIntervalSec = value.parse::<u64>()?,
            "StartLimitBurst" => self.StartLimitBurst = value.parse::<u32>()?,
            "SuccessAction" => self.SuccessAction = UnitEmergencyAction::parse_from_str(value)?,
            "FailureAction" => self.FailureAction = UnitEmergencyAction::parse_from_str(value)?,
            "StartLimitAction" => {
                self.StartLimitAction = UnitEmergencyAction::parse_from_str(value)?
            }
            "JobTimeoutSec" => self.JobTimeoutSec = value.parse::<u64>()?,
            "JobTimeoutAction" => {
                self.JobTimeoutAction = UnitEmergencyAction::parse_from_str(value)?
            }
            str_key => {
                return Err(Error::NotFound {
                    what: format!("set property:{}", str_key),
                })
            }
        };
        Ok(())
    }
}

#[derive(Default, Clone, Debug)]
pub struct UeConfigInstall {
    pub Alias: Vec<String>,
    pub WantedBy: Vec<String>,
    pub RequiredBy: Vec<String>,
    pub Also: Vec<String>,
}

impl UnitSection for UeConfigInstall {
    fn __parse_section(
        source: &mut SectionParser,
        res: &mut Self,
    ) -> unit_parser::prelude::Result<()> {
        while let Some((key, value)) = source.next() {
            match key {
                "Alias" => parse_list(&mut res.Alias, &value),
                "WantedBy" => parse_list(&mut res.WantedBy, &value),
                "RequiredBy" => parse_list(&mut res.RequiredBy, &value),
                "Also" => parse_list(&mut res.Also, &value),
                str_key => log::warn!("Unknown key {} in [Install] section, ignoring", str_key),
            }
        }
        Ok(())
    }

    fn __load_default(_res: &mut Self) {}
}

impl UeConfigInstall {
    pub(crate) fn set_property(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "Alias" => self.Alias = vec_str_2_string(value),
            "WantedBy" => self.WantedBy = vec_str_2_string(value),
            "RequiredBy" => self.RequiredBy = vec_str_2_string(value),
            "Also" => self.Also = vec_str_2_string(value),
            str_key => {
                return Err(Error::NotFound {
                    what: format!("set property:{}", str_key),
                })
            }
        };
        Ok(())
    }
}

fn vec_str_2_string(str: &str) -> Vec<String> {
    str.split_whitespace().map(|s| s.to_string()).collect()
}

/* An empty assignment resets what earlier files accumulated. */
fn parse_list(target: &mut Vec<String>, value: &str) {
    if value.is_empty() {
        target.clear();
    } else {
        target.extend(value.split_whitespace().map(|s| s.to_string()));
    }
}

fn parse_entry<T: UnitEntry>(key: &str, value: String) -> unit_parser::prelude::Result<T> {
    UnitEntry::parse_from_str(&value).map_err(|_| unit_parser::prelude::Error::ValueParsingError {
        key: key.to_string(),
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::{CollectMode, UeConfig, UeConfigData, UnitEmergencyAction};
    use libtests::get_project_root;
    use unit_parser::prelude::UnitConfig;

    #[test]
    fn test_unit_parse() {
        let mut file_path = get_project_root().unwrap();
        file_path.push("tests/test_units/config.target");

        let config = UeConfigData::load_config(vec![&file_path], "config.target").unwrap();

        assert_eq!(config.Unit.Description, "CONFIG TEST");
        assert_eq!(
            config.Unit.Wants,
            vec!["dep1.target".to_string(), "dep2.target".to_string()]
        );
        assert_eq!(config.Unit.After.len(), 2);
        assert!(!config.Unit.DefaultDependencies);
        assert_eq!(config.Unit.StartLimitBurst, 3);
        // untouched keys keep their defaults
        assert_eq!(config.Unit.StartLimitInterval, 10);
        assert_eq!(config.Unit.CollectMode, CollectMode::InactiveOrFailed);
        assert_eq!(config.Unit.SuccessAction, UnitEmergencyAction::Exit);
        assert_eq!(config.Unit.JobTimeoutSec, 30);
        assert_eq!(
            config.Unit.JobTimeoutAction,
            UnitEmergencyAction::RebootForce
        );
        assert_eq!(config.Install.WantedBy, vec!["multi-user.target".to_string()]);
    }

    #[test]
    fn test_set_property() {
        let conf = UeConfig::new();
        conf.set_property("Description", "from bus").unwrap();
        conf.set_property("Wants", "a.target b.target").unwrap();
        conf.set_property("CollectMode", "inactive-or-failed")
            .unwrap();
        conf.set_property("WantedBy", "multi-user.target").unwrap();

        let data = conf.config_data();
        assert_eq!(data.borrow().Unit.Description, "from bus");
        assert_eq!(data.borrow().Unit.Wants.len(), 2);
        assert_eq!(
            data.borrow().Unit.CollectMode,
            CollectMode::InactiveOrFailed
        );
        assert_eq!(data.borrow().Install.WantedBy.len(), 1);

        assert!(conf.set_property("NoSuchProperty", "v").is_err());
    }

    #[test]
    fn test_emergency_action_from_string() {
        assert_eq!(
            UnitEmergencyAction::from("poweroff-immediate".to_string()),
            UnitEmergencyAction::PoweroffImmediate
        );
        assert_eq!(
            UnitEmergencyAction::from("not-an-action".to_string()),
            UnitEmergencyAction::None
        );
    }
}
