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

use super::accounting::{AccountingSnapshot, UeAccounting};
use super::base::UeBase;
use super::bus::UeBus;
use super::cgroup::UeCgroup;
use super::child::UeChild;
use super::condition::{assert_keys::*, condition_keys::*, UeCondition};
use super::config::UeConfig;
use super::load::{UeLoad, UnitLoadState};
use super::ratelimit::StartLimit;
use super::{CollectMode, UnitEmergencyAction, UnitX};
use crate::unit::data::{DataManager, UnitState};
use crate::unit::util::UnitFile;
use basic::time_util::{DualTimestamp, UnitTimeStamp};
use core::error::*;
use core::unit::{SubUnit, UnitActiveState, UnitBase, UnitNotifyFlags, UnitType, UnitWriteFlags};
use nix::sys::socket::UnixCredentials;
use nix::sys::wait::WaitStatus;
use nix::unistd::Pid;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::rc::Rc;
use std::str::FromStr;

///
pub struct Unit {
    // associated objects
    dm: Rc<DataManager>,

    // owned objects
    base: Rc<UeBase>,

    config: Rc<UeConfig>,
    load: UeLoad,
    child: UeChild,
    cgroup: UeCgroup,
    conditions: Rc<UeCondition>,
    start_limit: StartLimit,
    accounting: UeAccounting,
    sub: Box<dyn SubUnit>,
    merged_into: RefCell<Option<Rc<UnitX>>>,
    timestamp: Rc<RefCell<UnitTimeStamp>>,
    condition_result: RefCell<bool>,
    assert_result: RefCell<bool>,
    invocation_id: RefCell<String>,
    exported_invocation_id: RefCell<bool>,
    in_activation: RefCell<bool>,
    gc_marker: RefCell<u64>,
    in_gc_queue: RefCell<bool>,
    in_cgroup_realize_queue: RefCell<bool>,
    in_cgroup_empty_queue: RefCell<bool>,
    in_cgroup_oom_queue: RefCell<bool>,
    in_stop_when_unneeded_queue: RefCell<bool>,
    in_cleanup_queue: RefCell<bool>,
    in_dbus_queue: RefCell<bool>,
    bus: UeBus,
}

impl PartialEq for Unit {
    fn eq(&self, other: &Self) -> bool {
        self.base.unit_type() == other.base.unit_type() && self.base.id() == other.base.id()
    }
}

impl Eq for Unit {}

impl PartialOrd for Unit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Unit {
    fn cmp(&self, other: &Self) -> Ordering {
        self.base.id().cmp(&other.base.id())
    }
}

impl Hash for Unit {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.base.id().hash(state);
    }
}

impl UnitBase for Unit {
    fn id(&self) -> String {
        self.id()
    }

    fn unit_type(&self) -> UnitType {
        self.unit_type()
    }

    fn test_start_limit(&self) -> bool {
        self.test_start_limit()
    }

    fn reset_start_limit(&self) {
        self.reset_start_limit()
    }

    fn notify(
        &self,
        original_state: UnitActiveState,
        new_state: UnitActiveState,
        flags: UnitNotifyFlags,
    ) {
        self.notify(original_state, new_state, flags);
    }

    fn default_dependencies(&self) -> bool {
        self.default_dependencies()
    }

    fn cg_path(&self) -> PathBuf {
        self.cg_path()
    }

    fn ignore_on_isolate(&self) -> bool {
        self.ignore_on_isolate()
    }

    fn set_ignore_on_isolate(&self, ignore_on_isolate: bool) {
        self.set_ignore_on_isolate(ignore_on_isolate);
    }

    fn is_load_stub(&self) -> bool {
        self.load.load_state() == UnitLoadState::Stub
    }

    fn transient(&self) -> bool {
        self.load.transient()
    }

    fn transient_file(&self) -> Option<PathBuf> {
        self.load.transient_file()
    }

    fn last_section_private(&self) -> i8 {
        self.load.last_section_private()
    }

    fn set_last_section_private(&self, lsp: i8) {
        self.load.set_last_section_private(lsp);
    }
}

impl Unit {
    pub(super) fn new(
        unit_type: UnitType,
        name: &str,
        dmr: &Rc<DataManager>,
        filer: &Rc<UnitFile>,
        sub: Box<dyn SubUnit>,
    ) -> Rc<Unit> {
        let _base = Rc::new(UeBase::new(String::from(name), unit_type));
        let _config = Rc::new(UeConfig::new());
        let _u = Rc::new(Unit {
            dm: Rc::clone(dmr),
            base: Rc::clone(&_base),
            config: Rc::clone(&_config),
            load: UeLoad::new(dmr, filer, &_base, &_config),
            child: UeChild::new(),
            cgroup: UeCgroup::new(&_base),
            conditions: Rc::new(UeCondition::new()),
            start_limit: StartLimit::new(),
            accounting: UeAccounting::new(),
            sub,
            merged_into: RefCell::new(None),
            timestamp: Rc::new(RefCell::new(UnitTimeStamp::default())),
            condition_result: RefCell::new(false),
            assert_result: RefCell::new(false),
            invocation_id: RefCell::new(String::new()),
            exported_invocation_id: RefCell::new(false),
            in_activation: RefCell::new(false),
            gc_marker: RefCell::new(0),
            in_gc_queue: RefCell::new(false),
            in_cgroup_realize_queue: RefCell::new(false),
            in_cgroup_empty_queue: RefCell::new(false),
            in_cgroup_oom_queue: RefCell::new(false),
            in_stop_when_unneeded_queue: RefCell::new(false),
            in_cleanup_queue: RefCell::new(false),
            in_dbus_queue: RefCell::new(false),
            bus: UeBus::new(&_config),
        });
        let owner = Rc::clone(&_u);
        _u.sub.attach_unit(owner);
        _u
    }

    fn conditions(&self) -> Rc<UeCondition> {
        let flag = self.conditions.init_flag();
        if flag != 0 {
            return Rc::clone(&self.conditions);
        }

        macro_rules! add_condition_simplified {
            ($key: ident, $value: ident) => {
                let params = self
                    .get_config()
                    .config_data()
                    .borrow()
                    .Unit
                    .$value
                    .to_string();
                if !params.is_empty() {
                    self.conditions.add_condition($key, params);
                }
            };
        }

        macro_rules! add_assert_simplified {
            ($key: ident, $value: ident) => {
                let params = self
                    .get_config()
                    .config_data()
                    .borrow()
                    .Unit
                    .$value
                    .to_string();
                if !params.is_empty() {
                    self.conditions.add_assert($key, params);
                }
            };
        }

        // ConditionACPower is different, it's Option<bool>, not String.
        if let Some(v) = self
            .get_config()
            .config_data()
            .borrow()
            .Unit
            .ConditionACPower
        {
            self.conditions
                .add_condition(CONDITION_AC_POWER, v.to_string());
        }

        add_condition_simplified!(CONDITION_DIRECTORY_NOT_EMPTY, ConditionDirectoryNotEmpty);
        add_condition_simplified!(CONDITION_FILE_IS_EXECUTABLE, ConditionFileIsExecutable);
        add_condition_simplified!(CONDITION_FILE_NOT_EMPTY, ConditionFileNotEmpty);

        // Same as ConditionACPower, it's Option<bool>.
        if let Some(v) = self
            .get_config()
            .config_data()
            .borrow()
            .Unit
            .ConditionFirstBoot
        {
            self.conditions
                .add_condition(CONDITION_FIRST_BOOT, v.to_string());
        }

        add_condition_simplified!(CONDITION_PATH_EXISTS, ConditionPathExists);
        add_condition_simplified!(CONDITION_PATH_EXISTS_GLOB, ConditionPathExistsGlob);
        add_condition_simplified!(CONDITION_PATH_IS_DIRECTORY, ConditionPathIsDirectory);
        add_condition_simplified!(CONDITION_USER, ConditionUser);

        add_assert_simplified!(ASSERT_FILE_NOT_EMPTY, AssertFileNotEmpty);
        add_assert_simplified!(ASSERT_PATH_EXISTS, AssertPathExists);

        self.conditions.set_init_flag(1);
        Rc::clone(&self.conditions)
    }

    pub(super) fn trigger(&self, other: &Self) {
        let other_unit_id = other.id();
        self.sub.trigger_notify(&other_unit_id);
    }

    ///
    pub fn notify(
        &self,
        original_state: UnitActiveState,
        new_state: UnitActiveState,
        flags: UnitNotifyFlags,
    ) {
        if original_state != new_state {
            log::debug!(
                "unit {} active state change from: {:?} to {:?}",
                self.id(),
                original_state,
                new_state
            );
        }

        {
            let mut unit_timestamp = self.timestamp.borrow_mut();

            unit_timestamp.state_change_timestamp = DualTimestamp::now();

            if original_state.is_inactive_or_failed() && !new_state.is_inactive_or_failed() {
                unit_timestamp.inactive_exit_timestamp = unit_timestamp.state_change_timestamp;
            } else if !original_state.is_inactive_or_failed() && new_state.is_inactive_or_failed() {
                unit_timestamp.inactive_enter_timestamp = unit_timestamp.state_change_timestamp;
            }

            if !original_state.is_active_or_reloading() && new_state.is_active_or_reloading() {
                unit_timestamp.active_enter_timestamp = unit_timestamp.state_change_timestamp;
            } else if original_state.is_active_or_reloading() && !new_state.is_active_or_reloading()
            {
                unit_timestamp.active_exit_timestamp = unit_timestamp.state_change_timestamp;
            }
        }

        let u_state = UnitState::new(original_state, new_state, flags);
        self.dm.insert_unit_state(self.id(), u_state);

        if new_state.is_inactive_or_failed() {
            *self.in_activation.borrow_mut() = false;
        }
    }

    ///
    pub fn id(&self) -> String {
        self.base.id()
    }

    ///
    pub fn set_id(&self, id: &str) {
        self.base.set_id(id)
    }

    /// return pids of the unit
    pub fn get_pids(&self) -> Vec<Pid> {
        self.child.get_pids()
    }

    /// return description
    pub fn get_description(&self) -> Option<String> {
        self.load.get_description()
    }

    /// return documentation
    pub fn get_documentation(&self) -> Option<String> {
        self.load.get_documentation()
    }

    /// realize the cgroup of the unit before processes are attached
    pub(super) fn realize_cgroup(&self) -> Result<()> {
        self.cgroup.setup_cg_path();

        self.cgroup.prepare_cg_exec()
    }

    /// return the cgroup name of the unit
    pub fn cg_path(&self) -> PathBuf {
        self.cgroup.cg_path()
    }

    pub(super) fn cg_realized(&self) -> bool {
        self.cgroup.cg_realized()
    }

    ///
    pub fn default_dependencies(&self) -> bool {
        self.get_config()
            .config_data()
            .borrow()
            .Unit
            .DefaultDependencies
    }

    ///
    pub fn ignore_on_isolate(&self) -> bool {
        self.get_config()
            .config_data()
            .borrow()
            .Unit
            .IgnoreOnIsolate
    }

    ///
    pub fn set_ignore_on_isolate(&self, ignore_on_isolate: bool) {
        self.get_config()
            .config_data()
            .borrow_mut()
            .Unit
            .IgnoreOnIsolate = ignore_on_isolate;
    }

    ///
    pub fn get_success_action(&self) -> UnitEmergencyAction {
        self.config.config_data().borrow().Unit.SuccessAction
    }

    ///
    pub fn get_failure_action(&self) -> UnitEmergencyAction {
        self.config.config_data().borrow().Unit.FailureAction
    }

    ///
    pub fn get_start_limit_action(&self) -> UnitEmergencyAction {
        self.config.config_data().borrow().Unit.StartLimitAction
    }

    ///
    pub fn collect_mode(&self) -> CollectMode {
        self.config.config_data().borrow().Unit.CollectMode
    }

    ///
    pub fn stop_when_unneeded(&self) -> bool {
        self.config.config_data().borrow().Unit.StopWhenUnneeded
    }

    ///
    pub fn get_job_timeout_action(&self) -> UnitEmergencyAction {
        self.config.config_data().borrow().Unit.JobTimeoutAction
    }

    ///
    pub fn current_active_state(&self) -> UnitActiveState {
        self.sub.current_active_state()
    }

    ///
    pub fn get_subunit_state(&self) -> String {
        self.sub.get_subunit_state()
    }

    /// test start rate, if start more than burst times in interval time, return error
    fn test_start_limit(&self) -> bool {
        if self.config.config_data().borrow().Unit.StartLimitInterval > 0
            && self.config.config_data().borrow().Unit.StartLimitBurst > 0
        {
            self.start_limit.init_from_config(
                self.config.config_data().borrow().Unit.StartLimitInterval,
                self.config.config_data().borrow().Unit.StartLimitBurst,
            );
        }

        if self.start_limit.ratelimit_below() {
            self.start_limit.set_hit(false);
            self.dm
                .insert_start_limit_result(self.id(), super::StartLimitResult::StartLimitNotHit);
            return true;
        }

        self.start_limit.set_hit(true);
        self.dm
            .insert_start_limit_result(self.id(), super::StartLimitResult::StartLimitHit);
        false
    }

    pub(super) fn start_limit_hit(&self) -> bool {
        self.start_limit.hit()
    }

    fn reset_start_limit(&self) {
        self.start_limit.reset_limit()
    }

    ///
    pub(super) fn get_config(&self) -> Rc<UeConfig> {
        self.config.clone()
    }

    pub(super) fn in_load_queue(&self) -> bool {
        self.load.in_load_queue()
    }

    pub(super) fn set_in_load_queue(&self, t: bool) {
        self.load.set_in_load_queue(t);
    }

    pub(super) fn in_target_dep_queue(&self) -> bool {
        self.load.in_target_dep_queue()
    }

    pub(super) fn set_in_target_dep_queue(&self, t: bool) {
        self.load.set_in_target_dep_queue(t);
    }

    pub(super) fn in_gc_queue(&self) -> bool {
        *self.in_gc_queue.borrow()
    }

    pub(super) fn set_in_gc_queue(&self, t: bool) {
        *self.in_gc_queue.borrow_mut() = t;
    }

    pub(super) fn in_cgroup_realize_queue(&self) -> bool {
        *self.in_cgroup_realize_queue.borrow()
    }

    pub(super) fn set_in_cgroup_realize_queue(&self, t: bool) {
        *self.in_cgroup_realize_queue.borrow_mut() = t;
    }

    pub(super) fn in_cgroup_empty_queue(&self) -> bool {
        *self.in_cgroup_empty_queue.borrow()
    }

    pub(super) fn set_in_cgroup_empty_queue(&self, t: bool) {
        *self.in_cgroup_empty_queue.borrow_mut() = t;
    }

    pub(super) fn in_cgroup_oom_queue(&self) -> bool {
        *self.in_cgroup_oom_queue.borrow()
    }

    pub(super) fn set_in_cgroup_oom_queue(&self, t: bool) {
        *self.in_cgroup_oom_queue.borrow_mut() = t;
    }

    pub(super) fn in_stop_when_unneeded_queue(&self) -> bool {
        *self.in_stop_when_unneeded_queue.borrow()
    }

    pub(super) fn set_in_stop_when_unneeded_queue(&self, t: bool) {
        *self.in_stop_when_unneeded_queue.borrow_mut() = t;
    }

    pub(super) fn in_cleanup_queue(&self) -> bool {
        *self.in_cleanup_queue.borrow()
    }

    pub(super) fn set_in_cleanup_queue(&self, t: bool) {
        *self.in_cleanup_queue.borrow_mut() = t;
    }

    pub(super) fn in_dbus_queue(&self) -> bool {
        *self.in_dbus_queue.borrow()
    }

    pub(super) fn set_in_dbus_queue(&self, t: bool) {
        *self.in_dbus_queue.borrow_mut() = t;
    }

    pub(super) fn gc_marker(&self) -> u64 {
        *self.gc_marker.borrow()
    }

    pub(super) fn set_gc_marker(&self, marker: u64) {
        *self.gc_marker.borrow_mut() = marker;
    }

    pub(super) fn get_real_name(&self) -> String {
        self.load.get_real_name()
    }

    pub(super) fn get_all_names(&self) -> Vec<String> {
        self.load.get_all_names()
    }

    pub(super) fn set_merge_into(&self, unit: Option<Rc<UnitX>>) {
        *self.merged_into.borrow_mut() = unit;
    }

    pub(super) fn merged_into(&self) -> Option<Rc<UnitX>> {
        self.merged_into.borrow().clone()
    }

    pub(super) fn load_unit(&self) -> Result<()> {
        self.set_in_load_queue(false);
        self.load.finalize_transient()?;
        match self.load.load_unit_confs() {
            Ok(_) => {
                let paths = self.load.get_unit_id_fragment_pathbuf();
                log::debug!("Begin exec sub class load");

                if let Err(err) = self.sub.load(paths) {
                    if let Error::Nix { source } = &err {
                        if *source == nix::Error::ENOEXEC {
                            self.load.set_load_state(UnitLoadState::BadSetting);
                            self.load.set_load_error(Some(err.to_string()));
                            return Err(err);
                        }
                    }
                    self.load.set_load_state(UnitLoadState::Error);
                    self.load.set_load_error(Some(err.to_string()));
                    return Err(err);
                }

                self.load.set_load_state(UnitLoadState::Loaded);
                self.load.set_load_error(None);
                Ok(())
            }
            Err(e) => {
                let state = if self.load.is_masked() {
                    UnitLoadState::Masked
                } else {
                    match &e {
                        Error::NotFound { .. } | Error::Other { .. } => UnitLoadState::NotFound,
                        Error::ConfigureError { .. } => UnitLoadState::BadSetting,
                        _ => UnitLoadState::Error,
                    }
                };
                self.load.set_load_state(state);
                self.load.set_load_error(Some(e.to_string()));
                Err(e)
            }
        }
    }

    /// Stub or Merged is a temporary state which represents an incomplete load
    pub(super) fn load_complete(&self) -> bool {
        self.load_state() != UnitLoadState::Stub && self.load_state() != UnitLoadState::Merged
    }

    ///
    pub(super) fn validate_load_state(&self) -> Result<()> {
        match self.load_state() {
            UnitLoadState::Stub | UnitLoadState::Merged => Err(Error::LoadError {
                msg: format!("unexpected load state of unit: {}", self.id()),
            }),
            UnitLoadState::Loaded => Ok(()),
            UnitLoadState::NotFound => Err(Error::LoadError {
                msg: format!("unit file is not found: {}", self.id()),
            }),
            UnitLoadState::Error => Err(Error::LoadError {
                msg: format!("load unit file failed, adjust the unit file: {}", self.id()),
            }),
            UnitLoadState::BadSetting => Err(Error::LoadError {
                msg: format!("unit file {} has bad setting", self.id()),
            }),
            UnitLoadState::Masked => Err(Error::LoadError {
                msg: format!("unit file {} is masked", self.id()),
            }),
        }
    }

    ///
    pub(super) fn get_perpetual(&self) -> bool {
        self.sub.get_perpetual()
    }

    pub(super) fn can_start(&self) -> bool {
        self.sub.can_start()
    }

    pub(super) fn can_stop(&self) -> bool {
        self.sub.can_stop()
    }

    pub(super) fn can_reload(&self) -> bool {
        self.sub.can_reload()
    }

    ///
    pub fn start(&self) -> Result<()> {
        let active_state = self.current_active_state();

        if self.load_state() == UnitLoadState::Masked {
            log::error!("Failed to start {}: unit is masked.", self.id());
            return Err(Error::UnitActionEUnsupported);
        }

        if self.load_state() != UnitLoadState::Loaded {
            log::error!("Failed to start {}: unit hasn't been loaded.", self.id());
            return Err(Error::UnitActionEInval);
        }

        if active_state.is_active_or_reloading() {
            log::debug!(
                "The unit {} is already active or reloading, skipping.",
                self.id()
            );
            return Err(Error::UnitActionEAlready);
        }

        if active_state == UnitActiveState::Maintenance {
            log::error!("Failed to start {}: unit is in maintenance", self.id());
            return Err(Error::UnitActionEAgain);
        }

        /* A type with a single start cycle is retired for good once it has
         * left the inactive state. */
        if active_state != UnitActiveState::Activating
            && self.once_only()
            && self.timestamp.borrow().inactive_exit_timestamp.is_set()
        {
            log::error!("Failed to start {}: unit can only be started once.", self.id());
            return Err(Error::UnitActionEStale);
        }

        /* A start while activating continues the ongoing start, the gates
         * below were already taken at dispatch. */
        if active_state != UnitActiveState::Activating && !self.test_start_limit() {
            log::error!("Failed to start {}: start limit hit.", self.id());
            return Err(Error::UnitActionEStartLimitHit);
        }

        if active_state != UnitActiveState::Activating && !self.conditions_test() {
            log::info!("The condition check failed, not starting {}.", self.id());
            return Err(Error::UnitActionEComm);
        }

        if active_state != UnitActiveState::Activating && !self.asserts_test() {
            log::info!("The assert check failed, not starting {}.", self.id());
            return Err(Error::UnitActionEProto);
        }

        if active_state != UnitActiveState::Activating {
            self.acquire_invocation_id();
            self.accounting.reset_accounting(&self.cg_path());
            *self.in_activation.borrow_mut() = true;
        }

        self.sub.start()
    }

    ///
    pub fn stop(&self, force: bool) -> Result<()> {
        if !force {
            let active_state = self.current_active_state();
            let inactive_or_failed = matches!(
                active_state,
                UnitActiveState::InActive | UnitActiveState::Failed
            );

            if inactive_or_failed {
                log::debug!(
                    "The unit {} is already inactive or dead, skipping.",
                    self.id()
                );
                return Err(Error::UnitActionEAlready);
            }
        }

        self.sub.stop(force)
    }

    /// reload the unit
    pub fn reload(&self) -> Result<()> {
        if !self.sub.can_reload() {
            log::info!("Unit {} can not be reloaded", self.id());
            return Err(Error::UnitActionEBadR);
        }

        let active_state = self.current_active_state();
        if active_state == UnitActiveState::Reloading {
            log::info!("Unit {} is being reloaded", self.id());
            return Err(Error::UnitActionEAgain);
        }

        if active_state == UnitActiveState::Activating {
            log::info!("Unit {} is still activating", self.id());
            return Err(Error::UnitActionEAgain);
        }

        if active_state != UnitActiveState::Active {
            log::info!("Unit {} is not active, no need to reload", self.id());
            /* The same-state round trip lets an installed reload job
             * finish with a Done result. */
            self.notify(active_state, active_state, UnitNotifyFlags::EMPTY);
            return Ok(());
        }

        log::info!("Reloading {}", self.id());
        match self.sub.reload() {
            Ok(_) => Ok(()),
            Err(e) => match e {
                Error::UnitActionEOpNotSupp => {
                    self.notify(active_state, active_state, UnitNotifyFlags::EMPTY);
                    Ok(())
                }
                _ => Err(e),
            },
        }
    }

    fn conditions_test(&self) -> bool {
        let res = self.conditions().conditions_test();
        self.timestamp.borrow_mut().condition_timestamp = DualTimestamp::now();
        *self.condition_result.borrow_mut() = res;
        res
    }

    fn asserts_test(&self) -> bool {
        let res = self.conditions().asserts_test();
        self.timestamp.borrow_mut().assert_timestamp = DualTimestamp::now();
        *self.assert_result.borrow_mut() = res;
        res
    }

    fn acquire_invocation_id(&self) {
        *self.invocation_id.borrow_mut() = basic::id128::id128_randomize();
        *self.exported_invocation_id.borrow_mut() = false;
        log::debug!(
            "Unit {} acquired invocation id {}",
            self.id(),
            self.invocation_id()
        );
        self.export_invocation_id();
    }

    ///
    pub fn invocation_id(&self) -> String {
        self.invocation_id.borrow().clone()
    }

    pub(super) fn in_activation(&self) -> bool {
        *self.in_activation.borrow()
    }

    pub(super) fn export_invocation_id(&self) {
        if *self.exported_invocation_id.borrow() {
            return;
        }
        let id = self.invocation_id();
        if id.is_empty() {
            return;
        }

        let path =
            PathBuf::from(constants::UNITS_STATE_DIR).join(format!("invocation:{}", self.id()));
        match std::fs::write(&path, &id) {
            Ok(_) => *self.exported_invocation_id.borrow_mut() = true,
            Err(e) => log::debug!("Failed to export invocation id of {}: {}", self.id(), e),
        }
    }

    pub(super) fn unexport_invocation_id(&self) {
        if !*self.exported_invocation_id.borrow() {
            return;
        }

        let path =
            PathBuf::from(constants::UNITS_STATE_DIR).join(format!("invocation:{}", self.id()));
        if let Err(e) = std::fs::remove_file(&path) {
            log::debug!("Failed to unexport invocation id of {}: {}", self.id(), e);
        }
        *self.exported_invocation_id.borrow_mut() = false;
    }

    pub(crate) fn reset_failed(&self) {
        self.sub.reset_failed()
    }

    pub(super) fn sigchld_events(&self, wait_status: WaitStatus) {
        self.sub.sigchld_events(wait_status)
    }

    pub(super) fn sigchldgen(&self) -> u64 {
        self.child.sigchldgen()
    }

    pub(super) fn set_sigchldgen(&self, gen: u64) {
        self.child.set_sigchldgen(gen);
    }

    pub(super) fn notifygen(&self) -> u64 {
        self.child.notifygen()
    }

    pub(super) fn set_notifygen(&self, gen: u64) {
        self.child.set_notifygen(gen);
    }

    ///
    pub fn load_state(&self) -> UnitLoadState {
        self.load.load_state()
    }

    ///
    pub fn load_error(&self) -> Option<String> {
        self.load.load_error()
    }

    pub(super) fn load_paths(&self) -> Vec<PathBuf> {
        self.load.paths()
    }

    pub(super) fn transient(&self) -> bool {
        self.load.transient()
    }

    ///
    pub fn set_load_state(&self, state: UnitLoadState) {
        self.load.set_load_state(state)
    }

    pub(super) fn make_transient(&self, path: Option<PathBuf>) {
        self.load.make_transient(path)
    }

    pub(super) fn remove_transient(&self) {
        self.load.remove_transient()
    }

    pub(super) fn child_add_pids(&self, pid: Pid) {
        self.child.add_pids(pid);
    }

    pub(super) fn child_remove_pids(&self, pid: Pid) {
        self.child.remove_pids(pid);
    }

    pub(super) fn unit_type(&self) -> UnitType {
        self.base.unit_type()
    }

    pub(super) fn may_gc(&self) -> bool {
        self.sub.may_gc()
    }

    pub(super) fn will_restart(&self) -> bool {
        self.sub.will_restart()
    }

    pub(super) fn gc_jobs(&self) -> bool {
        self.sub.gc_jobs()
    }

    pub(super) fn once_only(&self) -> bool {
        self.sub.once_only()
    }

    pub(super) fn can_delegate(&self) -> bool {
        self.sub.can_delegate()
    }

    pub(super) fn abandon(&self) -> Result<()> {
        self.sub.abandon()
    }

    pub(super) fn notify_cgroup_empty(&self) {
        self.sub.notify_cgroup_empty()
    }

    pub(super) fn notify_cgroup_oom(&self) {
        self.sub.notify_cgroup_oom()
    }

    pub(super) fn coldplug(&self) {
        self.sub.coldplug()
    }

    pub(super) fn catchup(&self) {
        self.sub.catchup()
    }

    pub(super) fn dump(&self) {
        self.sub.dump()
    }

    pub(super) fn release_resources(&self) {
        self.unexport_invocation_id();
        self.sub.release_resources()
    }

    /// accounting counters relative to the base of the running invocation
    pub fn read_accounting(&self) -> AccountingSnapshot {
        self.accounting.read_current(&self.cg_path())
    }

    pub(crate) fn notify_message(
        &self,
        ucred: &UnixCredentials,
        messages: &HashMap<&str, &str>,
        fds: Vec<i32>,
    ) -> Result<()> {
        self.sub.notify_message(ucred, messages, fds)
    }

    pub(crate) fn set_sub_property(
        &self,
        key: &str,
        value: &str,
        flags: UnitWriteFlags,
    ) -> Result<()> {
        self.sub.unit_set_property(key, value, flags)
    }

    pub(crate) fn set_property(&self, key: &str, value: &str) -> Result<()> {
        self.bus.set_property(key, value)
    }

    /// the per-unit lines of the manager snapshot, type-specific lines last
    pub(super) fn serialize(&self) -> Vec<(String, String)> {
        let mut items = Vec::new();

        items.push(("load-state".to_string(), self.load_state().to_string()));
        items.push((
            "active-state".to_string(),
            self.current_active_state().to_string(),
        ));
        items.push(("sub-state".to_string(), self.get_subunit_state()));

        let invocation_id = self.invocation_id();
        if !invocation_id.is_empty() {
            items.push(("invocation-id".to_string(), invocation_id));
        }

        {
            let ts = self.timestamp.borrow();
            for (key, stamp) in [
                ("state-change-timestamp", ts.state_change_timestamp),
                ("inactive-exit-timestamp", ts.inactive_exit_timestamp),
                ("active-enter-timestamp", ts.active_enter_timestamp),
                ("active-exit-timestamp", ts.active_exit_timestamp),
                ("inactive-enter-timestamp", ts.inactive_enter_timestamp),
                ("condition-timestamp", ts.condition_timestamp),
                ("assert-timestamp", ts.assert_timestamp),
            ] {
                if stamp.is_set() {
                    items.push((key.to_string(), stamp.dump()));
                }
            }
        }

        items.push((
            "condition-result".to_string(),
            self.condition_result.borrow().to_string(),
        ));
        items.push((
            "assert-result".to_string(),
            self.assert_result.borrow().to_string(),
        ));
        items.push((
            "start-limit-hit".to_string(),
            self.start_limit.hit().to_string(),
        ));

        items.extend(self.accounting.serialize());

        let cg_path = self.cg_path();
        if !cg_path.as_os_str().is_empty() {
            items.push(("cgroup".to_string(), cg_path.to_string_lossy().to_string()));
            items.push((
                "cgroup-realized".to_string(),
                self.cgroup.cg_realized().to_string(),
            ));
        }

        let pids: Vec<String> = self
            .get_pids()
            .iter()
            .map(|pid| pid.as_raw().to_string())
            .collect();
        if !pids.is_empty() {
            items.push(("pids".to_string(), pids.join(" ")));
        }

        if self.transient() {
            items.push(("transient".to_string(), "true".to_string()));
        }

        items.extend(self.sub.serialize());
        items
    }

    /// apply one snapshot line; unknown keys fall through to the sub unit
    pub(super) fn deserialize_item(&self, key: &str, value: &str) -> Result<()> {
        match key {
            "load-state" => {
                let state = UnitLoadState::from_str(value)?;
                self.load.set_load_state(state);
            }
            // the sub unit restores its own state machine
            "active-state" | "sub-state" => {}
            "invocation-id" => {
                *self.invocation_id.borrow_mut() = value.to_string();
                *self.exported_invocation_id.borrow_mut() = false;
            }
            "state-change-timestamp" => {
                self.timestamp.borrow_mut().state_change_timestamp = DualTimestamp::parse(value)?;
            }
            "inactive-exit-timestamp" => {
                self.timestamp.borrow_mut().inactive_exit_timestamp = DualTimestamp::parse(value)?;
            }
            "active-enter-timestamp" => {
                self.timestamp.borrow_mut().active_enter_timestamp = DualTimestamp::parse(value)?;
            }
            "active-exit-timestamp" => {
                self.timestamp.borrow_mut().active_exit_timestamp = DualTimestamp::parse(value)?;
            }
            "inactive-enter-timestamp" => {
                self.timestamp.borrow_mut().inactive_enter_timestamp = DualTimestamp::parse(value)?;
            }
            "condition-timestamp" => {
                self.timestamp.borrow_mut().condition_timestamp = DualTimestamp::parse(value)?;
            }
            "assert-timestamp" => {
                self.timestamp.borrow_mut().assert_timestamp = DualTimestamp::parse(value)?;
            }
            "condition-result" => {
                *self.condition_result.borrow_mut() =
                    basic::config::parse_boolean(value).context(UtilSnafu)?;
            }
            "assert-result" => {
                *self.assert_result.borrow_mut() =
                    basic::config::parse_boolean(value).context(UtilSnafu)?;
            }
            "start-limit-hit" => {
                self.start_limit
                    .set_hit(basic::config::parse_boolean(value).context(UtilSnafu)?);
            }
            "cgroup" => self.cgroup.set_cg_path(PathBuf::from(value)),
            "cgroup-realized" => {
                self.cgroup
                    .set_cg_realized(basic::config::parse_boolean(value).context(UtilSnafu)?);
            }
            "pids" => {
                for tok in value.split_whitespace() {
                    if let Ok(pid) = tok.parse::<i32>() {
                        self.child.add_pids(Pid::from_raw(pid));
                    }
                }
            }
            "transient" => {
                self.load
                    .set_transient(basic::config::parse_boolean(value).context(UtilSnafu)?);
            }
            _ => {
                if self.accounting.deserialize_item(key, value) {
                    return Ok(());
                }
                return self.sub.deserialize_item(key, value);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Unit;
    use crate::unit::test::test_utils::UmIfD;
    use basic::path_lookup::LookupPaths;
    use core::error::Error;
    use core::unit::{UnitActiveState, UnitType};
    use std::rc::Rc;

    use crate::{
        unit::data::DataManager,
        unit::util::{self, UnitFile},
    };

    fn unit_init(name: &str) -> Rc<Unit> {
        log::init_log_to_console("unit_init", log::Level::Trace);

        let mut l_path = LookupPaths::new();
        let test_units_dir = libtests::get_project_root()
            .unwrap()
            .join("tests/test_units/")
            .to_string_lossy()
            .to_string();
        l_path.search_path.push(test_units_dir);
        let lookup_path = Rc::new(l_path);
        let unit_file = UnitFile::new(&lookup_path);

        let dm = Rc::new(DataManager::new());
        let umifd = Rc::new(UmIfD);
        let sub_obj = util::create_subunit_with_um(UnitType::UnitTarget, umifd.clone()).unwrap();
        sub_obj.attach_um(umifd);
        Unit::new(
            UnitType::UnitTarget,
            name,
            &dm,
            &Rc::new(unit_file),
            sub_obj,
        )
    }

    #[test]
    fn test_unit_load() {
        let unit = unit_init("config.target");
        let load_stat = unit.load_unit();
        assert!(load_stat.is_ok());
        assert_eq!(
            unit.load_state(),
            crate::unit::entry::UnitLoadState::Loaded
        );
        assert_eq!(unit.get_description(), Some(String::from("CONFIG TEST")));
    }

    #[test]
    fn test_unit_load_not_found() {
        let unit = unit_init("nosuchfile.target");
        let load_stat = unit.load_unit();
        assert!(load_stat.is_err());
        assert_eq!(
            unit.load_state(),
            crate::unit::entry::UnitLoadState::NotFound
        );
        assert!(unit.load_error().is_some());
    }

    #[test]
    fn test_unit_stop_already_inactive() {
        let unit = unit_init("config.target");
        unit.load_unit().unwrap();
        assert_eq!(unit.current_active_state(), UnitActiveState::InActive);
        assert!(unit.stop(false).is_err());
        assert!(unit.stop(true).is_ok());
    }

    #[test]
    fn test_unit_start_acquires_invocation_id() {
        let unit = unit_init("config.target");
        unit.load_unit().unwrap();
        assert!(unit.invocation_id().is_empty());

        unit.start().unwrap();
        assert_eq!(unit.current_active_state(), UnitActiveState::Active);
        let first = unit.invocation_id();
        assert!(!first.is_empty());

        // a second start is refused and keeps the invocation id
        assert!(unit.start().is_err());
        assert_eq!(unit.invocation_id(), first);
    }

    #[test]
    fn test_unit_start_limit_refuses_fourth_start() {
        let unit = unit_init("config.target");
        unit.load_unit().unwrap();
        unit.set_property("StartLimitInterval", "10").unwrap();
        unit.set_property("StartLimitBurst", "3").unwrap();

        for _ in 0..3 {
            unit.start().unwrap();
            unit.stop(true).unwrap();
        }

        let res = unit.start();
        assert!(matches!(res, Err(Error::UnitActionEStartLimitHit)));

        // a reset opens the gate again
        unit.reset_start_limit();
        assert!(unit.start().is_ok());
    }

    #[test]
    fn test_once_only_unit_refuses_second_cycle() {
        use core::unit::{SubUnit, UnitBase, UnitMngUtil, UnitNotifyFlags};
        use std::any::Any;
        use std::cell::RefCell;
        use std::path::PathBuf;

        struct OnceSub {
            state: RefCell<UnitActiveState>,
        }

        impl SubUnit for OnceSub {
            fn as_any(&self) -> &dyn Any {
                self
            }

            fn load(&self, _conf: Vec<PathBuf>) -> core::error::Result<()> {
                Ok(())
            }

            fn start(&self) -> core::error::Result<()> {
                *self.state.borrow_mut() = UnitActiveState::Active;
                Ok(())
            }

            fn stop(&self, _force: bool) -> core::error::Result<()> {
                *self.state.borrow_mut() = UnitActiveState::InActive;
                Ok(())
            }

            fn once_only(&self) -> bool {
                true
            }

            fn current_active_state(&self) -> UnitActiveState {
                *self.state.borrow()
            }

            fn get_subunit_state(&self) -> String {
                String::new()
            }

            fn attach_unit(&self, _unit: Rc<dyn UnitBase>) {}
        }

        impl UnitMngUtil for OnceSub {
            fn attach_um(&self, _um: Rc<dyn core::unit::UmIf>) {}
        }

        let mut l_path = LookupPaths::new();
        let test_units_dir = libtests::get_project_root()
            .unwrap()
            .join("tests/test_units/")
            .to_string_lossy()
            .to_string();
        l_path.search_path.push(test_units_dir);
        let dm = Rc::new(DataManager::new());
        let unit = Unit::new(
            UnitType::UnitTarget,
            "config.target",
            &dm,
            &Rc::new(UnitFile::new(&Rc::new(l_path))),
            Box::new(OnceSub {
                state: RefCell::new(UnitActiveState::InActive),
            }),
        );
        unit.load_unit().unwrap();

        unit.start().unwrap();
        unit.notify(
            UnitActiveState::InActive,
            UnitActiveState::Active,
            UnitNotifyFlags::EMPTY,
        );
        unit.stop(true).unwrap();
        unit.notify(
            UnitActiveState::Active,
            UnitActiveState::InActive,
            UnitNotifyFlags::EMPTY,
        );

        // the first cycle retires the unit for good
        let res = unit.start();
        assert!(matches!(res, Err(Error::UnitActionEStale)));
    }

    #[test]
    fn test_unit_serialize_roundtrip() {
        let unit = unit_init("config.target");
        unit.load_unit().unwrap();
        unit.start().unwrap();

        let items = unit.serialize();
        let other = unit_init("config.target");
        other.load_unit().unwrap();
        for (k, v) in items {
            other.deserialize_item(&k, &v).unwrap();
        }
        assert_eq!(other.invocation_id(), unit.invocation_id());
        assert_eq!(other.load_state(), unit.load_state());
    }
}
