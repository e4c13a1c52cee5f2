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

use super::config::UeConfig;
use super::load::UnitLoadState;
use super::uentry::Unit;
use super::{CollectMode, UnitEmergencyAction};
use crate::unit::data::DataManager;
use crate::unit::util::UnitFile;
use core::error::*;
use core::unit::{self, SubUnit, UnitActiveState, UnitRelations, UnitType, UnitWriteFlags};
use nix::sys::socket::UnixCredentials;
use nix::sys::wait::WaitStatus;
use nix::unistd::Pid;
use std::collections::HashMap;
use std::fmt::Arguments;
use std::ops::Deref;
use std::path::PathBuf;
use std::rc::Rc;

/// the thin wrapper the engine hands around instead of the entry itself
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct UnitX(Rc<Unit>);

impl UnitX {
    pub(in crate::unit) fn new(
        dmr: &Rc<DataManager>,
        filer: &Rc<UnitFile>,
        unit_type: UnitType,
        name: &str,
        subclass: Box<dyn SubUnit>,
    ) -> UnitX {
        let unit = Unit::new(unit_type, name, dmr, filer, subclass);
        UnitX(unit)
    }

    pub(in crate::unit) fn from_unit(unit: Rc<Unit>) -> UnitX {
        UnitX(unit)
    }

    pub(crate) fn load(&self) -> Result<()> {
        self.0.load_unit()
    }

    pub(crate) fn get_real_name(&self) -> String {
        self.0.get_real_name()
    }

    pub(crate) fn get_all_names(&self) -> Vec<String> {
        self.0.get_all_names()
    }

    pub(crate) fn set_merge_into(&self, unit: Option<Rc<UnitX>>) {
        self.0.set_merge_into(unit)
    }

    pub(crate) fn merged_into(&self) -> Option<Rc<UnitX>> {
        self.0.merged_into()
    }

    pub(crate) fn start(&self) -> Result<()> {
        log::debug!("unitx start the unit {}", self.id());
        self.0.start()
    }

    pub(crate) fn stop(&self, force: bool) -> Result<()> {
        self.0.stop(force)
    }

    pub(crate) fn reload(&self) -> Result<()> {
        self.0.reload()
    }

    pub(crate) fn reset_failed(&self) {
        self.0.reset_failed()
    }

    pub(crate) fn sigchld_events(&self, wait_status: WaitStatus) {
        self.0.sigchld_events(wait_status)
    }

    pub(crate) fn sigchldgen(&self) -> u64 {
        self.0.sigchldgen()
    }

    pub(crate) fn set_sigchldgen(&self, gen: u64) {
        self.0.set_sigchldgen(gen)
    }

    pub(crate) fn notifygen(&self) -> u64 {
        self.0.notifygen()
    }

    pub(crate) fn set_notifygen(&self, gen: u64) {
        self.0.set_notifygen(gen)
    }

    pub(crate) fn trigger(&self, other: &Self) {
        self.0.trigger(other);
    }

    pub(crate) fn in_load_queue(&self) -> bool {
        self.0.in_load_queue()
    }

    pub(crate) fn set_in_load_queue(&self, t: bool) {
        self.0.set_in_load_queue(t);
    }

    pub(crate) fn in_target_dep_queue(&self) -> bool {
        self.0.in_target_dep_queue()
    }

    pub(crate) fn set_in_target_dep_queue(&self, t: bool) {
        self.0.set_in_target_dep_queue(t);
    }

    pub(crate) fn in_gc_queue(&self) -> bool {
        self.0.in_gc_queue()
    }

    pub(crate) fn set_in_gc_queue(&self, t: bool) {
        self.0.set_in_gc_queue(t);
    }

    pub(crate) fn in_cgroup_realize_queue(&self) -> bool {
        self.0.in_cgroup_realize_queue()
    }

    pub(crate) fn set_in_cgroup_realize_queue(&self, t: bool) {
        self.0.set_in_cgroup_realize_queue(t);
    }

    pub(crate) fn in_cgroup_empty_queue(&self) -> bool {
        self.0.in_cgroup_empty_queue()
    }

    pub(crate) fn set_in_cgroup_empty_queue(&self, t: bool) {
        self.0.set_in_cgroup_empty_queue(t);
    }

    pub(crate) fn in_cgroup_oom_queue(&self) -> bool {
        self.0.in_cgroup_oom_queue()
    }

    pub(crate) fn set_in_cgroup_oom_queue(&self, t: bool) {
        self.0.set_in_cgroup_oom_queue(t);
    }

    pub(crate) fn in_stop_when_unneeded_queue(&self) -> bool {
        self.0.in_stop_when_unneeded_queue()
    }

    pub(crate) fn set_in_stop_when_unneeded_queue(&self, t: bool) {
        self.0.set_in_stop_when_unneeded_queue(t);
    }

    pub(crate) fn in_cleanup_queue(&self) -> bool {
        self.0.in_cleanup_queue()
    }

    pub(crate) fn set_in_cleanup_queue(&self, t: bool) {
        self.0.set_in_cleanup_queue(t);
    }

    pub(crate) fn in_dbus_queue(&self) -> bool {
        self.0.in_dbus_queue()
    }

    pub(crate) fn set_in_dbus_queue(&self, t: bool) {
        self.0.set_in_dbus_queue(t);
    }

    pub(crate) fn gc_marker(&self) -> u64 {
        self.0.gc_marker()
    }

    pub(crate) fn set_gc_marker(&self, marker: u64) {
        self.0.set_gc_marker(marker);
    }

    /// a dependency between a unit and itself is refused
    pub(crate) fn dep_check(&self, _relation: UnitRelations, other: &UnitX) -> Result<()> {
        if self.id() == other.id() {
            return Err(Error::InvalidData);
        }

        Ok(())
    }

    pub(in crate::unit) fn id(&self) -> String {
        self.0.id()
    }

    pub(in crate::unit) fn set_id(&self, id: &str) {
        self.0.set_id(id)
    }

    pub(crate) fn get_success_action(&self) -> UnitEmergencyAction {
        self.0.get_success_action()
    }

    pub(crate) fn get_failure_action(&self) -> UnitEmergencyAction {
        self.0.get_failure_action()
    }

    pub(crate) fn get_start_limit_action(&self) -> UnitEmergencyAction {
        self.0.get_start_limit_action()
    }

    pub(crate) fn get_job_timeout_action(&self) -> UnitEmergencyAction {
        self.0.get_job_timeout_action()
    }

    pub(crate) fn collect_mode(&self) -> CollectMode {
        self.0.collect_mode()
    }

    pub(crate) fn stop_when_unneeded(&self) -> bool {
        self.0.stop_when_unneeded()
    }

    pub(crate) fn active_state(&self) -> UnitActiveState {
        self.0.current_active_state()
    }

    pub(crate) fn active_or_activating(&self) -> bool {
        self.0.current_active_state().is_active_or_activating()
    }

    pub(crate) fn activated(&self) -> bool {
        // a unit still activating does not count
        !matches!(
            self.0.current_active_state(),
            UnitActiveState::InActive | UnitActiveState::Failed | UnitActiveState::Activating
        )
    }

    pub(crate) fn get_perpetual(&self) -> bool {
        self.0.get_perpetual()
    }

    pub(crate) fn can_start(&self) -> bool {
        self.0.can_start()
    }

    pub(crate) fn can_stop(&self) -> bool {
        self.0.can_stop()
    }

    pub(crate) fn can_reload(&self) -> bool {
        self.0.can_reload()
    }

    pub(crate) fn may_gc(&self) -> bool {
        self.0.may_gc()
    }

    pub(crate) fn will_restart(&self) -> bool {
        self.0.will_restart()
    }

    pub(crate) fn gc_jobs(&self) -> bool {
        self.0.gc_jobs()
    }

    pub(crate) fn once_only(&self) -> bool {
        self.0.once_only()
    }

    pub(crate) fn can_delegate(&self) -> bool {
        self.0.can_delegate()
    }

    pub(crate) fn abandon(&self) -> Result<()> {
        self.0.abandon()
    }

    pub(crate) fn notify_cgroup_empty(&self) {
        self.0.notify_cgroup_empty()
    }

    pub(crate) fn notify_cgroup_oom(&self) {
        self.0.notify_cgroup_oom()
    }

    pub(crate) fn coldplug(&self) {
        self.0.coldplug()
    }

    pub(crate) fn catchup(&self) {
        self.0.catchup()
    }

    pub(crate) fn dump(&self) {
        self.0.dump()
    }

    pub(crate) fn release_resources(&self) {
        self.0.release_resources()
    }

    pub(crate) fn is_load_complete(&self) -> bool {
        self.0.load_complete()
    }

    pub(crate) fn validate_load_state(&self) -> Result<()> {
        self.0.validate_load_state()
    }

    pub(crate) fn cg_path(&self) -> PathBuf {
        self.0.cg_path()
    }

    pub(crate) fn cg_realized(&self) -> bool {
        self.0.cg_realized()
    }

    pub(crate) fn realize_cgroup(&self) -> Result<()> {
        self.0.realize_cgroup()
    }

    pub(crate) fn load_state(&self) -> UnitLoadState {
        self.0.load_state()
    }

    pub(crate) fn load_paths(&self) -> Vec<PathBuf> {
        self.0.load_paths()
    }

    pub(crate) fn transient(&self) -> bool {
        self.0.transient()
    }

    pub(crate) fn set_load_state(&self, state: UnitLoadState) {
        self.0.set_load_state(state)
    }

    pub(crate) fn make_transient(&self, path: Option<PathBuf>) {
        self.0.make_transient(path)
    }

    pub(crate) fn remove_transient(&self) {
        self.0.remove_transient()
    }

    pub(crate) fn unit_type(&self) -> UnitType {
        self.0.unit_type()
    }

    pub fn get_config(&self) -> Rc<UeConfig> {
        self.0.get_config()
    }

    pub(crate) fn default_dependencies(&self) -> bool {
        self.0.default_dependencies()
    }

    pub(crate) fn child_add_pids(&self, pid: Pid) {
        self.0.child_add_pids(pid);
    }

    pub(crate) fn child_remove_pids(&self, pid: Pid) {
        self.0.child_remove_pids(pid);
    }

    pub(crate) fn get_pids(&self) -> Vec<Pid> {
        self.0.get_pids()
    }

    pub(crate) fn start_limit_hit(&self) -> bool {
        self.0.start_limit_hit()
    }

    pub(crate) fn in_activation(&self) -> bool {
        self.0.in_activation()
    }

    pub(crate) fn export_invocation_id(&self) {
        self.0.export_invocation_id()
    }

    pub(crate) fn notify_message(
        &self,
        ucred: &UnixCredentials,
        messages: &HashMap<&str, &str>,
        fds: Vec<i32>,
    ) -> Result<()> {
        self.0.notify_message(ucred, messages, fds)
    }

    pub(crate) fn serialize(&self) -> Vec<(String, String)> {
        self.0.serialize()
    }

    pub(crate) fn deserialize_item(&self, key: &str, value: &str) -> Result<()> {
        self.0.deserialize_item(key, value)
    }

    pub(crate) fn set_sub_property(
        &self,
        key: &str,
        value: &str,
        flags: UnitWriteFlags,
    ) -> Result<()> {
        self.0.set_sub_property(key, value, flags)
    }

    pub(crate) fn set_property(&self, key: &str, value: &str) -> Result<()> {
        self.0.set_property(key, value)
    }

    pub(crate) fn write_settingf(
        &self,
        ps: &str,
        flags: UnitWriteFlags,
        name: &str,
        args: Arguments<'_>,
    ) -> Result<()> {
        let unit = self.unit();
        unit::unit_write_settingf(unit, ps, flags, name, args)
    }

    pub(crate) fn unit(&self) -> Rc<Unit> {
        Rc::clone(&self.0)
    }
}

impl Deref for UnitX {
    type Target = Rc<Unit>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
