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

use super::super::base;
use super::sets::UnitSets;
use super::UnitX;
use crate::utils::table::{TableOp, TableSubscribe};
use core::error::*;
use core::unit::{UnitDependencyMask, UnitRelationAtom, UnitRelations};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub(super) struct UnitDep {
    sub_name: String, // key for table-subscriber: UnitSets
    sub: Rc<UnitDepSub>,
}

impl UnitDep {
    pub(super) fn new(unitsr: &Rc<UnitSets>) -> UnitDep {
        let ud = UnitDep {
            sub_name: String::from("UnitDep"),
            sub: Rc::new(UnitDepSub::new()),
        };
        ud.register(unitsr);
        ud
    }

    pub(super) fn entry_clear(&self) {
        self.sub.data.borrow_mut().clear();
    }

    pub(super) fn insert(
        &self,
        source: Rc<UnitX>,
        relation: UnitRelations,
        dest: Rc<UnitX>,
        reference: bool,
        mask: UnitDependencyMask,
    ) -> Result<()> {
        source.dep_check(relation, &dest)?;
        self.sub
            .data
            .borrow_mut()
            .insert(source, relation, dest, reference, mask);
        Ok(())
    }

    #[allow(dead_code)]
    pub(super) fn remove(&self, source: &UnitX, relation: UnitRelations, dest: &UnitX) {
        self.sub.data.borrow_mut().remove(source, relation, dest)
    }

    pub(super) fn remove_mask(&self, source: &UnitX, mask: UnitDependencyMask) {
        self.sub.data.borrow_mut().remove_mask(source, mask)
    }

    /// move every edge touching `other` over to `u`, keeping the recorded
    /// reasons of both end-points
    pub(super) fn merge_from(&self, u: &Rc<UnitX>, other: &UnitX) {
        let edges = self.sub.data.borrow().edges_of(other);
        for (relation, dest, mask) in edges {
            self.sub.data.borrow_mut().remove(other, relation, &dest);
            if dest.as_ref() == u.as_ref() {
                /* an edge between the merging pair dies with the merge */
                continue;
            }
            self.sub
                .data
                .borrow_mut()
                .insert_migrated(Rc::clone(u), relation, dest, mask);
        }
    }

    pub(super) fn gets(&self, source: &UnitX, relation: UnitRelations) -> Vec<Rc<UnitX>> {
        self.sub.data.borrow().gets(source, relation)
    }

    pub(super) fn gets_atom(&self, source: &UnitX, atom: UnitRelationAtom) -> Vec<Rc<UnitX>> {
        let mut dests = Vec::new();
        for relation in base::unit_relation_from_unique_atom(atom).iter() {
            dests.append(&mut self.gets(source, *relation));
        }
        dests
    }

    pub(super) fn is_dep_with(
        &self,
        source: &UnitX,
        relation: UnitRelations,
        dest: &UnitX,
    ) -> bool {
        self.sub.data.borrow().is_dep_with(source, relation, dest)
    }

    pub(super) fn is_dep_atom_with(
        &self,
        source: &UnitX,
        atom: UnitRelationAtom,
        dest: &UnitX,
    ) -> bool {
        for relation in base::unit_relation_from_unique_atom(atom).iter() {
            if self.is_dep_with(source, *relation, dest) {
                // something hits
                return true;
            }
        }
        false
    }

    fn register(&self, unitsr: &UnitSets) {
        let subscriber = Rc::clone(&self.sub);
        unitsr.register(&self.sub_name, subscriber);
    }
}

struct UnitDepSub {
    data: RefCell<UnitDepData>,
}

impl TableSubscribe<String, Rc<UnitX>> for UnitDepSub {
    fn notify(&self, op: &TableOp<String, Rc<UnitX>>) {
        match op {
            TableOp::TableInsert(_, _) => {} // do nothing
            TableOp::TableRemove(_, unit) => self.remove_unit(unit),
        }
    }
}

// the declaration "pub(self)" is for identification only.
impl UnitDepSub {
    pub(self) fn new() -> UnitDepSub {
        UnitDepSub {
            data: RefCell::new(UnitDepData::new()),
        }
    }

    fn remove_unit(&self, unit: &UnitX) {
        self.data.borrow_mut().remove_unit(unit)
    }
}

/// the reason an edge exists, kept for both end-points
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct UnitDepMask {
    source: UnitDependencyMask,
    dest: UnitDependencyMask,
}

impl UnitDepMask {
    fn new(s_mask: UnitDependencyMask, d_mask: UnitDependencyMask) -> UnitDepMask {
        UnitDepMask {
            source: s_mask,
            dest: d_mask,
        }
    }

    fn empty() -> UnitDepMask {
        UnitDepMask::new(UnitDependencyMask::empty(), UnitDependencyMask::empty())
    }

    fn or(&mut self, other: &UnitDepMask) {
        self.source |= other.source;
        self.dest |= other.dest;
    }

    fn reduce_source(&mut self, mask: UnitDependencyMask) {
        self.source.remove(mask);
    }

    fn reduce_dest(&mut self, mask: UnitDependencyMask) {
        self.dest.remove(mask);
    }

    fn is_empty(&self) -> bool {
        self.source.is_empty() && self.dest.is_empty()
    }
}

#[allow(clippy::type_complexity)]
struct UnitDepData {
    // key: unit-source + UnitRelations, value: (unit-destination : mask)-list
    t: HashMap<Rc<UnitX>, HashMap<UnitRelations, HashMap<Rc<UnitX>, UnitDepMask>>>,
}

// the declaration "pub(self)" is for identification only.
impl UnitDepData {
    pub(self) fn new() -> UnitDepData {
        UnitDepData { t: HashMap::new() }
    }

    pub(self) fn clear(&mut self) {
        self.t.clear();
    }

    pub(self) fn insert(
        &mut self,
        source: Rc<UnitX>,
        relation: UnitRelations,
        dest: Rc<UnitX>,
        reference: bool,
        mask: UnitDependencyMask,
    ) {
        // check input
        if source.as_ref() == dest.as_ref() {
            return;
        }

        let mask = UnitDepMask::new(mask, UnitDependencyMask::empty());
        let mask_inverse = UnitDepMask::new(UnitDependencyMask::empty(), mask.source);
        let relation_inverse = base::unit_relation_to_inverse(relation);

        // insert in two-directions way, merging the reason into what is
        // already recorded for the pair
        self.insert_one_way(Rc::clone(&source), relation, Rc::clone(&dest), mask);
        self.insert_one_way(
            Rc::clone(&dest),
            relation_inverse,
            Rc::clone(&source),
            mask_inverse,
        );

        // process reference in two-directions way
        if reference {
            let ref_relation = UnitRelations::UnitReferences;
            let ref_relation_inverse = base::unit_relation_to_inverse(ref_relation);
            self.insert_one_way(Rc::clone(&source), ref_relation, Rc::clone(&dest), mask);
            self.insert_one_way(
                Rc::clone(&dest),
                ref_relation_inverse,
                Rc::clone(&source),
                mask_inverse,
            );
        }
    }

    pub(self) fn remove(&mut self, source: &UnitX, relation: UnitRelations, dest: &UnitX) {
        // remove in two-directions way
        let relation_inverse = base::unit_relation_to_inverse(relation);
        self.remove_one_way(source, relation, dest);
        self.remove_one_way(dest, relation_inverse, source);
    }

    pub(self) fn remove_unit(&mut self, source: &UnitX) {
        if let Some(sv) = self.t.get(source) {
            let mut removes = Vec::new();
            for (relation, dv) in sv.iter() {
                for (dest, _) in dv.iter() {
                    removes.push((*relation, Rc::clone(dest)));
                }
            }

            for (relation, dest) in removes.iter() {
                self.remove(source, *relation, dest);
            }
        }
    }

    pub(self) fn remove_mask(&mut self, source: &UnitX, mask: UnitDependencyMask) {
        let edges = match self.t.get(source) {
            None => return,
            Some(sv) => {
                let mut es = Vec::new();
                for (relation, dv) in sv.iter() {
                    for (dest, _) in dv.iter() {
                        es.push((*relation, Rc::clone(dest)));
                    }
                }
                es
            }
        };

        // strip only the reasons this unit contributed; the other end-point
        // keeps whatever its own configuration recorded for the pair. an edge
        // left with no reason at all is dropped in both directions
        for (relation, dest) in edges.iter() {
            let relation_inverse = base::unit_relation_to_inverse(*relation);
            let empty = self.reduce_one_way(source, *relation, dest, mask, true);
            self.reduce_one_way(dest, relation_inverse, source, mask, false);
            if empty {
                self.remove_one_way(source, *relation, dest);
                self.remove_one_way(dest, relation_inverse, source);
            }
        }
    }

    pub(self) fn gets(&self, source: &UnitX, relation: UnitRelations) -> Vec<Rc<UnitX>> {
        let mut dests = Vec::new();

        if let Some(sv) = self.t.get(source) {
            if let Some(dv) = sv.get(&relation) {
                dests.append(
                    &mut dv
                        .iter()
                        .map(|(destr, _)| Rc::clone(destr))
                        .collect::<Vec<_>>(),
                );
            }
        }

        dests
    }

    pub(self) fn edges_of(&self, source: &UnitX) -> Vec<(UnitRelations, Rc<UnitX>, UnitDepMask)> {
        let mut es = Vec::new();
        if let Some(sv) = self.t.get(source) {
            for (relation, dv) in sv.iter() {
                for (dest, mask) in dv.iter() {
                    es.push((*relation, Rc::clone(dest), *mask));
                }
            }
        }
        es
    }

    pub(self) fn insert_migrated(
        &mut self,
        source: Rc<UnitX>,
        relation: UnitRelations,
        dest: Rc<UnitX>,
        mask: UnitDepMask,
    ) {
        let relation_inverse = base::unit_relation_to_inverse(relation);
        let mask_inverse = UnitDepMask::new(mask.dest, mask.source);
        self.insert_one_way(Rc::clone(&source), relation, Rc::clone(&dest), mask);
        self.insert_one_way(dest, relation_inverse, source, mask_inverse);
    }

    pub(self) fn is_dep_with(&self, source: &UnitX, relation: UnitRelations, dest: &UnitX) -> bool {
        if let Some(sv) = self.t.get(source) {
            if let Some(dv) = sv.get(&relation) {
                return dv.contains_key(dest);
            }
        }

        false
    }

    fn insert_one_way(
        &mut self,
        source: Rc<UnitX>,
        relation: UnitRelations,
        dest: Rc<UnitX>,
        mask: UnitDepMask,
    ) {
        self.get_mut_dv_pad(source, relation)
            .entry(dest)
            .or_insert_with(UnitDepMask::empty)
            .or(&mask);
    }

    fn remove_one_way(&mut self, source: &UnitX, relation: UnitRelations, dest: &UnitX) {
        let sv = match self.t.get_mut(source) {
            None => return,
            Some(v) => v,
        };
        let map = match sv.get_mut(&relation) {
            None => return,
            Some(v) => v,
        };
        /* remove the 3-level HashMap from bottom to top. */
        map.remove(dest);
        if map.is_empty() {
            sv.remove(&relation);
        }
        if sv.is_empty() {
            self.t.remove(source); // remove unit-entry to release the key 'Rc<Unit>'
        }
    }

    fn reduce_one_way(
        &mut self,
        source: &UnitX,
        relation: UnitRelations,
        dest: &UnitX,
        mask: UnitDependencyMask,
        own_side: bool,
    ) -> bool {
        let sv = match self.t.get_mut(source) {
            None => return false,
            Some(v) => v,
        };
        let dv = match sv.get_mut(&relation) {
            None => return false,
            Some(v) => v,
        };
        match dv.get_mut(dest) {
            None => false,
            Some(m) => {
                if own_side {
                    m.reduce_source(mask);
                } else {
                    m.reduce_dest(mask);
                }
                m.is_empty()
            }
        }
    }

    fn get_mut_sv_pad(
        &mut self,
        source: Rc<UnitX>,
    ) -> &mut HashMap<UnitRelations, HashMap<Rc<UnitX>, UnitDepMask>> {
        // verify existence
        if self.t.get(&source).is_none() {
            // nothing exists, pad it.
            self.t.insert(Rc::clone(&source), HashMap::new());
        }

        // return the one that must exist
        self.t
            .get_mut(&source)
            .expect("something inserted is not found.")
    }

    fn get_mut_dv_pad(
        &mut self,
        source: Rc<UnitX>,
        relation: UnitRelations,
    ) -> &mut HashMap<Rc<UnitX>, UnitDepMask> {
        // verify existence
        let sv = self.get_mut_sv_pad(source);
        if sv.get(&relation).is_none() {
            // nothing exists, pad it.
            sv.insert(relation, HashMap::new());
        }

        // return the one that must exist
        sv.get_mut(&relation)
            .expect("something inserted is not found.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::data::DataManager;
    use crate::unit::test::test_utils;

    #[test]
    fn dep_insert() {
        let dm = Rc::new(DataManager::new());
        let sets = UnitSets::new();
        let dep = UnitDep::new(&Rc::new(sets));
        let name_test1 = String::from("test1.target");
        let unit_test1 = create_unit(&dm, &name_test1);
        let name_test2 = String::from("test2.target");
        let unit_test2 = create_unit(&dm, &name_test2);
        let name_test3 = String::from("test3.target");
        let unit_test3 = create_unit(&dm, &name_test3);
        let relation = UnitRelations::UnitRequires;

        let old = dep.insert(
            Rc::clone(&unit_test1),
            relation,
            Rc::clone(&unit_test2),
            true,
            UnitDependencyMask::FILE,
        );
        assert!(old.is_ok());

        let old = dep.insert(
            Rc::clone(&unit_test1),
            relation,
            Rc::clone(&unit_test3),
            true,
            UnitDependencyMask::FILE,
        );
        assert!(old.is_ok());

        let old = dep.insert(
            Rc::clone(&unit_test2),
            relation,
            Rc::clone(&unit_test3),
            true,
            UnitDependencyMask::FILE,
        );
        assert!(old.is_ok());

        // a unit cannot depend on itself
        let old = dep.insert(
            Rc::clone(&unit_test1),
            relation,
            Rc::clone(&unit_test1),
            true,
            UnitDependencyMask::FILE,
        );
        assert!(old.is_err());
    }

    #[test]
    fn dep_gets_atom() {
        let dm = Rc::new(DataManager::new());
        let sets = UnitSets::new();
        let dep = UnitDep::new(&Rc::new(sets));
        let name_test1 = String::from("test1.target");
        let unit_test1 = create_unit(&dm, &name_test1);
        let name_test2 = String::from("test2.target");
        let unit_test2 = create_unit(&dm, &name_test2);
        let name_test3 = String::from("test3.target");
        let unit_test3 = create_unit(&dm, &name_test3);
        let relation2 = UnitRelations::UnitRequires;
        let relation3 = UnitRelations::UnitWants;
        let atom2 = UnitRelationAtom::UnitAtomPullInStart; // + require, - want
        let atom3 = UnitRelationAtom::UnitAtomPullInStartIgnored; // - require, + want
        let atom = UnitRelationAtom::UnitAtomAddStopWhenUnneededQueue; // + require, + want

        let units = dep.gets_atom(&unit_test1, atom2);
        assert_eq!(units.len(), 0);

        dep.insert(
            Rc::clone(&unit_test1),
            relation2,
            Rc::clone(&unit_test2),
            true,
            UnitDependencyMask::FILE,
        )
        .unwrap();
        dep.insert(
            Rc::clone(&unit_test1),
            relation3,
            Rc::clone(&unit_test3),
            true,
            UnitDependencyMask::FILE,
        )
        .unwrap();

        let units = dep.gets_atom(&unit_test1, atom2);
        assert_eq!(units.len(), 1);
        assert!(contain_unit(&units, &unit_test2));
        assert!(!contain_unit(&units, &unit_test3));

        let units = dep.gets_atom(&unit_test1, atom3);
        assert_eq!(units.len(), 1);
        assert!(!contain_unit(&units, &unit_test2));
        assert!(contain_unit(&units, &unit_test3));

        let units = dep.gets_atom(&unit_test1, atom);
        assert_eq!(units.len(), 2);
        assert!(contain_unit(&units, &unit_test2));
        assert!(contain_unit(&units, &unit_test3));
    }

    #[test]
    fn dep_is_dep_atom_with() {
        let dm = Rc::new(DataManager::new());
        let sets = UnitSets::new();
        let dep = UnitDep::new(&Rc::new(sets));
        let name_test1 = String::from("test1.target");
        let unit_test1 = create_unit(&dm, &name_test1);
        let name_test2 = String::from("test2.target");
        let unit_test2 = create_unit(&dm, &name_test2);
        let relation2 = UnitRelations::UnitRequires;
        let atom2 = UnitRelationAtom::UnitAtomPullInStart;
        let atom3 = UnitRelationAtom::UnitAtomPullInStartIgnored;

        let value = dep.is_dep_atom_with(&unit_test1, atom2, &unit_test2);
        assert!(!value);

        dep.insert(
            Rc::clone(&unit_test1),
            relation2,
            Rc::clone(&unit_test2),
            true,
            UnitDependencyMask::FILE,
        )
        .unwrap();
        let value = dep.is_dep_atom_with(&unit_test1, atom2, &unit_test2);
        assert!(value);
        let value = dep.is_dep_atom_with(&unit_test1, atom3, &unit_test2);
        assert!(!value);
    }

    #[test]
    fn dep_insert_merges_masks() {
        let dm = Rc::new(DataManager::new());
        let sets = UnitSets::new();
        let dep = UnitDep::new(&Rc::new(sets));
        let name_test1 = String::from("test1.target");
        let unit_test1 = create_unit(&dm, &name_test1);
        let name_test2 = String::from("test2.target");
        let unit_test2 = create_unit(&dm, &name_test2);
        let relation = UnitRelations::UnitRequires;

        dep.insert(
            Rc::clone(&unit_test1),
            relation,
            Rc::clone(&unit_test2),
            false,
            UnitDependencyMask::FILE,
        )
        .unwrap();
        dep.insert(
            Rc::clone(&unit_test1),
            relation,
            Rc::clone(&unit_test2),
            false,
            UnitDependencyMask::DEFAULT,
        )
        .unwrap();

        // repeated inserts do not duplicate the edge
        let units = dep.gets(&unit_test1, relation);
        assert_eq!(units.len(), 1);

        // the first reason alone does not detach the pair
        dep.remove_mask(&unit_test1, UnitDependencyMask::FILE);
        assert!(dep.is_dep_with(&unit_test1, relation, &unit_test2));
        assert!(dep.is_dep_with(
            &unit_test2,
            UnitRelations::UnitRequiredBy,
            &unit_test1
        ));

        // the last reason does
        dep.remove_mask(&unit_test1, UnitDependencyMask::DEFAULT);
        assert!(!dep.is_dep_with(&unit_test1, relation, &unit_test2));
        assert!(!dep.is_dep_with(
            &unit_test2,
            UnitRelations::UnitRequiredBy,
            &unit_test1
        ));
    }

    #[test]
    fn dep_remove_mask_spares_other_owners_reasons() {
        let dm = Rc::new(DataManager::new());
        let sets = UnitSets::new();
        let dep = UnitDep::new(&Rc::new(sets));
        let name_test1 = String::from("test1.target");
        let unit_test1 = create_unit(&dm, &name_test1);
        let name_test2 = String::from("test2.target");
        let unit_test2 = create_unit(&dm, &name_test2);
        let name_test3 = String::from("test3.target");
        let unit_test3 = create_unit(&dm, &name_test3);

        // test1's own fragment wants test2, test3's fragment wants test1
        dep.insert(
            Rc::clone(&unit_test1),
            UnitRelations::UnitWants,
            Rc::clone(&unit_test2),
            false,
            UnitDependencyMask::FILE,
        )
        .unwrap();
        dep.insert(
            Rc::clone(&unit_test3),
            UnitRelations::UnitWants,
            Rc::clone(&unit_test1),
            false,
            UnitDependencyMask::FILE,
        )
        .unwrap();

        dep.remove_mask(&unit_test1, UnitDependencyMask::FILE);

        // only the edge test1's configuration contributed has gone
        assert!(!dep.is_dep_with(&unit_test1, UnitRelations::UnitWants, &unit_test2));
        assert!(dep.is_dep_with(&unit_test3, UnitRelations::UnitWants, &unit_test1));
        assert!(dep.is_dep_with(&unit_test1, UnitRelations::UnitWantedBy, &unit_test3));
    }

    #[test]
    fn dep_remove_mask_releases_refs() {
        let dm = Rc::new(DataManager::new());
        let sets = UnitSets::new();
        let dep = UnitDep::new(&Rc::new(sets));
        let name_test1 = String::from("test1.target");
        let unit_test1 = create_unit(&dm, &name_test1);
        let name_test2 = String::from("test2.target");
        let unit_test2 = create_unit(&dm, &name_test2);

        dep.insert(
            Rc::clone(&unit_test1),
            UnitRelations::UnitRequires,
            Rc::clone(&unit_test2),
            true,
            UnitDependencyMask::API,
        )
        .unwrap();
        assert!(dep.is_dep_with(&unit_test1, UnitRelations::UnitReferences, &unit_test2));
        assert!(dep.is_dep_atom_with(
            &unit_test2,
            UnitRelationAtom::UnitAtomReferencedBy,
            &unit_test1
        ));

        dep.remove_mask(&unit_test1, UnitDependencyMask::API);
        assert!(!dep.is_dep_with(&unit_test1, UnitRelations::UnitRequires, &unit_test2));
        assert!(!dep.is_dep_with(&unit_test1, UnitRelations::UnitReferences, &unit_test2));
        assert!(!dep.is_dep_atom_with(
            &unit_test2,
            UnitRelationAtom::UnitAtomReferencedBy,
            &unit_test1
        ));
    }

    fn create_unit(dmr: &Rc<DataManager>, name: &str) -> Rc<UnitX> {
        log::init_log_to_console("create_unit", log::Level::Trace);
        test_utils::create_unit_for_test_pub(dmr, name)
    }

    fn contain_unit(units: &[Rc<UnitX>], unit: &Rc<UnitX>) -> bool {
        for u in units.iter() {
            if Rc::ptr_eq(u, unit) {
                return true;
            }
        }

        false
    }
}
