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

//! A keyed table with registered subscribers. Every insert or remove is
//! pushed to all subscribers synchronously, which is how the data layer
//! talks to the engine without holding a reference to it.
use std::cell::RefCell;
use std::collections::HashMap;
use std::hash::Hash;
use std::rc::Rc;

/// the change a subscriber is notified about
pub enum TableOp<'a, K, V> {
    /// a key has been inserted or replaced
    TableInsert(&'a K, &'a V),
    /// a key has been removed, carrying the dropped value
    TableRemove(&'a K, &'a V),
}

/// the callback every subscriber implements
pub trait TableSubscribe<K, V> {
    /// process the table change
    fn notify(&self, op: &TableOp<K, V>);
}

pub struct Table<K, V> {
    data: RefCell<HashMap<K, V>>,
    subscribers: RefCell<HashMap<String, Rc<dyn TableSubscribe<K, V>>>>,
}

impl<K, V> Table<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Table<K, V> {
        Table {
            data: RefCell::new(HashMap::new()),
            subscribers: RefCell::new(HashMap::new()),
        }
    }

    pub fn subscribe(
        &self,
        name: String,
        subscriber: Rc<dyn TableSubscribe<K, V>>,
    ) -> Option<Rc<dyn TableSubscribe<K, V>>> {
        self.subscribers.borrow_mut().insert(name, subscriber)
    }

    pub fn insert(&self, k: K, v: V) -> Option<V> {
        let old = self.data.borrow_mut().insert(k.clone(), v.clone());
        self.notify(&TableOp::TableInsert(&k, &v));
        old
    }

    pub fn remove(&self, k: &K) -> Option<V> {
        let old = self.data.borrow_mut().remove(k);
        if let Some(ref v) = old {
            self.notify(&TableOp::TableRemove(k, v));
        }
        old
    }

    pub fn get(&self, k: &K) -> Option<V> {
        self.data.borrow().get(k).cloned()
    }

    pub fn values(&self) -> Vec<V> {
        self.data.borrow().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.data.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.borrow().is_empty()
    }

    /// drop the data, but keep the subscribers registered
    pub fn data_clear(&self) {
        self.data.borrow_mut().clear();
    }

    /// drop the data and the subscribers
    pub fn clear(&self) {
        self.data.borrow_mut().clear();
        self.subscribers.borrow_mut().clear();
    }

    fn notify(&self, op: &TableOp<K, V>) {
        for (_, subscriber) in self.subscribers.borrow().iter() {
            subscriber.notify(op);
        }
    }
}

impl<K, V> Default for Table<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Table::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Counter {
        adds: RefCell<u32>,
        dels: RefCell<u32>,
    }

    impl Counter {
        fn new() -> Counter {
            Counter {
                adds: RefCell::new(0),
                dels: RefCell::new(0),
            }
        }
    }

    impl TableSubscribe<String, u32> for Counter {
        fn notify(&self, op: &TableOp<String, u32>) {
            match op {
                TableOp::TableInsert(_, _) => *self.adds.borrow_mut() += 1,
                TableOp::TableRemove(_, _) => *self.dels.borrow_mut() += 1,
            }
        }
    }

    #[test]
    fn table_insert_remove() {
        let table: Table<String, u32> = Table::new();
        assert!(table.is_empty());

        let old = table.insert(String::from("a"), 1);
        assert_eq!(old, None);
        let old = table.insert(String::from("a"), 2);
        assert_eq!(old, Some(1));
        assert_eq!(table.get(&String::from("a")), Some(2));
        assert_eq!(table.len(), 1);

        let old = table.remove(&String::from("a"));
        assert_eq!(old, Some(2));
        assert!(table.get(&String::from("a")).is_none());
    }

    #[test]
    fn table_subscribe() {
        let table: Table<String, u32> = Table::new();
        let counter = Rc::new(Counter::new());
        let sub = Rc::clone(&counter);
        assert!(table.subscribe(String::from("counter"), sub).is_none());

        table.insert(String::from("a"), 1);
        table.insert(String::from("b"), 2);
        table.remove(&String::from("a"));
        table.remove(&String::from("missing"));

        assert_eq!(*counter.adds.borrow(), 2);
        assert_eq!(*counter.dels.borrow(), 1);
    }
}
