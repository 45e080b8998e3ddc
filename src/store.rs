use crate::path::{is_prefix, Key, StatePath};

use serde_json::{Map, Value};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// The application state a router keeps in sync with the URL.
///
/// Writes are buffered: [`set`](StateStore::set) records a change and
/// [`commit`](StateStore::commit) notifies the watchers. Notifications are
/// expected to be synchronous, and a store must not hold any internal borrow
/// while it runs them, since a watcher may read from and write to the store.
pub trait StateStore {
    /// Reads the value at `path`. An empty path reads the whole state.
    fn get(&self, path: &[Key]) -> Option<Value>;

    /// Writes a value at `path`, creating missing parents.
    fn set(&self, path: &[Key], value: Value);

    /// Flushes pending writes and notifies the relevant watchers.
    fn commit(&self);

    /// Calls `on_update` after every commit that wrote to one of `paths`
    /// (or to a parent or a child of one of them).
    fn watch(&self, paths: Vec<StatePath>, on_update: Box<dyn Fn()>) -> Subscription;

    /// Marks the store as bound to a router. Returns `false` if it already
    /// was.
    fn bind_router(&self) -> bool;

    /// Releases the binding made by [`bind_router`](StateStore::bind_router).
    fn unbind_router(&self);
}

/// A registered watcher. Releasing it, or dropping it, stops notifications.
pub struct Subscription {
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + 'static) -> Self {
        Subscription {
            release: Some(Box::new(release)),
        }
    }

    pub fn release(mut self) {
        self.unsubscribe();
    }

    fn unsubscribe(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

struct Watcher {
    id: usize,
    paths: Vec<StatePath>,
    on_update: Rc<dyn Fn()>,
}

impl Watcher {
    fn concerns(&self, written: &[StatePath]) -> bool {
        self.paths.is_empty()
            || self.paths.iter().any(|path| {
                written
                    .iter()
                    .any(|write| is_prefix(path, write) || is_prefix(write, path))
            })
    }
}

/// A [`StateStore`] over an in-memory JSON tree.
///
/// ```
/// use serde_json::json;
/// use stateroute::{state_path, MemoryStore, StateStore};
///
/// let store = MemoryStore::new(json!({ "data": { "pid": null } }));
/// store.set(&state_path(["data", "pid"]), json!("123"));
/// store.commit();
///
/// assert_eq!(store.snapshot(), json!({ "data": { "pid": "123" } }));
/// ```
#[derive(Default)]
pub struct MemoryStore {
    data: RefCell<Value>,
    written: RefCell<Vec<StatePath>>,
    watchers: Rc<RefCell<Vec<Watcher>>>,
    next_id: Cell<usize>,
    bound: Cell<bool>,
}

impl MemoryStore {
    pub fn new(initial: Value) -> Self {
        MemoryStore {
            data: RefCell::new(initial),
            ..Default::default()
        }
    }

    /// Returns a copy of the whole state.
    pub fn snapshot(&self) -> Value {
        self.data.borrow().clone()
    }

    /// Returns true if a router is bound to this store.
    pub fn is_bound(&self) -> bool {
        self.bound.get()
    }
}

impl StateStore for MemoryStore {
    fn get(&self, path: &[Key]) -> Option<Value> {
        lookup(&self.data.borrow(), path).cloned()
    }

    fn set(&self, path: &[Key], value: Value) {
        assign(&mut self.data.borrow_mut(), path, value);
        self.written.borrow_mut().push(path.to_vec());
    }

    fn commit(&self) {
        let written = self.written.take();
        if written.is_empty() {
            return;
        }

        // collected first: a watcher may commit again
        let notified: Vec<Rc<dyn Fn()>> = self
            .watchers
            .borrow()
            .iter()
            .filter(|watcher| watcher.concerns(&written))
            .map(|watcher| Rc::clone(&watcher.on_update))
            .collect();

        for on_update in notified {
            on_update();
        }
    }

    fn watch(&self, paths: Vec<StatePath>, on_update: Box<dyn Fn()>) -> Subscription {
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        self.watchers.borrow_mut().push(Watcher {
            id,
            paths,
            on_update: Rc::from(on_update),
        });

        let watchers: Weak<RefCell<Vec<Watcher>>> = Rc::downgrade(&self.watchers);
        Subscription::new(move || {
            if let Some(watchers) = watchers.upgrade() {
                watchers.borrow_mut().retain(|watcher| watcher.id != id);
            }
        })
    }

    fn bind_router(&self) -> bool {
        !self.bound.replace(true)
    }

    fn unbind_router(&self) {
        self.bound.set(false);
    }
}

/// Reads the value at `path` in a tree.
pub fn lookup<'a>(tree: &'a Value, path: &[Key]) -> Option<&'a Value> {
    path.iter().try_fold(tree, |node, key| match (node, key) {
        (Value::Object(map), Key::Field(field)) => map.get(field),
        (Value::Array(items), Key::Index(i)) => items.get(*i),
        _ => None,
    })
}

/// Writes `value` at `path` in a tree, creating (or replacing) the parents
/// that are missing or of the wrong shape. Sequences are padded with `null`.
pub fn assign(tree: &mut Value, path: &[Key], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        *tree = value;
        return;
    };

    let mut node = tree;
    for key in parents {
        node = child_mut(node, key);
    }
    *child_mut(node, last) = value;
}

fn child_mut<'a>(node: &'a mut Value, key: &Key) -> &'a mut Value {
    match key {
        Key::Field(field) => {
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            match node {
                Value::Object(map) => map.entry(field.clone()).or_insert(Value::Null),
                _ => unreachable!("replaced by an object above"),
            }
        }
        Key::Index(i) => {
            if !node.is_array() {
                *node = Value::Array(Vec::new());
            }
            match node {
                Value::Array(items) => {
                    if items.len() <= *i {
                        items.resize(i + 1, Value::Null);
                    }
                    &mut items[*i]
                }
                _ => unreachable!("replaced by an array above"),
            }
        }
    }
}
