use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::device::Size;

use super::primary::PrimaryInner;

/// Live primary renderers keyed by canvas size.
///
/// Several primaries may share a size; lookups return the most recently
/// registered one that is still alive.
#[derive(Default)]
pub(crate) struct Registry {
    entries: HashMap<Size, Vec<Weak<PrimaryInner>>>,
}

impl Registry {
    pub fn insert(&mut self, size: Size, primary: &Rc<PrimaryInner>) {
        self.entries
            .entry(size)
            .or_default()
            .push(Rc::downgrade(primary));
        log::debug!("registered primary renderer for {size}");
    }

    pub fn lookup(&self, size: Size) -> Option<Rc<PrimaryInner>> {
        self.entries
            .get(&size)?
            .iter()
            .rev()
            .filter_map(Weak::upgrade)
            .find(|p| !p.is_destroyed())
    }

    /// Removes `primary` and any dead entries of the same size.
    pub fn remove(&mut self, size: Size, primary: &Rc<PrimaryInner>) {
        let Some(list) = self.entries.get_mut(&size) else {
            return;
        };
        let target = Rc::downgrade(primary);
        list.retain(|w| !w.ptr_eq(&target) && w.strong_count() > 0);
        if list.is_empty() {
            self.entries.remove(&size);
        }
        log::debug!("unregistered primary renderer for {size}");
    }

    /// Number of registered live primaries.
    pub fn len(&self) -> usize {
        self.entries
            .values()
            .flatten()
            .filter(|w| w.strong_count() > 0)
            .count()
    }
}
