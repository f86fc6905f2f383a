//! # Shared ownership of pool records
//!
//! Every public handle wraps a [`Shared`]: the graphics context plus the id of
//! one record in one of its pools. Cloning bumps the record's usage counter,
//! dropping decrements it, and the owning manager frees the record when the
//! counter reaches zero.
//!
//! Records live in fixed arenas rather than on the heap, so this is a hand
//! rolled counted handle instead of an `Rc` per record.

use alloc::rc::Rc;
use core::cell::RefCell;
use core::fmt::{Debug, Formatter};
use core::marker::PhantomData;
use log::error;

use crate::managers::Managers;

/// A pool whose records can be shared through [`Shared`].
pub trait Resource {
    const NAME: &'static str;

    fn increase_usages(managers: &mut Managers, id: u16);

    /// Drops one usage, freeing the record when it was the last one.
    fn decrease_usages(managers: &mut Managers, id: u16);
}

pub struct Shared<K: Resource> {
    managers: Rc<RefCell<Managers>>,
    // None once ownership moved out through `into_id`
    id: Option<u16>,
    kind: PhantomData<K>,
}

impl<K: Resource> Shared<K> {
    /// Wraps a record id, taking over one usage the caller already counted.
    pub(crate) fn adopt(managers: Rc<RefCell<Managers>>, id: u16) -> Self {
        Self {
            managers,
            id: Some(id),
            kind: PhantomData,
        }
    }

    #[inline]
    pub fn id(&self) -> u16 {
        match self.id {
            Some(id) => id,
            None => panic!("{} handle used after release", K::NAME),
        }
    }

    /// Gives the usage held by this handle back to the caller, who must store
    /// the id somewhere that eventually decrements it.
    pub(crate) fn into_id(mut self) -> u16 {
        match self.id.take() {
            Some(id) => id,
            None => panic!("{} handle used after release", K::NAME),
        }
    }

    pub(crate) fn managers(&self) -> &Rc<RefCell<Managers>> {
        &self.managers
    }

    pub(crate) fn same_context(&self, managers: &Rc<RefCell<Managers>>) -> bool {
        Rc::ptr_eq(&self.managers, managers)
    }

    /// Runs `f` with exclusive access to the managers. Panics on re-entrant use.
    pub(crate) fn with<R>(&self, f: impl FnOnce(&mut Managers, u16) -> R) -> R {
        let id = self.id();
        let mut managers = self.managers.borrow_mut();
        f(&mut managers, id)
    }
}

impl<K: Resource> Clone for Shared<K> {
    fn clone(&self) -> Self {
        let id = self.id();
        K::increase_usages(&mut self.managers.borrow_mut(), id);
        Self::adopt(self.managers.clone(), id)
    }
}

impl<K: Resource> Drop for Shared<K> {
    fn drop(&mut self) {
        let Some(id) = self.id.take() else {
            return;
        };

        match self.managers.try_borrow_mut() {
            Ok(mut managers) => K::decrease_usages(&mut managers, id),
            Err(_) if unwinding() => {
                error!("{} {} dropped while unwinding out of a manager call, usage leaked", K::NAME, id);
            }
            Err(_) => panic!("{} {} dropped while the managers were busy", K::NAME, id),
        }
    }
}

#[cfg(any(test, feature = "std"))]
fn unwinding() -> bool {
    std::thread::panicking()
}

// no_std cannot tell, so every busy drop is misuse
#[cfg(not(any(test, feature = "std")))]
fn unwinding() -> bool {
    false
}

impl<K: Resource> PartialEq for Shared<K> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Rc::ptr_eq(&self.managers, &other.managers)
    }
}

impl<K: Resource> Eq for Shared<K> {}

impl<K: Resource> Debug for Shared<K> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}({:?})", K::NAME, self.id)
    }
}
