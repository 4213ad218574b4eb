// Licensed under the Apache-2.0 license

use core::ops::Deref;
use core::ptr::NonNull;

/// `&'static` view of a register block at a fixed physical address.
#[derive(Debug)]
pub struct StaticRef<T> {
    ptr: NonNull<T>,
}

impl<T> StaticRef<T> {
    /// # Safety
    ///
    /// `ptr` must be non-null, valid for the whole program and not aliased by
    /// any other `StaticRef` or Rust reference.
    pub const unsafe fn new(ptr: *const T) -> StaticRef<T> {
        StaticRef {
            ptr: NonNull::new_unchecked(ptr as *mut T),
        }
    }
}

impl<T> Clone for StaticRef<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for StaticRef<T> {}

impl<T> Deref for StaticRef<T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { self.ptr.as_ref() }
    }
}
