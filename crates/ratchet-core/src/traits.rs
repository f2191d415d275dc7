//! Policies a vector consumes from its environment.
//!
//! A vector never owns the memory behind its elements. It only needs to
//! know how to take and drop references ([`Refcount`]) and, for bulk
//! persistence, how to turn an element into bytes and back ([`Serde`]).
//! Both are supplied as values when the vector is built.

use std::sync::Arc;

use crate::error::SerdeError;

/// Reference-count manipulation for elements of type `T`.
///
/// Implementations must be safe to call from any thread without
/// external locking: the vector calls `inc` and `dec` concurrently from
/// every appending, reading, and writing thread.
pub trait Refcount<T>: Send + Sync {
    /// Take one additional reference to `value`.
    fn inc(&self, value: T);

    /// Release one reference to `value`.
    fn dec(&self, value: T);
}

/// Byte-level encoding of elements of type `T` for persistence.
///
/// Implementations are pure: no shared mutable state, callable from
/// many loader threads at once. They may pick a compression scheme
/// based on payload size, as long as `load` can recover it from the
/// bytes alone.
pub trait Serde<T>: Send + Sync {
    /// Append the encoding of `value` to `out`.
    fn save(&self, value: T, out: &mut Vec<u8>) -> Result<(), SerdeError>;

    /// Decode one element from `bytes`.
    ///
    /// The returned element carries one reference owned by the caller.
    fn load(&self, bytes: &[u8]) -> Result<T, SerdeError>;
}

/// A [`Refcount`] for elements with no lifetime to manage (plain integers).
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopRefcount;

impl<T> Refcount<T> for NoopRefcount {
    fn inc(&self, _value: T) {}

    fn dec(&self, _value: T) {}
}

impl<T, R: Refcount<T> + ?Sized> Refcount<T> for Arc<R> {
    fn inc(&self, value: T) {
        (**self).inc(value)
    }

    fn dec(&self, value: T) {
        (**self).dec(value)
    }
}

impl<T, R: Refcount<T> + ?Sized> Refcount<T> for &R {
    fn inc(&self, value: T) {
        (**self).inc(value)
    }

    fn dec(&self, value: T) {
        (**self).dec(value)
    }
}

impl<T, S: Serde<T> + ?Sized> Serde<T> for Arc<S> {
    fn save(&self, value: T, out: &mut Vec<u8>) -> Result<(), SerdeError> {
        (**self).save(value, out)
    }

    fn load(&self, bytes: &[u8]) -> Result<T, SerdeError> {
        (**self).load(bytes)
    }
}
