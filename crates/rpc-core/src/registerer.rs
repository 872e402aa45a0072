//! Bulk registration with rollback.
//!
//! A service with several methods registers all of them for one topic as a
//! unit: either every method ends up bound, or none of the ones this call
//! bound remain.

use crate::error::RpcError;
use tracing::{debug, warn};

type RegisterFn<T> = Box<dyn Fn(&T) -> Result<(), RpcError> + Send + Sync>;

/// A register/deregister pair for one method, parameterized by topic.
pub struct Registerer<T: ?Sized> {
    register: RegisterFn<T>,
    deregister: RegisterFn<T>,
}

impl<T: ?Sized> Registerer<T> {
    pub fn new<R, D>(register: R, deregister: D) -> Self
    where
        R: Fn(&T) -> Result<(), RpcError> + Send + Sync + 'static,
        D: Fn(&T) -> Result<(), RpcError> + Send + Sync + 'static,
    {
        Self {
            register: Box::new(register),
            deregister: Box::new(deregister),
        }
    }
}

/// Ordered set of registerers applied together.
pub struct RegistererSet<T: ?Sized> {
    registerers: Vec<Registerer<T>>,
}

impl<T: ?Sized> Default for RegistererSet<T> {
    fn default() -> Self {
        Self {
            registerers: Vec::new(),
        }
    }
}

impl<T: ?Sized> RegistererSet<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`RegistererSet::push`].
    #[must_use]
    pub fn with(mut self, registerer: Registerer<T>) -> Self {
        self.push(registerer);
        self
    }

    pub fn push(&mut self, registerer: Registerer<T>) {
        self.registerers.push(registerer);
    }

    pub fn len(&self) -> usize {
        self.registerers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registerers.is_empty()
    }

    /// Register in order. On the first failure, deregister what this call
    /// already registered, in reverse order, and return that failure.
    ///
    /// Rollback failures are logged, never returned.
    pub fn register(&self, param: &T) -> Result<(), RpcError> {
        for (index, registerer) in self.registerers.iter().enumerate() {
            if let Err(err) = (registerer.register)(param) {
                debug!(
                    failed_at = index,
                    to_roll_back = index,
                    error = %err,
                    "Registration failed, rolling back"
                );
                for done in self.registerers[..index].iter().rev() {
                    if let Err(rollback_err) = (done.deregister)(param) {
                        warn!(error = %rollback_err, "Rollback deregistration failed");
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }

    /// Deregister every entry. `NotRegistered` is expected and ignored;
    /// other failures are logged.
    pub fn deregister(&self, param: &T) {
        for registerer in &self.registerers {
            match (registerer.deregister)(param) {
                Ok(()) => {}
                Err(err @ RpcError::NotRegistered { .. }) => {
                    debug!(error = %err, "Nothing to deregister");
                }
                Err(err) => warn!(error = %err, "Deregistration failed"),
            }
        }
    }
}
