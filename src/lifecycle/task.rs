//! Task contracts exposed to collaborators.
//!
//! ```text
//! InitTask(lifetime)    -> Result<Option<CleanupTask>, E>
//! CleanupTask(lifetime) -> ()
//! DaemonTask(lifetime)  -> Result<(), E>
//! ```
//!
//! Every task carries an explicit name used in logs and error messages.

use std::future::Future;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::lifecycle::error::BoxError;
use crate::lifecycle::lifetime::Lifetime;

type InitFn = Box<dyn FnOnce(Lifetime) -> BoxFuture<'static, Result<Option<CleanupTask>, BoxError>> + Send>;
type CleanupFn = Box<dyn FnOnce(Lifetime) -> BoxFuture<'static, ()> + Send>;
type DaemonFn = Box<dyn FnOnce(Lifetime) -> BoxFuture<'static, Result<(), BoxError>> + Send>;

/// A fallible setup unit that may yield a cleanup action on success.
pub struct InitTask {
    name: String,
    func: InitFn,
}

impl InitTask {
    /// Build an init task from a name and an async closure.
    pub fn new<F, Fut, E>(name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(Lifetime) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Option<CleanupTask>, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        Self {
            name: name.into(),
            func: Box::new(move |lifetime| f(lifetime).map(|res| res.map_err(Into::into)).boxed()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn into_parts(self) -> (String, InitFn) {
        (self.name, self.func)
    }
}

impl std::fmt::Debug for InitTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitTask").field("name", &self.name).finish()
    }
}

/// Best-effort teardown tied to one successful [`InitTask`].
pub struct CleanupTask {
    func: CleanupFn,
}

impl CleanupTask {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: FnOnce(Lifetime) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            func: Box::new(move |lifetime| f(lifetime).boxed()),
        }
    }

    pub(crate) fn into_fn(self) -> CleanupFn {
        self.func
    }
}

impl std::fmt::Debug for CleanupTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleanupTask").finish_non_exhaustive()
    }
}

/// A long-running unit supervised during the run phase.
pub struct DaemonTask {
    name: String,
    func: DaemonFn,
}

impl DaemonTask {
    pub fn new<F, Fut, E>(name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(Lifetime) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError>,
    {
        Self {
            name: name.into(),
            func: Box::new(move |lifetime| f(lifetime).map(|res| res.map_err(Into::into)).boxed()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn into_parts(self) -> (String, DaemonFn) {
        (self.name, self.func)
    }
}

impl std::fmt::Debug for DaemonTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DaemonTask").field("name", &self.name).finish()
    }
}
