//! Ambient environment for the current request.
//!
//! The environment is read by the event emitter on every record. A request
//! installs its own value with [`scope`] (or [`sync_scope`] for blocking
//! code); outside any scope the process default set once at startup applies.

use crate::config::Environment;
use once_cell::sync::OnceCell;
use std::future::Future;

tokio::task_local! {
    static ENVIRONMENT: Environment;
}

static PROCESS_ENVIRONMENT: OnceCell<Environment> = OnceCell::new();

/// Sets the process-wide default environment.
///
/// Only the first call has an effect; later calls get their value back.
pub fn set_process_environment(environment: Environment) -> Result<(), Environment> {
    PROCESS_ENVIRONMENT.set(environment)
}

/// Environment of the calling task, falling back to the process default.
pub fn current_environment() -> Option<Environment> {
    ENVIRONMENT
        .try_with(Clone::clone)
        .ok()
        .or_else(|| PROCESS_ENVIRONMENT.get().cloned())
}

/// Runs `future` with `environment` as its ambient environment.
pub async fn scope<F>(environment: Environment, future: F) -> F::Output
where
    F: Future,
{
    ENVIRONMENT.scope(environment, future).await
}

/// Runs `f` with `environment` as the ambient environment of this thread
/// until it returns.
pub fn sync_scope<F, R>(environment: Environment, f: F) -> R
where
    F: FnOnce() -> R,
{
    ENVIRONMENT.sync_scope(environment, f)
}
