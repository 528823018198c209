use crate::{auth::Authentication, backend::Backend, result::Result};
use std::{
    ops::Deref,
    sync::{Arc, Mutex},
};

/// Process-wide state shared by all sessions: the initialized backend library and
/// the credential table handed to its authorization callback.
///
/// The backend is initialized when the first [`ContextGuard`] is acquired and shut
/// down when the last one is dropped.
pub struct Context {
    backend: Arc<dyn Backend>,
    auth: Arc<Authentication>,
    users: Mutex<usize>,
}

impl Context {
    pub fn new(backend: Arc<dyn Backend>) -> Arc<Self> {
        Arc::new(Self {
            backend,
            auth: Arc::new(Authentication::new()),
            users: Mutex::new(0),
        })
    }

    pub fn acquire(self: &Arc<Self>) -> Result<ContextGuard> {
        let mut users = self.lock();

        if *users == 0 {
            let version = self.backend.init(Arc::clone(&self.auth))?;
            log::debug!(
                "Backend initialized, version {}.{}.{}",
                (version >> 24) & 0xff,
                (version >> 16) & 0xff,
                version & 0xffff,
            );
        }

        *users += 1;

        Ok(ContextGuard(Arc::clone(self)))
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    pub fn authentication(&self) -> &Authentication {
        &self.auth
    }

    pub fn users(&self) -> usize {
        *self.lock()
    }

    fn release(&self) {
        let mut users = self.lock();

        *users = users.saturating_sub(1);
        if *users == 0 {
            self.auth.clear();
            self.backend.exit();
            log::debug!("Backend shut down");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, usize> {
        self.users
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Keeps the backend initialized while alive.
pub struct ContextGuard(Arc<Context>);

impl Deref for ContextGuard {
    type Target = Context;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        self.0.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeBackend;

    #[test]
    fn init_and_exit_are_reference_counted() {
        let backend = FakeBackend::new();
        let context = Context::new(backend.clone());

        let first = context.acquire().unwrap();
        let second = context.acquire().unwrap();
        assert_eq!(backend.init_calls(), 1);
        assert_eq!(context.users(), 2);

        drop(first);
        assert_eq!(backend.exit_calls(), 0);

        context.authentication().set_device_auth("test:0", "user", "pass");
        drop(second);
        assert_eq!(backend.exit_calls(), 1);
        assert!(context.authentication().credentials("test").is_none());

        let _third = context.acquire().unwrap();
        assert_eq!(backend.init_calls(), 2);
    }
}
