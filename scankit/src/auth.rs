use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug)]
struct Entry {
    resource: String,
    credentials: Credentials,
}

/// Credentials handed to backends that ask for authorization.
///
/// Shared between all sessions of a [`Context`](crate::context::Context) and the
/// backend's authorization callback.
#[derive(Debug, Default)]
pub struct Authentication {
    entries: Mutex<Vec<Entry>>,
}

impl Authentication {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores credentials for `resource`, replacing any previous ones.
    pub fn set_device_auth(&self, resource: &str, username: &str, password: &str) {
        let credentials = Credentials {
            username: username.to_owned(),
            password: password.to_owned(),
        };

        let mut entries = self.lock();
        match entries.iter_mut().find(|entry| entry.resource == resource) {
            Some(entry) => entry.credentials = credentials,
            None => entries.push(Entry {
                resource: resource.to_owned(),
                credentials,
            }),
        }
    }

    pub fn clear_device_auth(&self, resource: &str) {
        self.lock().retain(|entry| entry.resource != resource);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Looks up credentials for the resource string a backend passes to its
    /// authorization callback.
    ///
    /// Backends send the backend name followed by `$MD5$<challenge>`, not the full
    /// device name, so the stored device name only has to contain the prefix.
    pub fn credentials(&self, resource: &str) -> Option<Credentials> {
        let resource = match resource.find("$MD5$") {
            Some(end) => &resource[..end],
            None => resource,
        };

        log::debug!("Authorization requested for '{resource}'");

        self.lock()
            .iter()
            .find(|entry| entry.resource.contains(resource))
            .map(|entry| entry.credentials.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Entry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
