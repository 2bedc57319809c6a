use std::sync::{LazyLock, Mutex, MutexGuard};

/// Every variable `apply_env_overrides` reads.
pub(crate) const OVERRIDE_VARS: &[&str] = &[
    "ONEBOT_YOUTUBE_API_KEY",
    "ONEBOT_TWITTER_BEARER_TOKEN",
    "ONEBOT_USER_AGENT",
    "ONEBOT_COOKIE_FILE",
];

static ENV_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

/// Exclusive access to the override variables for one test.
///
/// Starts with all of them unset and puts the previous values back on drop.
pub(crate) struct ScopedEnv {
    saved: Vec<(&'static str, Option<String>)>,
    _lock: MutexGuard<'static, ()>,
}

impl ScopedEnv {
    pub(crate) fn clean() -> Self {
        let lock = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let saved = OVERRIDE_VARS
            .iter()
            .map(|&key| (key, std::env::var(key).ok()))
            .collect();
        for key in OVERRIDE_VARS {
            // SAFETY: ENV_LOCK is held for the lifetime of the scope.
            unsafe { std::env::remove_var(key) };
        }
        Self { saved, _lock: lock }
    }

    pub(crate) fn set(self, key: &'static str, value: &str) -> Self {
        assert!(OVERRIDE_VARS.contains(&key), "{key} is not an override var");
        // SAFETY: ENV_LOCK is held for the lifetime of the scope.
        unsafe { std::env::set_var(key, value) };
        self
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (key, previous) in &self.saved {
            // SAFETY: the lock guard is dropped after this body runs.
            unsafe {
                match previous {
                    Some(value) => std::env::set_var(key, value),
                    None => std::env::remove_var(key),
                }
            }
        }
    }
}
