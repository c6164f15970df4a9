use super::{Credentials, RestClient};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::debug;

/// Process-wide client cache, shared by every fetch in this process.
pub static CLIENT_CACHE: Lazy<ClientCache<RestClient>> =
    Lazy::new(|| ClientCache::new(Duration::from_secs(900)));

/// Cache of authenticated clients keyed by the full credential tuple.
///
/// Entries expire after a TTL and can be dropped eagerly when credentials
/// change; there is no background eviction, expiry is checked on access.
pub struct ClientCache<C> {
    ttl_seconds: AtomicU64,
    entries: Mutex<HashMap<Credentials, CacheEntry<C>>>,
}

struct CacheEntry<C> {
    client: Arc<C>,
    acquired_at: Instant,
}

impl<C> ClientCache<C> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl_seconds: AtomicU64::new(ttl.as_secs()),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_ttl(&self, ttl: Duration) {
        self.ttl_seconds.store(ttl.as_secs(), Ordering::Relaxed);
    }

    fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds.load(Ordering::Relaxed))
    }

    /// Returns the cached client for these credentials, evicting it first if
    /// it has outlived the TTL.
    pub fn get(&self, credentials: &Credentials) -> Option<Arc<C>> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(credentials) {
            Some(entry) if entry.acquired_at.elapsed() < self.ttl() => {
                debug!("Client cache hit for {}", credentials.username);
                Some(Arc::clone(&entry.client))
            }
            Some(_) => {
                debug!("Client cache entry expired for {}", credentials.username);
                entries.remove(credentials);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, credentials: Credentials, client: Arc<C>) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            credentials,
            CacheEntry {
                client,
                acquired_at: Instant::now(),
            },
        );
    }

    /// Drops the entry for one credential tuple, e.g. after a password or
    /// token change.
    pub fn invalidate(&self, credentials: &Credentials) {
        self.entries.lock().unwrap().remove(credentials);
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(name: &str) -> Credentials {
        Credentials::new(name, "pw", "tok", "login")
    }

    #[test]
    fn hit_within_ttl() {
        let cache: ClientCache<&str> = ClientCache::new(Duration::from_secs(60));
        cache.insert(creds("a@example.com"), Arc::new("session-a"));

        let got = cache.get(&creds("a@example.com")).unwrap();
        assert_eq!(*got, "session-a");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn entries_expire_after_ttl() {
        let cache: ClientCache<&str> = ClientCache::new(Duration::from_secs(0));
        cache.insert(creds("a@example.com"), Arc::new("session-a"));

        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get(&creds("a@example.com")).is_none());
        // Expired entries are evicted on access, not left behind
        assert!(cache.is_empty());
    }

    #[test]
    fn different_credentials_do_not_share_a_client() {
        let cache: ClientCache<&str> = ClientCache::new(Duration::from_secs(60));
        cache.insert(creds("a@example.com"), Arc::new("session-a"));

        assert!(cache.get(&creds("b@example.com")).is_none());
        let mut other = creds("a@example.com");
        other.security_token = "rotated".to_string();
        assert!(cache.get(&other).is_none());
    }

    #[test]
    fn invalidate_drops_the_entry() {
        let cache: ClientCache<&str> = ClientCache::new(Duration::from_secs(60));
        cache.insert(creds("a@example.com"), Arc::new("session-a"));
        cache.invalidate(&creds("a@example.com"));
        assert!(cache.get(&creds("a@example.com")).is_none());
    }
}
