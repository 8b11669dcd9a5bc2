use cookie_store::CookieStore;
use parking_lot::Mutex;
use reqwest::cookie::CookieStore as ReqwestCookieStore;
use reqwest::header::HeaderValue;
use reqwest::Url;
use reqwest_cookie_store::CookieStoreMutex;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, error};

/// Credential cookies set by the backend, with RFC 6265 domain, path and
/// expiry rules. Saved as JSON after every change when a path is set.
#[derive(Default)]
pub struct CookieJar {
    store: CookieStoreMutex,
    file: Option<Arc<CookieFile>>,
}

/// Snapshots are numbered; an older snapshot never overwrites a newer one.
struct CookieFile {
    path: PathBuf,
    revision: AtomicU64,
    written: Mutex<u64>,
}

impl CookieFile {
    fn write(&self, revision: u64, payload: &[u8]) -> io::Result<()> {
        let mut written = self.written.lock();
        if revision <= *written {
            return Ok(());
        }
        std::fs::write(&self.path, payload)?;
        *written = revision;
        Ok(())
    }
}

impl CookieJar {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Reads the persisted jar, dropping cookies that expired meanwhile. A
    /// missing or unreadable file gives an empty jar that will be written to
    /// `path` on the next change.
    pub async fn load(path: &Path) -> Self {
        let store = match fs::read(path).await {
            Ok(bytes) => match cookie_store::serde::json::load(bytes.as_slice()) {
                Ok(store) => store,
                Err(err) => {
                    error!("failed to parse cookie file: {err}");
                    CookieStore::default()
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => CookieStore::default(),
            Err(err) => {
                error!("failed to read cookie file: {err}");
                CookieStore::default()
            }
        };

        Self {
            store: CookieStoreMutex::new(store),
            file: Some(Arc::new(CookieFile {
                path: path.to_path_buf(),
                revision: AtomicU64::new(0),
                written: Mutex::new(0),
            })),
        }
    }

    /// Value of an unexpired cookie, whatever its domain or path.
    pub fn get(&self, name: &str) -> Option<String> {
        let store = self.store.lock().ok()?;
        store
            .iter_unexpired()
            .find(|cookie| cookie.name() == name)
            .map(|cookie| cookie.value().to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.store
            .lock()
            .map(|store| store.iter_unexpired().next().is_none())
            .unwrap_or(true)
    }

    /// Writes the jar now, on the calling thread.
    pub fn save(&self) -> io::Result<()> {
        let Some(file) = &self.file else {
            return Ok(());
        };
        let (revision, payload) = self.snapshot(file)?;
        file.write(revision, &payload)
    }

    fn snapshot(&self, file: &CookieFile) -> io::Result<(u64, Vec<u8>)> {
        let store = self
            .store
            .lock()
            .map_err(|_| io::Error::other("cookie store lock poisoned"))?;
        let mut payload = Vec::new();
        // Session cookies are kept too; the local session outlives restarts.
        cookie_store::serde::json::save_incl_expired_and_nonpersistent(&store, &mut payload)
            .map_err(io::Error::other)?;
        let revision = file.revision.fetch_add(1, Ordering::SeqCst) + 1;
        Ok((revision, payload))
    }

    /// Persists off the async workers when a runtime is available.
    fn persist(&self) {
        let Some(file) = &self.file else {
            return;
        };
        let (revision, payload) = match self.snapshot(file) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                error!("failed to encode cookies: {err}");
                return;
            }
        };
        let file = Arc::clone(file);
        let write = move || {
            if let Err(err) = file.write(revision, &payload) {
                error!("failed to write cookie file: {err}");
            }
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(write);
            }
            Err(_) => write(),
        }
    }
}

impl ReqwestCookieStore for CookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        self.store.set_cookies(cookie_headers, url);
        debug!("cookies updated from {}", url.path());
        self.persist();
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.store.cookies(url)
    }
}
