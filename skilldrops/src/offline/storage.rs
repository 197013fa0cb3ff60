//! On-disk cache storage: named caches (one directory per generation) with
//! one JSON entry file per cached resource path.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::PathBuf;

use super::CacheError;

/// A snapshot of a network response, stored verbatim in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    /// True for same-origin ("basic") responses. Opaque cross-origin
    /// responses are served but never cached.
    pub basic: bool,
}

impl CachedResponse {
    pub fn ok(content_type: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            content_type: Some(content_type.into()),
            body: body.into(),
            basic: true,
        }
    }

    /// Only successful same-origin responses may be stored.
    pub fn is_cacheable(&self) -> bool {
        self.status == 200 && self.basic
    }
}

#[derive(Serialize, Deserialize)]
struct CacheEntry {
    path: String,
    response: CachedResponse,
}

/// Root of all cache generations.
#[derive(Clone)]
pub struct CacheStorage {
    root: PathBuf,
}

impl CacheStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Open (create if missing) the named cache.
    pub fn open(&self, name: &str) -> Result<Cache, CacheError> {
        let dir = self.root.join(name);
        std::fs::create_dir_all(&dir)?;
        Ok(Cache { dir })
    }

    /// Names of all existing cache generations.
    pub fn cache_names(&self) -> Result<Vec<String>, CacheError> {
        if !self.root.exists() {
            return Ok(vec![]);
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Ok(name) = entry.file_name().into_string() {
                    names.push(name);
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Delete the named cache and everything in it. Returns whether it
    /// existed.
    pub fn delete(&self, name: &str) -> Result<bool, CacheError> {
        let dir = self.root.join(name);
        if !dir.exists() {
            return Ok(false);
        }
        std::fs::remove_dir_all(&dir)?;
        Ok(true)
    }
}

/// One named cache generation.
pub struct Cache {
    dir: PathBuf,
}

impl Cache {
    /// Look up a cached response for the resource path.
    pub fn match_path(&self, path: &str) -> Result<Option<CachedResponse>, CacheError> {
        let file = self.dir.join(entry_file_name(path));
        if !file.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&file)?;
        let entry: CacheEntry = serde_json::from_str(&contents)?;
        Ok(Some(entry.response))
    }

    /// Store a response for the resource path, overwriting any previous one.
    pub fn put(&self, path: &str, response: &CachedResponse) -> Result<(), CacheError> {
        let entry = CacheEntry {
            path: path.to_string(),
            response: response.clone(),
        };
        let json = serde_json::to_string(&entry)?;
        std::fs::write(self.dir.join(entry_file_name(path)), json)?;
        Ok(())
    }
}

/// Stable filesystem-safe file name for a resource path.
fn entry_file_name(path: &str) -> String {
    let mut name = String::with_capacity(path.len() + 8);
    for b in path.bytes() {
        if b.is_ascii_alphanumeric() || b == b'.' || b == b'-' || b == b'_' {
            name.push(b as char);
        } else {
            let _ = write!(name, "%{b:02X}");
        }
    }
    name.push_str(".json");
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_names_are_distinct_and_stable() {
        assert_eq!(entry_file_name("/index.html"), entry_file_name("/index.html"));
        assert_ne!(entry_file_name("/a/b"), entry_file_name("/a%2Fb"));
        assert!(!entry_file_name("/icons/favicon-16x16.png").contains('/'));
    }

    #[test]
    fn put_match_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = CacheStorage::new(tmp.path());
        let cache = storage.open("skilldrops-v1").unwrap();

        assert_eq!(cache.match_path("/style.css").unwrap(), None);

        let response = CachedResponse::ok("text/css", "body { margin: 0 }");
        cache.put("/style.css", &response).unwrap();
        assert_eq!(cache.match_path("/style.css").unwrap(), Some(response));
    }

    #[test]
    fn put_overwrites_previous_entry() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = CacheStorage::new(tmp.path()).open("v1").unwrap();

        cache.put("/", &CachedResponse::ok("text/html", "old")).unwrap();
        cache.put("/", &CachedResponse::ok("text/html", "new")).unwrap();

        let hit = cache.match_path("/").unwrap().unwrap();
        assert_eq!(hit.body, b"new");
    }

    #[test]
    fn cache_names_and_delete() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = CacheStorage::new(tmp.path());
        storage.open("skilldrops-v1").unwrap();
        storage.open("skilldrops-v2").unwrap();

        assert_eq!(
            storage.cache_names().unwrap(),
            vec!["skilldrops-v1".to_string(), "skilldrops-v2".to_string()]
        );

        assert!(storage.delete("skilldrops-v1").unwrap());
        assert!(!storage.delete("skilldrops-v1").unwrap());
        assert_eq!(storage.cache_names().unwrap(), vec!["skilldrops-v2".to_string()]);
    }

    #[test]
    fn only_successful_basic_responses_are_cacheable() {
        assert!(CachedResponse::ok("text/html", "x").is_cacheable());

        let not_found = CachedResponse {
            status: 404,
            content_type: None,
            body: vec![],
            basic: true,
        };
        assert!(!not_found.is_cacheable());

        let opaque = CachedResponse {
            status: 200,
            content_type: None,
            body: vec![],
            basic: false,
        };
        assert!(!opaque.is_cacheable());
    }
}
