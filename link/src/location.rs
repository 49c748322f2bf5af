//! Address-bar abstraction.
//!
//! The store reads the share id from the current address and, after an
//! upload completes, rewrites it in place (no new history entry). Hosts
//! embed their own navigation model behind [`Location`]; [`MemoryLocation`]
//! covers tests and headless use.

use parking_lot::RwLock;
use url::Url;

use crate::error::Result;

/// Query parameter carrying the opaque share id.
pub const SHARE_ID_PARAM: &str = "id";

/// The host's current address.
pub trait Location: Send + Sync {
    /// Current full address.
    fn href(&self) -> Url;

    /// Replace the current address without navigating.
    fn replace(&self, url: Url);

    /// Path component of the current address, e.g. `/azure`.
    fn pathname(&self) -> String {
        self.href().path().to_string()
    }

    /// First value of query parameter `name`, percent-decoded.
    fn query_param(&self, name: &str) -> Option<String> {
        self.href()
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    /// Non-empty share id from the address, if any.
    fn share_id(&self) -> Option<String> {
        self.query_param(SHARE_ID_PARAM).filter(|id| !id.is_empty())
    }
}

/// Return `url` with `name` set to `value`, replacing earlier occurrences.
pub fn set_query_param(url: &Url, name: &str, value: &str) -> Url {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != name)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    pairs.push((name.to_string(), value.to_string()));
    rebuild_query(url, pairs)
}

/// Return `url` without any of the parameters in `names`.
pub fn remove_query_params(url: &Url, names: &[&str]) -> Url {
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !names.iter().any(|name| key == name))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    rebuild_query(url, pairs)
}

fn rebuild_query(url: &Url, pairs: Vec<(String, String)>) -> Url {
    let mut rebuilt = url.clone();
    if pairs.is_empty() {
        rebuilt.set_query(None);
        return rebuilt;
    }
    {
        let mut query = rebuilt.query_pairs_mut();
        query.clear();
        for (key, value) in pairs {
            query.append_pair(&key, &value);
        }
    }
    rebuilt
}

/// In-memory address bar.
///
/// # Example
///
/// ```rust
/// use instances_link::{Location, MemoryLocation};
///
/// let location = MemoryLocation::new("https://instances.vantage.sh/rds?id=abc").unwrap();
/// assert_eq!(location.pathname(), "/rds");
/// assert_eq!(location.share_id().as_deref(), Some("abc"));
/// ```
#[derive(Debug)]
pub struct MemoryLocation {
    current: RwLock<Url>,
    replacements: RwLock<usize>,
}

impl MemoryLocation {
    pub fn new(href: &str) -> Result<Self> {
        Ok(Self::from_url(Url::parse(href)?))
    }

    pub fn from_url(url: Url) -> Self {
        Self {
            current: RwLock::new(url),
            replacements: RwLock::new(0),
        }
    }

    /// Simulate the user navigating to another page.
    pub fn navigate(&self, href: &str) -> Result<()> {
        *self.current.write() = Url::parse(href)?;
        Ok(())
    }

    /// How many times [`Location::replace`] has been called.
    pub fn replacement_count(&self) -> usize {
        *self.replacements.read()
    }
}

impl Location for MemoryLocation {
    fn href(&self) -> Url {
        self.current.read().clone()
    }

    fn replace(&self, url: Url) {
        *self.current.write() = url;
        *self.replacements.write() += 1;
    }
}
