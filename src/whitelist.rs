//! User whitelist: hosts exempted from every blocking rule.
//!
//! Entries are stored normalized (see [`normalize_domain`]) so `Example.com`,
//! `https://www.example.com/` and `example.com` are the same entry. A
//! whitelisted entry also covers its subdomains.

use std::collections::BTreeSet;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::host::{normalize_domain, suffixes};
use crate::store::Document;

/// On-disk layout of `whitelist.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct WhitelistFile {
    domains: BTreeSet<String>,
}

/// Persisted set of whitelisted hosts.
///
/// Readers only ever wait on the in-memory set; disk writes happen after the
/// set lock is released, serialized by `save_lock`.
#[derive(Debug)]
pub struct Whitelist {
    domains: RwLock<BTreeSet<String>>,
    save_lock: Mutex<()>,
    doc: Document,
}

impl Whitelist {
    /// Loads the whitelist from `doc`. Entries are re-normalized on load.
    pub fn open(doc: Document) -> Self {
        let file: WhitelistFile = doc.load();
        let domains = file
            .domains
            .iter()
            .map(|d| normalize_domain(d))
            .filter(|d| !d.is_empty())
            .collect();
        Self {
            domains: RwLock::new(domains),
            save_lock: Mutex::new(()),
            doc,
        }
    }

    pub fn in_memory() -> Self {
        Self::open(Document::in_memory())
    }

    pub fn get_all(&self) -> BTreeSet<String> {
        self.domains.read().clone()
    }

    pub fn len(&self) -> usize {
        self.domains.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.read().is_empty()
    }

    /// Adds a domain. Returns `true` if it was not already present.
    ///
    /// Input that normalizes to nothing (`""`, `"https://"`) is ignored.
    pub fn add(&self, domain: &str) -> bool {
        let entry = normalize_domain(domain);
        if entry.is_empty() {
            debug!(input = domain, "Ignoring empty whitelist entry");
            return false;
        }
        self.mutate(|domains| domains.insert(entry))
    }

    /// Removes a domain. Returns `true` if it was present.
    pub fn remove(&self, domain: &str) -> bool {
        let entry = normalize_domain(domain);
        self.mutate(|domains| domains.remove(&entry))
    }

    /// Returns `true` if `host` is a whitelisted entry or a subdomain of one.
    ///
    /// Accepts loose input (`"https://www.Example.com/"`); use
    /// [`Whitelist::contains_host`] for an already extracted host.
    pub fn is_whitelisted(&self, host: &str) -> bool {
        self.contains_host(&normalize_domain(host))
    }

    /// Hot-path variant of [`Whitelist::is_whitelisted`] for a bare lowercase
    /// host: one set lookup per parent domain, no allocation.
    pub fn contains_host(&self, host: &str) -> bool {
        let domains = self.domains.read();
        !domains.is_empty() && suffixes(host).any(|s| domains.contains(s))
    }

    pub fn clear(&self) {
        self.mutate(|domains| {
            domains.clear();
            true
        });
    }

    /// Applies `f` to the set and, if it reports a change, writes the new
    /// snapshot to disk once the set lock is released.
    fn mutate(&self, f: impl FnOnce(&mut BTreeSet<String>) -> bool) -> bool {
        // Held across the write so snapshots reach the disk in mutation order.
        let _save = self.save_lock.lock();
        let snapshot = {
            let mut domains = self.domains.write();
            if !f(&mut domains) {
                return false;
            }
            domains.clone()
        };
        if let Err(e) = self.doc.save(&WhitelistFile { domains: snapshot }) {
            warn!(error = %e, "Failed to persist whitelist");
        }
        true
    }
}
