//! Request classification engine.
//!
//! [`AdBlocker`] answers "should this request be blocked?" for every
//! sub-resource the web view loads. It combines the static corpus
//! ([`crate::filters`]), the user whitelist and the current
//! [`FilterStrength`].
//!
//! ## Decision order
//!
//! 1. Blocking disabled → allow
//! 2. Host whitelisted (or subdomain of a whitelisted host) → allow
//! 3. Host in the effective domain set (or subdomain of one) → block
//! 4. Strength above Light and a URL pattern matches → block
//! 5. Otherwise → allow
//!
//! A URL whose host cannot be extracted skips steps 2 and 3 but still goes
//! through the patterns.
//!
//! ## Thread safety
//!
//! `AdBlocker` is `Send + Sync`; share it as `Arc<AdBlocker>`. The effective
//! filter is an immutable snapshot swapped wholesale when the strength
//! changes, so classification never waits on a rebuild.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};
use regex::{Regex, RegexSet, RegexSetBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::cookie;
use crate::counter::BlockCounter;
use crate::filters::FilterStrength;
use crate::host::{extract_host, suffixes};
use crate::store::Document;
use crate::whitelist::Whitelist;

/// File names of the three persisted namespaces inside the data directory.
pub const SETTINGS_FILE: &str = "settings.toml";
pub const WHITELIST_FILE: &str = "whitelist.toml";
pub const COUNTER_FILE: &str = "counter.toml";

// ─────────────────────────────────────────────────────────────────────────────
// Settings
// ─────────────────────────────────────────────────────────────────────────────

/// Persisted engine settings (`settings.toml`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockerSettings {
    pub enabled: bool,
    pub strength: FilterStrength,
    pub cookie_blocker_enabled: bool,
}

impl Default for BlockerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            strength: FilterStrength::Medium,
            cookie_blocker_enabled: true,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// EffectiveFilter
// ─────────────────────────────────────────────────────────────────────────────

/// Domains and compiled patterns active at one strength.
#[derive(Debug)]
pub struct EffectiveFilter {
    strength: FilterStrength,
    domains: HashSet<&'static str>,
    patterns: PatternMatcher,
}

#[derive(Debug)]
enum PatternMatcher {
    /// All patterns compiled into one automaton.
    Combined(RegexSet),
    /// Fallback when the combined build fails: the patterns that compiled.
    Individual(Vec<(usize, Regex)>),
}

impl EffectiveFilter {
    pub fn build(strength: FilterStrength) -> Self {
        let domains: HashSet<&'static str> = strength
            .domain_tiers()
            .iter()
            .flat_map(|tier| tier.iter().copied())
            .collect();
        let sources: Vec<&'static str> = strength
            .pattern_tiers()
            .iter()
            .flat_map(|tier| tier.iter().copied())
            .collect();

        let patterns = match RegexSetBuilder::new(&sources)
            .case_insensitive(true)
            .build()
        {
            Ok(set) => PatternMatcher::Combined(set),
            Err(e) => {
                error!(error = %e, "Combined pattern set failed to compile, matching individually");
                PatternMatcher::Individual(compile_individually(&sources))
            }
        };

        Self {
            strength,
            domains,
            patterns,
        }
    }

    pub fn strength(&self) -> FilterStrength {
        self.strength
    }

    pub fn domain_count(&self) -> usize {
        self.domains.len()
    }

    pub fn pattern_count(&self) -> usize {
        match &self.patterns {
            PatternMatcher::Combined(set) => set.len(),
            PatternMatcher::Individual(list) => list.len(),
        }
    }

    /// The blocked domain covering `host`, if any.
    pub fn matching_domain(&self, host: &str) -> Option<&'static str> {
        suffixes(host).find_map(|s| self.domains.get(s).copied())
    }

    /// Index (into the concatenated pattern tiers) of the first pattern
    /// found in `url`.
    pub fn matching_pattern(&self, url: &str) -> Option<usize> {
        match &self.patterns {
            PatternMatcher::Combined(set) => set.matches(url).iter().next(),
            PatternMatcher::Individual(list) => list
                .iter()
                .find(|(_, re)| re.is_match(url))
                .map(|(idx, _)| *idx),
        }
    }
}

fn compile_individually(sources: &[&str]) -> Vec<(usize, Regex)> {
    sources
        .iter()
        .enumerate()
        .filter_map(|(idx, src)| {
            match regex::RegexBuilder::new(src).case_insensitive(true).build() {
                Ok(re) => Some((idx, re)),
                Err(e) => {
                    error!(pattern = src, error = %e, "Skipping invalid URL pattern");
                    None
                }
            }
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Verdict
// ─────────────────────────────────────────────────────────────────────────────

/// Outcome of [`AdBlocker::classify`], with the rule that decided it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Blocking is turned off.
    Disabled,
    /// The host is on the user whitelist.
    Whitelisted,
    /// The host is (under) a blocked domain.
    BlockedDomain(&'static str),
    /// The URL matched the pattern at this index of the active tiers.
    BlockedPattern(usize),
    Allowed,
}

impl Verdict {
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::BlockedDomain(_) | Self::BlockedPattern(_))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AdBlocker
// ─────────────────────────────────────────────────────────────────────────────

/// The blocking engine. One instance per running application, owned by the
/// composition root and handed out as `Arc<AdBlocker>`.
#[derive(Debug)]
pub struct AdBlocker {
    settings: Mutex<BlockerSettings>,
    settings_doc: Document,
    /// Mirror of `settings.enabled` for the hot path.
    enabled: AtomicBool,
    filter: RwLock<Arc<EffectiveFilter>>,
    whitelist: Whitelist,
    counter: BlockCounter,
}

impl AdBlocker {
    /// Opens the engine on the three persisted namespaces.
    ///
    /// `initial` is used when the settings namespace holds nothing yet.
    pub fn new(
        settings_doc: Document,
        whitelist: Whitelist,
        counter: BlockCounter,
        initial: BlockerSettings,
    ) -> Self {
        let settings = settings_doc
            .try_load::<BlockerSettings>()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Invalid engine settings, using defaults");
                None
            })
            .unwrap_or(initial);
        let filter = EffectiveFilter::build(settings.strength);

        info!(
            enabled = settings.enabled,
            strength = %settings.strength,
            domains = filter.domain_count(),
            patterns = filter.pattern_count(),
            whitelisted = whitelist.len(),
            blocked_count = counter.get(),
            "Ad blocker initialized"
        );

        Self {
            enabled: AtomicBool::new(settings.enabled),
            settings: Mutex::new(settings),
            settings_doc,
            filter: RwLock::new(Arc::new(filter)),
            whitelist,
            counter,
        }
    }

    /// Opens the engine with its state files in `data_dir`.
    pub fn open(data_dir: &Path, initial: BlockerSettings) -> Self {
        Self::new(
            Document::at(data_dir.join(SETTINGS_FILE)),
            Whitelist::open(Document::at(data_dir.join(WHITELIST_FILE))),
            BlockCounter::open(Document::at(data_dir.join(COUNTER_FILE))),
            initial,
        )
    }

    /// An engine that persists nothing.
    pub fn in_memory(initial: BlockerSettings) -> Self {
        Self::new(
            Document::in_memory(),
            Whitelist::in_memory(),
            BlockCounter::in_memory(),
            initial,
        )
    }

    // ── Classification ──────────────────────────────────────────────────

    /// Returns `true` if the request to `url` should be blocked.
    pub fn should_block(&self, url: &str) -> bool {
        self.classify(url).is_blocked()
    }

    /// Classifies `url` and reports which rule decided.
    pub fn classify(&self, url: &str) -> Verdict {
        if !self.enabled.load(Ordering::Relaxed) {
            return Verdict::Disabled;
        }

        let host = extract_host(url);
        if !host.is_empty() && self.whitelist.contains_host(&host) {
            return Verdict::Whitelisted;
        }

        let filter = self.effective_filter();
        if let Some(domain) = filter.matching_domain(&host) {
            return Verdict::BlockedDomain(domain);
        }
        if filter.strength() != FilterStrength::Light
            && let Some(idx) = filter.matching_pattern(url)
        {
            return Verdict::BlockedPattern(idx);
        }
        Verdict::Allowed
    }

    /// Current filter snapshot.
    pub fn effective_filter(&self) -> Arc<EffectiveFilter> {
        Arc::clone(&self.filter.read())
    }

    // ── Blocked counter ─────────────────────────────────────────────────

    /// Counts one blocked request. Call once per request `should_block`
    /// returned `true` for.
    pub fn increment_blocked_count(&self) {
        let count = self.counter.increment();
        debug!(count, "Blocked count incremented");
    }

    pub fn reset_blocked_count(&self) {
        self.counter.reset();
        info!("Blocked count reset");
    }

    pub fn blocked_count(&self) -> u64 {
        self.counter.get()
    }

    // ── Settings ────────────────────────────────────────────────────────

    pub fn settings(&self) -> BlockerSettings {
        *self.settings.lock()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        // Flag and persisted settings change under the same lock so racing
        // toggles cannot leave them disagreeing.
        self.update_settings(|s| {
            s.enabled = enabled;
            self.enabled.store(enabled, Ordering::Relaxed);
        });
        info!(enabled, "Ad blocking toggled");
    }

    pub fn strength(&self) -> FilterStrength {
        self.settings.lock().strength
    }

    /// Changes the strength and rebuilds the effective filter right away.
    /// Setting the current strength again is a no-op.
    pub fn set_strength(&self, strength: FilterStrength) {
        let mut settings = self.settings.lock();
        if settings.strength == strength {
            return;
        }
        settings.strength = strength;
        self.save_settings(&settings);

        let filter = EffectiveFilter::build(strength);
        info!(
            strength = %strength,
            domains = filter.domain_count(),
            patterns = filter.pattern_count(),
            "Filter strength changed"
        );
        *self.filter.write() = Arc::new(filter);
    }

    pub fn is_cookie_blocker_enabled(&self) -> bool {
        self.settings.lock().cookie_blocker_enabled
    }

    pub fn set_cookie_blocker_enabled(&self, enabled: bool) {
        self.update_settings(|s| s.cookie_blocker_enabled = enabled);
        info!(enabled, "Cookie banner blocker toggled");
    }

    /// The consent-banner script, or an empty string when the cookie blocker
    /// is off.
    pub fn cookie_blocker_script(&self) -> String {
        if self.is_cookie_blocker_enabled() {
            cookie::cookie_blocker_script()
        } else {
            String::new()
        }
    }

    fn update_settings(&self, f: impl FnOnce(&mut BlockerSettings)) {
        let mut settings = self.settings.lock();
        f(&mut settings);
        self.save_settings(&settings);
    }

    fn save_settings(&self, settings: &BlockerSettings) {
        if let Err(e) = self.settings_doc.save(settings) {
            warn!(error = %e, "Failed to persist ad blocker settings");
        }
    }

    // ── Whitelist ───────────────────────────────────────────────────────

    pub fn whitelist(&self) -> BTreeSet<String> {
        self.whitelist.get_all()
    }

    pub fn add_to_whitelist(&self, domain: &str) -> bool {
        let added = self.whitelist.add(domain);
        if added {
            info!(domain, "Added to whitelist");
        }
        added
    }

    pub fn remove_from_whitelist(&self, domain: &str) -> bool {
        let removed = self.whitelist.remove(domain);
        if removed {
            info!(domain, "Removed from whitelist");
        }
        removed
    }

    pub fn is_whitelisted(&self, host: &str) -> bool {
        self.whitelist.is_whitelisted(host)
    }

    pub fn clear_whitelist(&self) {
        self.whitelist.clear();
        info!("Whitelist cleared");
    }
}
