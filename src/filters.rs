//! Static filter corpus: blocked domains and URL patterns, split into
//! cumulative strength tiers.
//!
//! | Strength | Domain tiers                     | Pattern tiers        |
//! |----------|----------------------------------|----------------------|
//! | Light    | basic                            | none                 |
//! | Medium   | basic + extended                 | medium               |
//! | Strong   | basic + extended + aggressive    | medium + aggressive  |
//!
//! Domains are bare lowercase hostnames (no scheme, path or trailing dot) and
//! match the host itself plus every subdomain. Patterns are regular
//! expressions searched case-insensitively anywhere in the full request URL.
//!
//! The aggressive tiers also catch first-party analytics and social widgets.
//! They can break comment sections, embedded videos or login buttons on some
//! sites.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ─────────────────────────────────────────────────────────────────────────────
// FilterStrength
// ─────────────────────────────────────────────────────────────────────────────

/// How aggressively requests are blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum FilterStrength {
    Light,
    #[default]
    Medium,
    Strong,
}

impl FilterStrength {
    pub const ALL: [FilterStrength; 3] = [Self::Light, Self::Medium, Self::Strong];

    /// Stable key used in `settings.toml` and `config.toml`.
    pub fn key(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Medium => "medium",
            Self::Strong => "strong",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Light => "Light",
            Self::Medium => "Medium",
            Self::Strong => "Strong",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Light => "Blocks well-known ad networks only. Best site compatibility.",
            Self::Medium => {
                "Blocks ad networks, trackers and common ad URL patterns. Recommended."
            }
            Self::Strong => {
                "Also blocks analytics, social widgets and aggressive patterns. \
                 May break some site features."
            }
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.key().eq_ignore_ascii_case(key.trim()))
    }

    /// Domain tiers active at this strength.
    pub fn domain_tiers(self) -> &'static [&'static [&'static str]] {
        match self {
            Self::Light => &[BASIC_DOMAINS],
            Self::Medium => &[BASIC_DOMAINS, EXTENDED_DOMAINS],
            Self::Strong => &[BASIC_DOMAINS, EXTENDED_DOMAINS, AGGRESSIVE_DOMAINS],
        }
    }

    /// Pattern tiers active at this strength, in matching order.
    pub fn pattern_tiers(self) -> &'static [&'static [&'static str]] {
        match self {
            Self::Light => &[],
            Self::Medium => &[MEDIUM_PATTERNS],
            Self::Strong => &[MEDIUM_PATTERNS, AGGRESSIVE_PATTERNS],
        }
    }
}

impl fmt::Display for FilterStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for FilterStrength {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_key(s).ok_or_else(|| format!("unknown filter strength '{s}'"))
    }
}

// Persisted by key. An unknown key (older or hand-edited file) falls back to
// the default instead of rejecting the whole document.
impl Serialize for FilterStrength {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.key())
    }
}

impl<'de> Deserialize<'de> for FilterStrength {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let key = String::deserialize(deserializer)?;
        Ok(Self::from_key(&key).unwrap_or_default())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Domain tiers
// ─────────────────────────────────────────────────────────────────────────────

/// Major ad networks and ad servers. Active at every strength.
pub const BASIC_DOMAINS: &[&str] = &[
    "doubleclick.net",
    "googlesyndication.com",
    "googleadservices.com",
    "google-analytics.com",
    "googletagservices.com",
    "adservice.google.com",
    "imasdk.googleapis.com",
    "2mdn.net",
    "adnxs.com",
    "adsrvr.org",
    "advertising.com",
    "amazon-adsystem.com",
    "criteo.com",
    "criteo.net",
    "taboola.com",
    "outbrain.com",
    "pubmatic.com",
    "rubiconproject.com",
    "openx.net",
    "casalemedia.com",
    "moatads.com",
    "media.net",
    "adform.net",
    "smartadserver.com",
    "zedo.com",
    "revcontent.com",
    "mgid.com",
    "propellerads.com",
    "popads.net",
    "popcash.net",
    "adcolony.com",
    "unityads.unity3d.com",
    "applovin.com",
    "inmobi.com",
    "chartboost.com",
    "vungle.com",
    "yieldmo.com",
    "teads.tv",
    "sharethrough.com",
];

/// Trackers, measurement and programmatic exchanges. Added at Medium.
pub const EXTENDED_DOMAINS: &[&str] = &[
    "googletagmanager.com",
    "scorecardresearch.com",
    "quantserve.com",
    "quantcount.com",
    "bluekai.com",
    "krxd.net",
    "exelator.com",
    "demdex.net",
    "everesttech.net",
    "adsymptotic.com",
    "bidswitch.net",
    "contextweb.com",
    "lijit.com",
    "sovrn.com",
    "indexww.com",
    "spotxchange.com",
    "springserve.com",
    "smaato.net",
    "tapad.com",
    "turn.com",
    "mathtag.com",
    "rlcdn.com",
    "agkn.com",
    "crwdcntrl.net",
    "adroll.com",
    "perfectaudience.com",
    "serving-sys.com",
    "flashtalking.com",
    "innovid.com",
    "chartbeat.com",
    "chartbeat.net",
    "newrelic.com",
    "nr-data.net",
    "hotjar.com",
    "mouseflow.com",
    "crazyegg.com",
    "fullstory.com",
    "mixpanel.com",
    "segment.io",
    "app-measurement.com",
    "branch.io",
    "adjust.com",
    "appsflyer.com",
    "kochava.com",
    "omtrdc.net",
    "2o7.net",
];

/// Analytics, social widgets and first-party telemetry. Added at Strong.
///
/// Blocking these can break embedded content or sign-in buttons.
pub const AGGRESSIVE_DOMAINS: &[&str] = &[
    "connect.facebook.net",
    "pixel.facebook.com",
    "analytics.twitter.com",
    "static.ads-twitter.com",
    "ads.linkedin.com",
    "snap.licdn.com",
    "analytics.tiktok.com",
    "ads.pinterest.com",
    "ct.pinterest.com",
    "sc-static.net",
    "bat.bing.com",
    "clarity.ms",
    "stats.wp.com",
    "pixel.wp.com",
    "mc.yandex.ru",
    "top-fwz1.mail.ru",
    "amplitude.com",
    "heap.io",
    "heapanalytics.com",
    "optimizely.com",
    "kissmetrics.com",
    "intercom.io",
    "onesignal.com",
    "pushwoosh.com",
    "disqusads.com",
    "addthis.com",
    "sharethis.com",
    "gemius.pl",
];

// ─────────────────────────────────────────────────────────────────────────────
// Pattern tiers
// ─────────────────────────────────────────────────────────────────────────────

/// Common ad-serving paths and parameters. Active from Medium.
pub const MEDIUM_PATTERNS: &[&str] = &[
    r".*/ads/.*",
    r"/adserver/",
    r"/adframe/",
    r"/banners?/",
    r"/pagead/",
    r"/ad[sx]?\.js(\?|$)",
    r"/prebid[\w.-]*\.js",
    r"/gpt\.js(\?|$)",
    r"[?&]ad_?unit(id)?=",
    r"[?&]adslot=",
    r"/sponsored[/_-]",
    r"/popunder",
    r"/ad_?banner",
];

/// Tracking beacons and analytics endpoints. Added at Strong.
pub const AGGRESSIVE_PATTERNS: &[&str] = &[
    r"/analytics(\.min)?\.js",
    r"/tracking/",
    r"/tracker[\w.-]*\.js",
    r"/pixel(\.gif|\.png)?(\?|$)",
    r"/beacon(\.js)?(\?|$)",
    r"/collect\?.*(tid|cid)=",
    r"/telemetry/",
    r"[?&]utm_(source|medium|campaign)=",
    r"/fbevents\.js",
    r"/impression[s]?(\?|/)",
];

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn all_domains() -> impl Iterator<Item = &'static str> {
        BASIC_DOMAINS
            .iter()
            .chain(EXTENDED_DOMAINS)
            .chain(AGGRESSIVE_DOMAINS)
            .copied()
    }

    #[test]
    fn test_domains_are_bare_lowercase_hosts() {
        for d in all_domains() {
            assert_eq!(d, d.to_lowercase(), "{d} must be lowercase");
            assert!(!d.contains("://"), "{d} must not carry a scheme");
            assert!(!d.contains('/'), "{d} must not carry a path");
            assert!(!d.ends_with('.'), "{d} must not end with a dot");
            assert!(!d.starts_with("www."), "{d} must not start with www.");
        }
    }

    #[test]
    fn test_no_domain_repeated_across_tiers() {
        let mut seen = HashSet::new();
        for d in all_domains() {
            assert!(seen.insert(d), "{d} listed twice");
        }
    }

    #[test]
    fn test_all_patterns_compile() {
        for p in MEDIUM_PATTERNS.iter().chain(AGGRESSIVE_PATTERNS) {
            assert!(regex::Regex::new(p).is_ok(), "invalid pattern {p}");
        }
    }

    #[test]
    fn test_tiers_are_cumulative() {
        assert_eq!(FilterStrength::Light.domain_tiers().len(), 1);
        assert_eq!(FilterStrength::Medium.domain_tiers().len(), 2);
        assert_eq!(FilterStrength::Strong.domain_tiers().len(), 3);
        assert!(FilterStrength::Light.pattern_tiers().is_empty());
        assert_eq!(FilterStrength::Strong.pattern_tiers()[0], MEDIUM_PATTERNS);
    }

    #[test]
    fn test_strength_keys_roundtrip() {
        for s in FilterStrength::ALL {
            assert_eq!(FilterStrength::from_key(s.key()), Some(s));
            assert_eq!(s.to_string().parse::<FilterStrength>(), Ok(s));
            assert!(!s.title().is_empty());
            assert!(!s.description().is_empty());
        }
        assert_eq!(FilterStrength::from_key(" STRONG "), Some(FilterStrength::Strong));
        assert_eq!(FilterStrength::from_key("extreme"), None);
    }

    #[test]
    fn test_default_strength_is_medium() {
        assert_eq!(FilterStrength::default(), FilterStrength::Medium);
    }

    #[test]
    fn test_unknown_persisted_key_falls_back_to_default() {
        #[derive(Deserialize)]
        struct Doc {
            strength: FilterStrength,
        }
        let doc: Doc = toml::from_str(r#"strength = "extreme""#).unwrap();
        assert_eq!(doc.strength, FilterStrength::Medium);
        let doc: Doc = toml::from_str(r#"strength = "light""#).unwrap();
        assert_eq!(doc.strength, FilterStrength::Light);
    }
}
