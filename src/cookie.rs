//! Cookie-consent banner suppressor.
//!
//! Generates a script the web view evaluates after each page load. It hides
//! and removes consent overlays matched by a fixed selector list, and undoes
//! the scroll lock (`overflow: hidden`) such banners put on the page.
//!
//! Banners injected late by async consent-management scripts are caught by a
//! `MutationObserver` plus three delayed retries. The script marks the page
//! with a global flag so evaluating it twice (page finished + in-page
//! navigation) is harmless.

/// Page-global flag set by the first evaluation.
pub const INJECTION_FLAG: &str = "__pageguardCookieBlocker";

/// Delays (ms) of the retries scheduled after the first pass.
pub const RETRY_DELAYS_MS: [u32; 3] = [500, 1500, 3000];

/// CSS selectors matching common consent-banner markup.
///
/// Must not target classes CMPs set on `<html>`/`<body>` to lock scrolling
/// (see [`PAGE_STATE_CLASSES`]); the script also refuses to touch those
/// elements whatever matched them.
pub const COOKIE_SELECTORS: &[&str] = &[
    // Generic class/id substrings
    "[id*='cookie-banner']",
    "[class*='cookie-banner']",
    "[id*='cookie-consent']",
    "[class*='cookie-consent']",
    "[id*='cookie-notice']",
    "[class*='cookie-notice']",
    "[id*='cookiebar']",
    "[class*='cookiebar']",
    "[id*='gdpr']",
    "[class*='gdpr']",
    "[id*='consent-banner']",
    "[class*='consent-banner']",
    "[class*='consent-modal']",
    "[aria-label*='cookie' i]",
    // OneTrust
    "#onetrust-consent-sdk",
    "#onetrust-banner-sdk",
    "[class*='onetrust']",
    // Cookiebot
    "#CybotCookiebotDialog",
    "#CybotCookiebotDialogBodyUnderlay",
    // Quantcast / TrustArc / Didomi
    ".qc-cmp2-container",
    "#truste-consent-track",
    ".truste_overlay",
    "#didomi-host",
    // Usercentrics / Osano / Termly
    "#usercentrics-root",
    ".osano-cm-window",
    "#termly-code-snippet-support",
    // CookieYes / Complianz / Iubenda / Klaro
    ".cky-consent-container",
    ".cmplz-cookiebanner",
    "#iubenda-cs-banner",
    ".klaro",
    // cookieconsent.js
    ".cc-window",
    ".cc-banner",
    "#cookieConsent",
];

/// Classes consent platforms put on `<html>`/`<body>` while a notice is open.
pub const PAGE_STATE_CLASSES: &[&str] = &[
    "didomi-popup-open",
    "sp-message-open",
    "qc-cmp-ui-showing",
    "ot-overflow-hidden",
    "cmplz-blocked-body",
];

/// Builds the injectable script.
pub fn cookie_blocker_script() -> String {
    let selectors = COOKIE_SELECTORS
        .iter()
        .map(|s| js_string(s))
        .collect::<Vec<_>>()
        .join(",\n    ");
    let retries = RETRY_DELAYS_MS
        .iter()
        .map(|ms| format!("  setTimeout(hideBanners, {ms});"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"(function() {{
  if (window.{flag}) return;
  window.{flag} = true;

  var selectors = [
    {selectors}
  ];

  function unlockScroll() {{
    [document.documentElement, document.body].forEach(function(el) {{
      if (el && getComputedStyle(el).overflow === 'hidden') {{
        el.style.setProperty('overflow', 'auto', 'important');
      }}
    }});
  }}

  // Broad selectors can match <html>/<body> (or a wrapper around the whole
  // page) when a CMP tags them; those only get their scroll lock undone.
  function isPageRoot(el) {{
    return el === document.documentElement || el === document.body
      || (document.body && el.contains(document.body));
  }}

  function hideBanners() {{
    var found = false;
    selectors.forEach(function(sel) {{
      var nodes;
      try {{ nodes = document.querySelectorAll(sel); }} catch (e) {{ return; }}
      nodes.forEach(function(el) {{
        found = true;
        if (isPageRoot(el)) return;
        el.style.setProperty('display', 'none', 'important');
        el.style.setProperty('visibility', 'hidden', 'important');
        el.remove();
      }});
    }});
    if (found) unlockScroll();
  }}

  hideBanners();
  if (document.readyState === 'loading') {{
    document.addEventListener('DOMContentLoaded', hideBanners);
  }}
  new MutationObserver(hideBanners)
    .observe(document.documentElement, {{ childList: true, subtree: true }});
{retries}
}})();"#,
        flag = INJECTION_FLAG,
    )
}

/// Quotes `s` as a single-quoted JS string literal.
fn js_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '<' => out.push_str("\\x3C"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}
