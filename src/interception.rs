//! Hooks the web engine calls into.
//!
//! Two entry points, each meant to be called from the corresponding web-view
//! delegate callback:
//!
//! 1. **[`RequestInterceptor`]**: invoked before every resource fetch. When
//!    the request is blocked it hands back an [`EmptyResponse`] to serve in
//!    place of the network, and counts the block.
//!
//! 2. **[`PageScriptInjector`]**: invoked when a page has finished loading
//!    and after in-page (history API) navigations. Evaluates the
//!    cookie-consent suppressor through the engine's [`ScriptEvaluator`].
//!
//! Both run on the engine's callback threads and must return promptly.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::{debug, warn};
use url::Url;

use crate::engine::{AdBlocker, Verdict};

/// Content type served for blocked requests.
pub const BLOCKED_CONTENT_TYPE: &str = "text/plain";
pub const BLOCKED_ENCODING: &str = "utf-8";

// ─────────────────────────────────────────────────────────────────────────────
// Request interception
// ─────────────────────────────────────────────────────────────────────────────

/// A resource load as reported by the web engine.
#[derive(Debug, Clone)]
pub struct WebResourceRequest {
    pub url: Url,
    /// Top-level document navigation rather than a sub-resource.
    pub is_for_main_frame: bool,
}

impl WebResourceRequest {
    pub fn subresource(url: Url) -> Self {
        Self {
            url,
            is_for_main_frame: false,
        }
    }

    pub fn main_frame(url: Url) -> Self {
        Self {
            url,
            is_for_main_frame: true,
        }
    }
}

/// Zero-byte response substituted for a blocked request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmptyResponse {
    pub url: Url,
    pub status_code: u16,
    pub reason: &'static str,
    pub content_type: &'static str,
    pub encoding: &'static str,
    pub body: Vec<u8>,
}

impl EmptyResponse {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            status_code: 200,
            reason: "OK",
            content_type: BLOCKED_CONTENT_TYPE,
            encoding: BLOCKED_ENCODING,
            body: Vec::new(),
        }
    }
}

/// What the web engine should do with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interception {
    /// Let the request reach the network.
    Proceed,
    /// Serve this response instead.
    Block(EmptyResponse),
}

impl Interception {
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Block(_))
    }
}

/// Per-request hook.
#[derive(Debug, Clone)]
pub struct RequestInterceptor {
    blocker: Arc<AdBlocker>,
}

impl RequestInterceptor {
    pub fn new(blocker: Arc<AdBlocker>) -> Self {
        Self { blocker }
    }

    /// Decides the fate of one request.
    ///
    /// Main-frame navigations always proceed. A blocked sub-resource is
    /// counted exactly once here; callers must not count it again.
    ///
    /// A panic inside the classifier lets the request through rather than
    /// unwinding into the engine's network thread. This relies on the crate's
    /// profiles keeping `panic = "unwind"`.
    pub fn intercept(&self, request: &WebResourceRequest) -> Interception {
        if request.is_for_main_frame {
            return Interception::Proceed;
        }

        let verdict = catch_unwind(AssertUnwindSafe(|| {
            self.blocker.classify(request.url.as_str())
        }));
        match verdict {
            Ok(verdict) if verdict.is_blocked() => {
                self.blocker.increment_blocked_count();
                debug!(url = %request.url, reason = ?verdict, "Request blocked");
                Interception::Block(EmptyResponse::new(request.url.clone()))
            }
            Ok(Verdict::Whitelisted) => {
                debug!(url = %request.url, "Request allowed by whitelist");
                Interception::Proceed
            }
            Ok(_) => Interception::Proceed,
            Err(_) => {
                warn!(url = %request.url, "Classifier panicked, letting request through");
                Interception::Proceed
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Page script injection
// ─────────────────────────────────────────────────────────────────────────────

/// Implemented by the web view: runs a script in the current page.
pub trait ScriptEvaluator {
    fn evaluate_script(&self, script: &str);
}

/// Per-page-load hook for the cookie-consent suppressor.
#[derive(Debug, Clone)]
pub struct PageScriptInjector {
    blocker: Arc<AdBlocker>,
}

impl PageScriptInjector {
    pub fn new(blocker: Arc<AdBlocker>) -> Self {
        Self { blocker }
    }

    /// The main document finished loading. Returns `true` if a script was
    /// evaluated.
    pub fn on_page_finished(&self, page: &dyn ScriptEvaluator) -> bool {
        self.inject(page)
    }

    /// The page navigated in place (`pushState`, `replaceState`, hash
    /// change). Returns `true` if a script was evaluated.
    pub fn on_history_changed(&self, page: &dyn ScriptEvaluator) -> bool {
        self.inject(page)
    }

    fn inject(&self, page: &dyn ScriptEvaluator) -> bool {
        let script = self.blocker.cookie_blocker_script();
        if script.is_empty() {
            return false;
        }
        page.evaluate_script(&script);
        true
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::cookie::INJECTION_FLAG;
    use crate::engine::BlockerSettings;
    use crate::filters::FilterStrength;

    fn shared_blocker() -> Arc<AdBlocker> {
        Arc::new(AdBlocker::in_memory(BlockerSettings::default()))
    }

    fn sub(url: &str) -> WebResourceRequest {
        WebResourceRequest::subresource(Url::parse(url).unwrap())
    }

    #[derive(Default)]
    struct RecordingPage {
        scripts: RefCell<Vec<String>>,
    }

    impl ScriptEvaluator for RecordingPage {
        fn evaluate_script(&self, script: &str) {
            self.scripts.borrow_mut().push(script.to_owned());
        }
    }

    #[test]
    fn test_blocked_request_gets_empty_response() {
        let interceptor = RequestInterceptor::new(shared_blocker());
        let Interception::Block(response) =
            interceptor.intercept(&sub("https://ads.doubleclick.net/x.js"))
        else {
            panic!("expected a block");
        };
        assert_eq!(response.status_code, 200);
        assert_eq!(response.content_type, "text/plain");
        assert_eq!(response.encoding, "utf-8");
        assert!(response.body.is_empty());
        assert_eq!(response.url.as_str(), "https://ads.doubleclick.net/x.js");
    }

    #[test]
    fn test_allowed_request_proceeds_uncounted() {
        let blocker = shared_blocker();
        let interceptor = RequestInterceptor::new(Arc::clone(&blocker));
        assert_eq!(
            interceptor.intercept(&sub("https://example.org/app.js")),
            Interception::Proceed
        );
        assert_eq!(blocker.blocked_count(), 0);
    }

    #[test]
    fn test_each_block_counted_once() {
        let blocker = shared_blocker();
        let interceptor = RequestInterceptor::new(Arc::clone(&blocker));
        for _ in 0..3 {
            assert!(interceptor.intercept(&sub("https://doubleclick.net/x")).is_blocked());
        }
        assert_eq!(blocker.blocked_count(), 3);
    }

    #[test]
    fn test_profiles_keep_unwinding_for_fail_open() {
        let manifest: toml::Table = include_str!("../Cargo.toml").parse().unwrap();
        let profiles = manifest["profile"].as_table().unwrap();
        for (name, profile) in profiles {
            assert_ne!(
                profile.get("panic").and_then(|p| p.as_str()),
                Some("abort"),
                "profile {name} aborts on panic"
            );
        }
    }

    #[test]
    fn test_main_frame_never_blocked() {
        let blocker = shared_blocker();
        let interceptor = RequestInterceptor::new(Arc::clone(&blocker));
        let request = WebResourceRequest::main_frame(Url::parse("https://doubleclick.net/").unwrap());
        assert_eq!(interceptor.intercept(&request), Interception::Proceed);
        assert_eq!(blocker.blocked_count(), 0);
    }

    #[test]
    fn test_whitelisted_request_proceeds() {
        let blocker = shared_blocker();
        blocker.add_to_whitelist("doubleclick.net");
        let interceptor = RequestInterceptor::new(blocker);
        assert_eq!(
            interceptor.intercept(&sub("https://ads.doubleclick.net/x")),
            Interception::Proceed
        );
    }

    #[test]
    fn test_strength_change_visible_to_interceptor() {
        let blocker = shared_blocker();
        let interceptor = RequestInterceptor::new(Arc::clone(&blocker));
        let request = sub("https://example.com/banner/foo.js");
        assert!(interceptor.intercept(&request).is_blocked());
        blocker.set_strength(FilterStrength::Light);
        assert!(!interceptor.intercept(&request).is_blocked());
    }

    #[test]
    fn test_injects_on_finish_and_history_change() {
        let injector = PageScriptInjector::new(shared_blocker());
        let page = RecordingPage::default();
        assert!(injector.on_page_finished(&page));
        assert!(injector.on_history_changed(&page));
        let scripts = page.scripts.borrow();
        assert_eq!(scripts.len(), 2);
        assert!(scripts[0].contains(INJECTION_FLAG));
    }

    #[test]
    fn test_nothing_injected_when_cookie_blocker_off() {
        let blocker = shared_blocker();
        blocker.set_cookie_blocker_enabled(false);
        let injector = PageScriptInjector::new(blocker);
        let page = RecordingPage::default();
        assert!(!injector.on_page_finished(&page));
        assert!(page.scripts.borrow().is_empty());
    }
}
