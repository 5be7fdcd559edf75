//! Point d'entrée de PageGuard.
//!
//! Usage :
//!   pageguard [OPTIONS] [URL...]
//!
//! Options :
//!   --strength <light|medium|strong>   change le niveau de blocage
//!   --enable / --disable               active / désactive le blocage
//!   --cookie-blocker <on|off>          active / désactive l'anti-bannières
//!   --whitelist-add <DOMAINE>          ajoute un domaine à la liste blanche
//!   --whitelist-remove <DOMAINE>       retire un domaine de la liste blanche
//!   --whitelist-clear                  vide la liste blanche
//!   --list-whitelist                   affiche la liste blanche
//!   --reset-count                      remet le compteur à zéro
//!   --cookie-script                    affiche le script anti-bannières
//!   --save-config                      écrit la configuration de démarrage
//!                                      (réglages courants) dans config.toml
//!
//! Exemples :
//!   cargo run -- https://ads.doubleclick.net/x.js     → BLOCK
//!   cargo run -- --strength light example.com/banner/a.js → ALLOW

use std::env;
use std::error::Error;
use std::sync::Arc;

use pageguard::config::{BlockingConfig, Config};
use pageguard::interception::{Interception, RequestInterceptor, WebResourceRequest};
use pageguard::{AdBlocker, FilterStrength, Verdict};
use url::Url;

/// Une action demandée sur la ligne de commande, appliquée dans l'ordre.
#[derive(Debug)]
enum Action {
    Strength(FilterStrength),
    Enabled(bool),
    CookieBlocker(bool),
    WhitelistAdd(String),
    WhitelistRemove(String),
    WhitelistClear,
    ListWhitelist,
    ResetCount,
    CookieScript,
    SaveConfig,
    Check(String),
}

fn main() -> Result<(), Box<dyn Error>> {
    // ── 1. Logging / Tracing ───────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // ── 2. Arguments ───────────────────────────────────────────────────
    let actions = parse_args(env::args().skip(1))?;

    // ── 3. Racine de composition : une seule instance du moteur ────────
    let config = Config::load();
    let initial = config.blocking.initial_settings();
    let blocker = Arc::new(match config.data_dir() {
        Some(dir) => AdBlocker::open(&dir, initial),
        None => AdBlocker::in_memory(initial),
    });
    let interceptor = RequestInterceptor::new(Arc::clone(&blocker));

    // ── 4. Exécution ───────────────────────────────────────────────────
    let mut checked = false;
    for action in actions {
        match action {
            Action::Strength(s) => blocker.set_strength(s),
            Action::Enabled(on) => blocker.set_enabled(on),
            Action::CookieBlocker(on) => blocker.set_cookie_blocker_enabled(on),
            Action::WhitelistAdd(d) => {
                blocker.add_to_whitelist(&d);
            }
            Action::WhitelistRemove(d) => {
                blocker.remove_from_whitelist(&d);
            }
            Action::WhitelistClear => blocker.clear_whitelist(),
            Action::ListWhitelist => {
                for domain in blocker.whitelist() {
                    println!("{domain}");
                }
            }
            Action::ResetCount => blocker.reset_blocked_count(),
            Action::CookieScript => println!("{}", blocker.cookie_blocker_script()),
            Action::SaveConfig => {
                let mut snapshot = config.clone();
                snapshot.blocking = BlockingConfig::from(&blocker.settings());
                let path = snapshot.save()?;
                println!("{}", path.display());
            }
            Action::Check(input) => {
                check(&blocker, &interceptor, &input);
                checked = true;
            }
        }
    }

    if checked {
        println!(
            "strength={} blocked_count={}",
            blocker.strength(),
            blocker.blocked_count()
        );
    }
    Ok(())
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Vec<Action>, String> {
    let mut actions = Vec::new();

    while let Some(arg) = args.next() {
        let mut value = |flag: &str| {
            args.next()
                .ok_or_else(|| format!("{flag} attend une valeur"))
        };
        let action = match arg.as_str() {
            "--strength" => Action::Strength(value("--strength")?.parse()?),
            "--enable" => Action::Enabled(true),
            "--disable" => Action::Enabled(false),
            "--cookie-blocker" => match value("--cookie-blocker")?.as_str() {
                "on" | "true" => Action::CookieBlocker(true),
                "off" | "false" => Action::CookieBlocker(false),
                other => return Err(format!("--cookie-blocker : valeur invalide '{other}'")),
            },
            "--whitelist-add" => Action::WhitelistAdd(value("--whitelist-add")?),
            "--whitelist-remove" => Action::WhitelistRemove(value("--whitelist-remove")?),
            "--whitelist-clear" => Action::WhitelistClear,
            "--list-whitelist" => Action::ListWhitelist,
            "--reset-count" => Action::ResetCount,
            "--cookie-script" => Action::CookieScript,
            "--save-config" => Action::SaveConfig,
            flag if flag.starts_with("--") => return Err(format!("option inconnue : {flag}")),
            _ => Action::Check(arg.clone()),
        };
        actions.push(action);
    }
    Ok(actions)
}

/// Fait passer une URL par l'intercepteur, comme le ferait la web view pour
/// une sous-ressource, et affiche la décision.
fn check(blocker: &AdBlocker, interceptor: &RequestInterceptor, input: &str) {
    let Some(url) = parse_url(input) else {
        // Non parsable : seuls les motifs peuvent encore s'appliquer.
        print_verdict(input, &blocker.classify(input));
        return;
    };

    let verdict = blocker.classify(url.as_str());
    let interception = interceptor.intercept(&WebResourceRequest::subresource(url.clone()));
    debug_assert_eq!(
        verdict.is_blocked(),
        matches!(interception, Interception::Block(_))
    );
    print_verdict(url.as_str(), &verdict);
}

fn print_verdict(url: &str, verdict: &Verdict) {
    let decision = if verdict.is_blocked() { "BLOCK" } else { "ALLOW" };
    let reason = match verdict {
        Verdict::Disabled => "blocking disabled".to_string(),
        Verdict::Whitelisted => "whitelisted".to_string(),
        Verdict::BlockedDomain(d) => format!("domain {d}"),
        Verdict::BlockedPattern(i) => format!("pattern #{i}"),
        Verdict::Allowed => "no match".to_string(),
    };
    println!("{decision}\t{url}\t({reason})");
}

/// Parse l'argument comme URL. Sans schéma (http/https), on ajoute "https://".
fn parse_url(input: &str) -> Option<Url> {
    if input.contains("://")
        && let Ok(url) = Url::parse(input)
    {
        return Some(url);
    }
    Url::parse(&format!("https://{input}")).ok()
}
