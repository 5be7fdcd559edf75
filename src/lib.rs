//! # PageGuard — moteur de blocage pubs/trackers
//!
//! Moteur de classification des requêtes réseau d'une web view embarquée :
//! chaque sous-ressource est bloquée ou autorisée de façon synchrone, et un
//! script de suppression des bannières de consentement cookies est injecté
//! après chaque chargement de page.
//!
//! ## Architecture des modules
//!
//! - [`filters`] : Corpus statique — domaines bloqués et motifs d'URL, répartis
//!   en niveaux cumulatifs (`Light` ⊂ `Medium` ⊂ `Strong`).
//!
//! - [`engine`] : [`engine::AdBlocker`], le moteur de décision. Liste blanche
//!   d'abord, puis domaines, puis motifs. Partagé en `Arc` par la racine de
//!   composition (pas de singleton global).
//!
//! - [`whitelist`] / [`counter`] : Liste blanche utilisateur et compteur de
//!   requêtes bloquées, persistés à chaque modification.
//!
//! - [`cookie`] : Génération du script anti-bannières cookies.
//!
//! - [`interception`] : Points d'entrée appelés par le moteur web —
//!   `RequestInterceptor` (avant chaque requête) et `PageScriptInjector`
//!   (fin de chargement, navigation SPA).
//!
//! - [`store`] / [`config`] : Persistance TOML des trois espaces clé-valeur
//!   et configuration de démarrage.
//!
//! - [`host`] : Extraction et normalisation des noms d'hôte.

pub mod config;
pub mod cookie;
pub mod counter;
pub mod engine;
pub mod error;
pub mod filters;
pub mod host;
pub mod interception;
pub mod store;
pub mod whitelist;

pub use engine::{AdBlocker, BlockerSettings, Verdict};
pub use filters::FilterStrength;
