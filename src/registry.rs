// Which adapter handles a page, and which page to open after install/update.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

pub const HOMEPAGE: &str = "https://zakilo.syrnikovpavel.ru/";

/// Versions that ship a changelog page
const CHANGELOG_VERSIONS: &[&str] = &["1.0.2", "1.0.3"];

/// URL glob (`*` matches anything) and the site it routes to; first match wins
pub const ROUTES: &[(&str, &str)] = &[
    ("*://*.ozon.ru/*", "ozon"),
    ("*://*.auchan.ru/*", "auchan"),
    ("*://market-delivery.yandex.ru/*", "delivery_club"),
    ("*://eda.yandex.ru/*", "delivery_club"),
    ("*://lavka.yandex.ru/*", "lavka"),
    ("*://kuper.ru/*", "kuper"),
    ("*://lenta.com/*", "lenta"),
    ("*://magnit.ru/*", "magnit"),
    ("*://*.perekrestok.ru/*", "perekrestok"),
    ("*://shop.samberi.com/*", "samberi"),
    ("*://5ka.ru/*", "pyaterochka"),
    ("*://samokat.ru/*", "samokat"),
    ("*://online.metro-cc.ru/*", "metro"),
];

lazy_static! {
    static ref COMPILED: Vec<(Regex, &'static str)> = ROUTES
        .iter()
        .map(|(glob, site)| (Regex::new(&glob_to_regex(glob)).unwrap(), *site))
        .collect();
}

fn glob_to_regex(glob: &str) -> String {
    format!("^{}$", regex::escape(glob).replace(r"\*", ".*"))
}

/// Site name for `url`, if any adapter handles it
pub fn route(url: &str) -> Option<&'static str> {
    COMPILED
        .iter()
        .find(|(pattern, _)| pattern.is_match(url))
        .map(|(_, site)| *site)
}

/// Why the extension lifecycle event fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallReason {
    Install,
    Update,
    /// Browser or shared-module update; never opens a page
    Other,
}

impl InstallReason {
    pub fn parse(reason: &str) -> Self {
        match reason {
            "install" => InstallReason::Install,
            "update" => InstallReason::Update,
            _ => InstallReason::Other,
        }
    }
}

/// Page to open after install or update, `None` when nothing should open
pub fn onboarding_page(reason: InstallReason, version: &str) -> Option<String> {
    match reason {
        InstallReason::Install => Some(HOMEPAGE.to_string()),
        InstallReason::Update if CHANGELOG_VERSIONS.contains(&version) => Some(format!("{}{}", HOMEPAGE, version)),
        InstallReason::Update | InstallReason::Other => None,
    }
}
