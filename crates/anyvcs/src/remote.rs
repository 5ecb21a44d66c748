//! VCS type detection from a remote URL.
//!
//! Detection walks an ordered rule table. Rules bound to a host either match
//! fully or fail detection outright: a known provider with a malformed path
//! is a non-repository location, not an unknown provider, and must never
//! fall through to the generic extension rule at the end of the table.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::Deserialize;
use url::Url;

use crate::error::{Result, VcsError};
use crate::repo::VcsType;

/// One entry in the detection table. Either `vcs` is set and a match answers
/// immediately, or `check` runs an auxiliary lookup over the named capture
/// groups of the match.
struct DetectionRule {
    /// Host the rule is bound to; empty applies regardless of host.
    host: &'static str,
    pattern: Regex,
    vcs: Option<VcsType>,
    check: Option<fn(&Captures) -> Result<VcsType>>,
}

lazy_static! {
    static ref RULES: Vec<DetectionRule> = vec![
        DetectionRule {
            host: "github.com",
            pattern: Regex::new(
                r"^(github\.com/[A-Za-z0-9_.\-]+/[A-Za-z0-9_.\-]+)(/[A-Za-z0-9_.\-]+)*$"
            )
            .unwrap(),
            vcs: Some(VcsType::Git),
            check: None,
        },
        DetectionRule {
            host: "bitbucket.org",
            pattern: Regex::new(
                r"^(bitbucket\.org/(?P<name>[A-Za-z0-9_.\-]+/[A-Za-z0-9_.\-]+))(/[A-Za-z0-9_.\-]+)*$"
            )
            .unwrap(),
            vcs: None,
            check: Some(check_bitbucket),
        },
        DetectionRule {
            host: "launchpad.net",
            pattern: Regex::new(
                r"^(launchpad\.net/(([A-Za-z0-9_.\-]+)(/[A-Za-z0-9_.\-]+)?|~[A-Za-z0-9_.\-]+/(\+junk|[A-Za-z0-9_.\-]+)/[A-Za-z0-9_.\-]+))(/[A-Za-z0-9_.\-]+)*$"
            )
            .unwrap(),
            vcs: Some(VcsType::Bzr),
            check: None,
        },
        DetectionRule {
            host: "git.launchpad.net",
            pattern: Regex::new(
                r"^(git\.launchpad\.net/(([A-Za-z0-9_.\-]+)|~[A-Za-z0-9_.\-]+/(\+git|[A-Za-z0-9_.\-]+)/[A-Za-z0-9_.\-]+))$"
            )
            .unwrap(),
            vcs: Some(VcsType::Git),
            check: None,
        },
        DetectionRule {
            host: "go.googlesource.com",
            pattern: Regex::new(r"^(go\.googlesource\.com/[A-Za-z0-9_.\-]+/?)$").unwrap(),
            vcs: Some(VcsType::Git),
            check: None,
        },
        DetectionRule {
            host: "code.google.com",
            pattern: Regex::new(
                r"^(code\.google\.com/[pr]/(?P<project>[a-z0-9\-]+)(\.(?P<repo>[a-z0-9\-]+))?)(/[A-Za-z0-9_.\-]+)*$"
            )
            .unwrap(),
            vcs: None,
            check: Some(check_google),
        },
        // Legacy Google Code hosting encodes the type in the path.
        DetectionRule {
            host: "",
            pattern: Regex::new(r"^([a-z0-9_\-.]+)\.googlecode\.com/(?P<type>git|hg|svn)(/.*)?$")
                .unwrap(),
            vcs: None,
            check: Some(check_type_capture),
        },
        // Generic catch-all on the path extension. Must stay last so known
        // hosts are always answered by their own rule.
        DetectionRule {
            host: "",
            pattern: Regex::new(r"\.(?P<type>git|hg|svn|bzr)$").unwrap(),
            vcs: None,
            check: Some(check_type_capture),
        },
    ];
}

/// Detects the VCS type from a remote URL.
///
/// Only URL-shaped remotes are handled; scheme-less locations such as the
/// ssh shorthand `git@host:path` fail with [`VcsError::CannotDetectVcs`].
/// Some rules (Bitbucket, Google Code) verify the type with a network
/// lookup; a failed or ambiguous lookup also yields `CannotDetectVcs`
/// rather than the transport error.
pub fn detect_vcs_from_url(url: &str) -> Result<VcsType> {
    let parsed = match Url::parse(url) {
        Ok(u) => u,
        // No scheme means no host component to go on.
        Err(url::ParseError::RelativeUrlWithoutBase) => return Err(VcsError::CannotDetectVcs),
        Err(e) => return Err(e.into()),
    };

    let host = match parsed.host_str() {
        Some(h) if !h.is_empty() => h,
        _ => return Err(VcsError::CannotDetectVcs),
    };

    let candidate = format!("{}{}", host, parsed.path());

    for rule in RULES.iter() {
        if !rule.host.is_empty() && rule.host != host {
            continue;
        }

        let caps = match rule.pattern.captures(&candidate) {
            Some(c) => c,
            None => {
                if !rule.host.is_empty() {
                    // The host is a known provider but the path is not a
                    // repository location there.
                    return Err(VcsError::CannotDetectVcs);
                }
                continue;
            }
        };

        if let Some(vcs) = rule.vcs {
            return Ok(vcs);
        }

        if let Some(check) = rule.check {
            return check(&caps).map_err(|e| {
                log::debug!("verification lookup for {} failed: {}", url, e);
                VcsError::CannotDetectVcs
            });
        }

        return Err(VcsError::CannotDetectVcs);
    }

    Err(VcsError::CannotDetectVcs)
}

/// The part of the Bitbucket repository response we care about.
#[derive(Deserialize)]
struct BitbucketRepo {
    scm: String,
}

/// Bitbucket hosts both git and hg repositories; its API reports which.
fn check_bitbucket(caps: &Captures) -> Result<VcsType> {
    let name = capture(caps, "name")?;
    let api = format!("https://api.bitbucket.org/1.0/repositories/{}", name);
    let body = http_get(&api)?;
    let repo: BitbucketRepo =
        serde_json::from_str(&body).map_err(|_| VcsError::CannotDetectVcs)?;
    repo.scm.parse()
}

/// Google Code does not expose the type in the URL or an API; it has to be
/// scraped out of the checkout-instructions page.
fn check_google(caps: &Captures) -> Result<VcsType> {
    lazy_static! {
        static ref CHECKOUT_CMD: Regex = Regex::new(r#"id="checkoutcmd">(hg|git|svn)"#).unwrap();
    }

    let project = capture(caps, "project")?;
    let repo = caps.name("repo").map(|m| m.as_str()).unwrap_or("");
    let page = http_get(&format!(
        "https://code.google.com/p/{}/source/checkout?repo={}",
        project, repo
    ))?;

    match CHECKOUT_CMD.captures(&page).map(|m| m[1].to_string()) {
        // Google only serves svn through the legacy <project>.googlecode.com
        // URLs, so an svn answer here cannot be checked out from this URL.
        Some(t) if t == "svn" => Err(VcsError::CannotDetectVcs),
        Some(t) => t.parse(),
        None => Err(VcsError::CannotDetectVcs),
    }
}

/// The pattern captured the type verbatim.
fn check_type_capture(caps: &Captures) -> Result<VcsType> {
    capture(caps, "type")?.parse()
}

fn capture<'a>(caps: &'a Captures, name: &str) -> Result<&'a str> {
    caps.name(name)
        .map(|m| m.as_str())
        .ok_or(VcsError::CannotDetectVcs)
}

/// Best-effort blocking GET. Anything other than a 2xx with a readable body
/// counts as "cannot determine".
fn http_get(url: &str) -> Result<String> {
    let response = reqwest::blocking::get(url).map_err(|_| VcsError::CannotDetectVcs)?;
    if !response.status().is_success() {
        return Err(VcsError::CannotDetectVcs);
    }
    response.text().map_err(|_| VcsError::CannotDetectVcs)
}
