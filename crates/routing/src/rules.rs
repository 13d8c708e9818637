//! Fixed tag → destination tables.

use std::collections::BTreeSet;

use {
    pixlive_common::types::RouteTarget,
    pixlive_config::{AnnouncementDestinations, CollectionDestinations},
};

/// Tags whose presence forces a blurred announcement.
pub const SENSITIVE_TAGS: [&str; 3] = ["limited", "futa", "nsfw"];

pub fn is_sensitive(tags: &BTreeSet<String>) -> bool {
    SENSITIVE_TAGS.iter().any(|t| tags.contains(*t))
}

/// Announcement destinations for `tags`, in rule order.
///
/// `limited`, `futa` and `nsfw` always blur. `sfw` and the default
/// destination blur when any sensitive tag is present. A destination selected
/// by several rules appears once, blurred if any of those rules blurs.
/// Unconfigured (empty) destinations are skipped.
pub fn announcement_targets(
    tags: &BTreeSet<String>,
    destinations: &AnnouncementDestinations,
) -> Vec<RouteTarget> {
    let sensitive = is_sensitive(tags);
    let rules = [
        ("limited", &destinations.limited, true),
        ("futa", &destinations.futa, true),
        ("nsfw", &destinations.nsfw, true),
        ("sfw", &destinations.sfw, sensitive),
    ];

    let selected = rules
        .into_iter()
        .filter(|(tag, ..)| tags.contains(*tag))
        .map(|(_, dest, redact)| (dest, redact))
        .chain(std::iter::once((&destinations.default, sensitive)));

    let mut targets: Vec<RouteTarget> = Vec::new();
    for (dest, redact) in selected {
        if dest.is_empty() {
            continue;
        }
        match targets.iter_mut().find(|t| &t.destination == dest) {
            Some(existing) => existing.redact |= redact,
            None => targets.push(RouteTarget::new(dest.as_str(), redact)),
        }
    }
    targets
}

/// Collection destinations for `tags`.
///
/// With `limited`, each of `sfw`/`nsfw`/`futa` maps to its limited variant
/// instead of the regular one. `limited` alone selects nothing.
pub fn collection_targets(
    tags: &BTreeSet<String>,
    destinations: &CollectionDestinations,
) -> BTreeSet<String> {
    let limited = tags.contains("limited");
    let table = [
        ("sfw", &destinations.sfw, &destinations.limited_sfw),
        ("nsfw", &destinations.nsfw, &destinations.limited_nsfw),
        ("futa", &destinations.futa, &destinations.limited_futa),
    ];

    table
        .into_iter()
        .filter(|(tag, ..)| tags.contains(*tag))
        .map(|(_, regular, limited_variant)| if limited { limited_variant } else { regular })
        .filter(|dest| !dest.is_empty())
        .cloned()
        .collect()
}
