//! Reference-link and tag extraction from post captions.

use std::{collections::BTreeSet, sync::LazyLock};

use regex::Regex;

#[allow(clippy::unwrap_used)]
static REFERENCE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://(?:www\.)?patreon\.com/posts/(?:[\w-]+-)?(\d+)").unwrap()
});

/// A reference link found in a caption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceLink {
    /// Numeric post id.
    pub id: String,
    /// The whole matched link.
    pub url: String,
}

/// First reference link in `caption`.
pub fn find_reference(caption: &str) -> Option<ReferenceLink> {
    let caps = REFERENCE_LINK.captures(caption)?;
    Some(ReferenceLink {
        id: caps.get(1)?.as_str().to_string(),
        url: caps.get(0)?.as_str().to_string(),
    })
}

/// Lower-cased `#tag` tokens, marker stripped.
pub fn extract_tags(caption: &str) -> BTreeSet<String> {
    caption
        .split_whitespace()
        .filter(|tok| tok.starts_with('#'))
        .map(|tok| tok.trim_matches('#').to_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_plain_and_slugged_links() {
        let link = find_reference("see it here https://www.patreon.com/posts/123 #sfw").unwrap();
        assert_eq!(link.id, "123");
        assert_eq!(link.url, "https://www.patreon.com/posts/123");

        let link = find_reference("new! http://patreon.com/posts/summer-pinup-set-98765?utm=x").unwrap();
        assert_eq!(link.id, "98765");
        assert_eq!(link.url, "http://patreon.com/posts/summer-pinup-set-98765");
    }

    #[test]
    fn no_link() {
        assert!(find_reference("just a picture #sfw").is_none());
        assert!(find_reference("https://patreon.com/user/posts").is_none());
        assert!(find_reference("").is_none());
    }

    #[test]
    fn tags_are_lowercased_and_stripped() {
        let tags = extract_tags("Look #SFW #Limited  ##futa# plain # #nsfw");
        let expected: BTreeSet<String> = ["sfw", "limited", "futa", "nsfw"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(tags, expected);
    }

    #[test]
    fn hash_inside_word_is_not_a_tag() {
        assert!(extract_tags("issue#12 c#").is_empty());
    }
}
