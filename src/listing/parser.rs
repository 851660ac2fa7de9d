//! Anchor extraction from listing pages.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::debug;

#[allow(clippy::expect_used)]
static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("static selector is valid"));

/// Returns every anchor `href` in `html`, percent-decoded, in document order.
///
/// No filtering happens here; anchors without an `href` are not links and
/// are left out. An href that does not decode to UTF-8 is kept as written.
#[must_use]
pub fn parse_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&ANCHOR_SELECTOR)
        .filter_map(|element| element.value().attr("href"))
        .map(|href| match urlencoding::decode(href) {
            Ok(decoded) => decoded.into_owned(),
            Err(e) => {
                debug!(href = %href, error = %e, "href decoding failed, using raw value");
                href.to_string()
            }
        })
        .collect()
}
