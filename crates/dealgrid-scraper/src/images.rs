//! Recovery of the image list embedded in an inline script.
//!
//! Item pages do not render the full gallery in the DOM. The authoritative
//! list lives in a script as a JSON array literal surrounded by ordinary
//! JavaScript, e.g. `'colorImages': { 'initial': [{"hiRes": ...}, ...] }`.
//! The array is cut out with a balanced-bracket scan and parsed with
//! `serde_json`. Every failure degrades to an empty [`ImageSet`].

use std::collections::HashSet;

use serde::Deserialize;

use crate::browser::{Element, Page};
use crate::layout::ItemLayout;
use crate::wait::PollConfig;

/// One entry of the embedded image array.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageInfo {
    #[serde(rename = "hiRes", default)]
    pub hi_res: Option<String>,
    #[serde(default)]
    pub thumb: Option<String>,
    #[serde(default)]
    pub large: Option<String>,
    /// Viewport-size → dimensions map for the main display slot.
    #[serde(rename = "main", default)]
    pub main_region: Option<serde_json::Value>,
}

impl ImageInfo {
    /// Best available URL: `hiRes`, else `large`.
    #[must_use]
    pub fn best_url(&self) -> Option<&str> {
        [self.hi_res.as_deref(), self.large.as_deref()]
            .into_iter()
            .flatten()
            .find(|url| !url.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageSet {
    pub main: String,
    pub gallery: Vec<String>,
}

/// Returns the slice of `s` from its leading `[` through the matching `]`.
///
/// Counts both `[]` and `{}` nesting and skips brackets inside JSON string
/// literals. Returns `None` if `s` does not start with `[` or is unbalanced.
#[must_use]
pub fn extract_balanced_array(s: &str) -> Option<&str> {
    if !s.starts_with('[') {
        return None;
    }
    let mut depth: i32 = 0;
    let mut in_string = false;
    let mut escape = false;
    for (i, c) in s.char_indices() {
        if escape {
            escape = false;
            continue;
        }
        if in_string {
            match c {
                '\\' => escape = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' | '{' => depth += 1,
            '}' => depth -= 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Locates `key` in `script`, then the first `[` after it, and returns the
/// balanced array literal starting there.
#[must_use]
pub fn image_array_literal<'a>(script: &'a str, key: &str) -> Option<&'a str> {
    let key_at = script.find(key)?;
    let after_key = &script[key_at + key.len()..];
    let open_at = after_key.find('[')?;
    extract_balanced_array(&after_key[open_at..])
}

/// Splits parsed entries into the main image and an ordered, de-duplicated
/// gallery.
///
/// The first entry is always the main image, even when a later entry repeats
/// it. Later entries join the gallery once each, in encounter order, and
/// never duplicate the main image.
#[must_use]
pub fn classify_images(images: &[ImageInfo]) -> ImageSet {
    let Some((first, rest)) = images.split_first() else {
        return ImageSet::default();
    };

    let mut seen: HashSet<&str> = HashSet::new();
    let main = first.best_url().unwrap_or_default();
    if !main.is_empty() {
        seen.insert(main);
    }

    let gallery = rest
        .iter()
        .filter_map(ImageInfo::best_url)
        .filter(|url| seen.insert(*url))
        .map(str::to_string)
        .collect();

    ImageSet {
        main: main.to_string(),
        gallery,
    }
}

/// Parses the image set out of a script body. Never fails: any problem is
/// logged and yields an empty set.
#[must_use]
pub fn parse_image_script(script: &str, key: &str) -> ImageSet {
    let Some(literal) = image_array_literal(script, key) else {
        tracing::debug!(key, "image array literal not found in script");
        return ImageSet::default();
    };
    match serde_json::from_str::<Vec<ImageInfo>>(literal) {
        Ok(images) => classify_images(&images),
        Err(e) => {
            tracing::warn!(error = %e, len = literal.len(), "image array did not parse");
            ImageSet::default()
        }
    }
}

/// Polls the page's inline scripts for the image marker and parses the
/// first matching script.
pub(crate) async fn extract_images<P: Page>(
    page: &P,
    layout: &ItemLayout,
    poll: PollConfig,
) -> ImageSet {
    let deadline = poll.deadline();
    loop {
        match find_script(page, layout.image_script_marker).await {
            Some(script) => return parse_image_script(&script, layout.image_array_key),
            None => {
                if !poll.pause_until(deadline).await {
                    tracing::debug!(
                        marker = layout.image_script_marker,
                        "image script not found before deadline"
                    );
                    return ImageSet::default();
                }
            }
        }
    }
}

async fn find_script<P: Page>(page: &P, marker: &str) -> Option<String> {
    let scripts = match page.query_all("script").await {
        Ok(scripts) => scripts,
        Err(e) => {
            tracing::debug!(error = %e, "script lookup failed");
            return None;
        }
    };
    for script in &scripts {
        if let Ok(body) = script.text().await {
            if body.contains(marker) {
                return Some(body);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testing::{FakeNode, FakePage, FakeState};

    fn hi_res(url: &str) -> ImageInfo {
        ImageInfo {
            hi_res: Some(url.to_string()),
            ..ImageInfo::default()
        }
    }

    #[test]
    fn balanced_scan_keeps_nested_arrays() {
        let script = r#"var data = {'initial':[{"a":[1,2]},{"b":3}]}; foo();"#;
        assert_eq!(
            image_array_literal(script, "'initial':"),
            Some(r#"[{"a":[1,2]},{"b":3}]"#)
        );
    }

    #[test]
    fn balanced_scan_ignores_brackets_in_strings() {
        let s = r#"["a]b", {"c": "[x"}] tail"#;
        assert_eq!(extract_balanced_array(s), Some(r#"["a]b", {"c": "[x"}]"#));
    }

    #[test]
    fn balanced_scan_rejects_unterminated_array() {
        assert_eq!(extract_balanced_array(r#"[{"a":1}"#), None);
    }

    #[test]
    fn missing_key_yields_none() {
        assert_eq!(image_array_literal("var x = [1];", "'initial':"), None);
    }

    #[test]
    fn first_image_is_main_and_gallery_is_deduplicated() {
        let images = vec![hi_res("A"), hi_res("B"), hi_res("A"), hi_res("C")];
        let set = classify_images(&images);
        assert_eq!(set.main, "A");
        assert_eq!(set.gallery, vec!["B".to_string(), "C".to_string()]);
    }

    #[test]
    fn large_is_used_when_hi_res_missing() {
        let images = vec![
            ImageInfo {
                hi_res: None,
                large: Some("L".to_string()),
                ..ImageInfo::default()
            },
            hi_res(""),
            hi_res("B"),
        ];
        let set = classify_images(&images);
        assert_eq!(set.main, "L");
        assert_eq!(set.gallery, vec!["B".to_string()]);
    }

    #[test]
    fn empty_array_yields_empty_set() {
        assert_eq!(classify_images(&[]), ImageSet::default());
    }

    #[test]
    fn malformed_json_degrades_to_empty() {
        let script = "'colorImages': { 'initial': [{hiRes: 'A'}] }";
        assert_eq!(parse_image_script(script, "'initial':"), ImageSet::default());
    }

    #[test]
    fn parses_realistic_script() {
        let script = r#"
            P.when('A').register("ImageBlockATF", function(A){
                var data = {
                    'colorImages': { 'initial': [
                        {"hiRes":"https://m.media-amazon.com/1._SL1500_.jpg","thumb":"t1","large":"l1","main":{"https://m/1.jpg":[679,679]}},
                        {"hiRes":null,"thumb":"t2","large":"https://m.media-amazon.com/2.jpg","main":{}},
                        {"hiRes":"https://m.media-amazon.com/1._SL1500_.jpg","thumb":"t1","large":"l1"}
                    ]},
                    'colorToAsin': {'initial': {}},
                };
                return data;
            });"#;
        let set = parse_image_script(script, "'initial':");
        assert_eq!(set.main, "https://m.media-amazon.com/1._SL1500_.jpg");
        assert_eq!(
            set.gallery,
            vec!["https://m.media-amazon.com/2.jpg".to_string()]
        );
    }

    #[tokio::test]
    async fn extract_images_reads_marked_script() {
        let layout = ItemLayout::amazon();
        let page = FakePage::new(
            FakeState::default()
                .with("script", FakeNode::html("window.ue_t0 = 1;"))
                .with(
                    "script",
                    FakeNode::html(r#"var d = {'colorImages': {'initial': [{"hiRes":"A"},{"hiRes":"B"}]}};"#),
                ),
        );
        let poll = PollConfig::new(Duration::from_millis(20), Duration::from_millis(5));
        let set = extract_images(&page, &layout, poll).await;
        assert_eq!(set.main, "A");
        assert_eq!(set.gallery, vec!["B".to_string()]);
    }

    #[tokio::test]
    async fn extract_images_times_out_to_empty() {
        let layout = ItemLayout::amazon();
        let page = FakePage::new(FakeState::default().with("script", FakeNode::html("x();")));
        let poll = PollConfig::new(Duration::from_millis(20), Duration::from_millis(5));
        assert_eq!(extract_images(&page, &layout, poll).await, ImageSet::default());
    }
}
