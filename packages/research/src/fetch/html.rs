//! HTML text and metadata extraction.
//!
//! Body text is the concatenated content of `p`, `h1`, `h2`, `h3` and `li`
//! elements; metadata comes from `<meta>` tags.

use scraper::{ElementRef, Html, Selector};

use crate::traits::fetcher::FetchedPage;

const CONTENT_SELECTOR: &str = "p, h1, h2, h3, li";

/// Date meta tags, checked in order.
const DATE_META: &[&str] = &[
    r#"meta[property="article:published_time"]"#,
    r#"meta[name="date"]"#,
    r#"meta[name="pubdate"]"#,
    r#"meta[name="original-publication-date"]"#,
    r#"meta[name="publication_date"]"#,
    r#"meta[property="og:published_time"]"#,
];

/// Parse a page into text plus metadata. Text is cut to `text_limit` chars.
pub fn parse_page(html: &str, text_limit: usize) -> FetchedPage {
    let document = Html::parse_document(html);

    FetchedPage {
        text: truncate(&content_text(&document), text_limit),
        thumbnail: meta_content(&document, r#"meta[property="og:image"]"#),
        description: meta_content(&document, r#"meta[name="description"]"#)
            .or_else(|| meta_content(&document, r#"meta[property="og:description"]"#)),
        published_date: DATE_META
            .iter()
            .find_map(|css| meta_content(&document, css))
            .map(|d| d.split('T').next().unwrap_or_default().to_string()),
    }
}

/// Visible text of the content elements, space separated.
pub fn extract_text(html: &str) -> String {
    content_text(&Html::parse_document(html))
}

fn content_text(document: &Html) -> String {
    let Ok(selector) = Selector::parse(CONTENT_SELECTOR) else {
        return String::new();
    };

    document
        .select(&selector)
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of an element with runs of whitespace collapsed.
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// `content` of the first tag matching `css`, if non-empty.
fn meta_content(document: &Html, css: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

/// Text content of an HTML fragment: tags dropped, entities decoded.
pub fn fragment_text(fragment: &str) -> String {
    Html::parse_fragment(fragment)
        .root_element()
        .text()
        .collect()
}

/// First `max_chars` characters of `text`.
pub fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head>
        <title>Ignored</title>
        <meta property="og:image" content="https://cdn.example.com/hero.jpg">
        <meta name="description" content="Short &amp; sweet">
        <meta property="og:description" content="OG description">
        <meta property="article:published_time" content="2024-05-01T09:30:00+09:00">
        <script>var p = "<p>not text</p>";</script>
        <style>p { color: red; }</style>
    </head><body>
        <h1>Main   heading</h1>
        <div>outside any content element</div>
        <p>First <b>bold</b> paragraph.</p>
        <ul><li>Item one</li><li>Item &lt;two&gt;</li></ul>
        <p></p>
    </body></html>"#;

    #[test]
    fn test_extract_text() {
        assert_eq!(
            extract_text(PAGE),
            "Main heading First bold paragraph. Item one Item <two>"
        );
    }

    #[test]
    fn test_metadata() {
        let page = parse_page(PAGE, 10_000);
        assert_eq!(page.thumbnail.as_deref(), Some("https://cdn.example.com/hero.jpg"));
        assert_eq!(page.description.as_deref(), Some("Short & sweet"));
        assert_eq!(page.published_date.as_deref(), Some("2024-05-01"));
    }

    #[test]
    fn test_description_falls_back_to_og() {
        let html = r#"<meta content='From OG' property='og:description'><p>x</p>"#;
        let page = parse_page(html, 100);
        assert_eq!(page.description.as_deref(), Some("From OG"));
        assert!(page.published_date.is_none());
    }

    #[test]
    fn test_date_tag_priority() {
        let html = r#"<meta name="pubdate" content="2023-01-02"><meta name="date" content="2023-03-04T00:00">"#;
        assert_eq!(parse_page(html, 100).published_date.as_deref(), Some("2023-03-04"));
    }

    #[test]
    fn test_text_limit_counts_chars() {
        let page = parse_page("<p>가나다라마바사</p>", 3);
        assert_eq!(page.text, "가나다");
    }

    #[test]
    fn test_named_entities_decoded() {
        assert_eq!(
            extract_text("<p>Don&rsquo;t miss it &mdash; AT&amp;T&hellip; &copy; 2024</p>"),
            "Don\u{2019}t miss it \u{2014} AT&T\u{2026} \u{a9} 2024"
        );
    }

    #[test]
    fn test_fragment_text() {
        assert_eq!(fragment_text("it&#39;s &#x41;&#66; &amp;lt;"), "it's AB &lt;");
        assert_eq!(fragment_text("a <b>bold</b> move"), "a bold move");
    }
}
