//! Markdown report rendering

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd, html};
use url::Url;

const ALLOWED_SCHEMES: [&str; 3] = ["http", "https", "mailto"];

/// Render a markdown report to HTML
///
/// Raw HTML in the report is emitted as text. Links and images survive only
/// when their target is relative or uses an allowed scheme; otherwise the
/// link text (or image alt text) is kept as plain text.
pub fn to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    // One entry per open link or image: whether its tags are being dropped
    let mut open_links: Vec<bool> = Vec::new();

    let parser = Parser::new_ext(markdown, options).filter_map(move |event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Some(Event::Text(raw)),
        Event::Start(Tag::Link { ref dest_url, .. } | Tag::Image { ref dest_url, .. }) => {
            let safe = is_safe_url(dest_url);
            open_links.push(!safe);
            safe.then_some(event)
        }
        Event::End(TagEnd::Link | TagEnd::Image) => {
            let dropped = open_links.pop().unwrap_or(false);
            (!dropped).then_some(event)
        }
        other => Some(other),
    });

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

fn is_safe_url(dest: &str) -> bool {
    match Url::parse(dest) {
        Ok(url) => ALLOWED_SCHEMES.contains(&url.scheme()),
        Err(url::ParseError::RelativeUrlWithoutBase) => true,
        Err(_) => false,
    }
}
