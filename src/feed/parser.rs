//! Streaming RSS/Atom parser built on quick-xml events.

use std::sync::OnceLock;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;

use super::{Feed, FeedEntry, FeedError};

/// Entry-level elements we extract, keyed by local name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Summary,
    Description,
    Content,
    Published,
    Updated,
}

impl Field {
    fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Field::Title),
            b"link" => Some(Field::Link),
            b"summary" => Some(Field::Summary),
            b"description" => Some(Field::Description),
            b"content" | b"encoded" => Some(Field::Content),
            b"pubDate" | b"published" | b"date" => Some(Field::Published),
            b"updated" => Some(Field::Updated),
            _ => None,
        }
    }
}

/// Raw values collected for one entry before precedence rules apply.
#[derive(Debug, Default)]
struct EntryBuilder {
    title: Option<String>,
    link: Option<String>,
    /// Atom links whose `rel` is neither absent nor `alternate`
    fallback_link: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    content: Option<String>,
    published: Option<String>,
    updated: Option<String>,
}

impl EntryBuilder {
    /// Store a field value after cleaning it. Values that clean up to nothing
    /// are dropped, so a later element can still fill the slot.
    fn set(&mut self, field: Field, raw: &str, markup: bool) {
        let value = clean_text(raw, markup);
        if value.is_empty() {
            return;
        }
        let slot = match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::Summary => &mut self.summary,
            Field::Description => &mut self.description,
            Field::Content => &mut self.content,
            Field::Published => &mut self.published,
            Field::Updated => &mut self.updated,
        };
        // First occurrence wins; later ones come from nested media or source blocks
        if slot.is_none() {
            *slot = Some(value);
        }
    }

    fn build(self) -> FeedEntry {
        FeedEntry {
            title: self.title,
            link: self.link.or(self.fallback_link),
            summary: self.summary.or(self.description).or(self.content),
            published: self.published.or(self.updated),
        }
    }
}

/// Element currently capturing text.
struct Capture {
    field: Field,
    /// Element nesting depth at which the capture began
    depth: usize,
    /// Text is HTML source rather than plain text
    markup: bool,
    buffer: String,
}

/// Parse an RSS 2.0, RSS 1.0 (RDF), or Atom document.
///
/// # Errors
///
/// Returns [`FeedError::Malformed`] for XML syntax errors and
/// [`FeedError::NotAFeed`] if the root element is not `rss`, `RDF`, or
/// `feed`.
pub fn parse_feed(xml: &str) -> Result<Feed, FeedError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut feed = Feed::default();
    let mut saw_root = false;
    let mut depth: usize = 0;
    let mut entry: Option<EntryBuilder> = None;
    let mut entry_depth: usize = 0;
    let mut capture: Option<Capture> = None;
    let mut feed_title: Option<Capture> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                depth += 1;
                if !saw_root {
                    check_root(&e)?;
                    saw_root = true;
                    continue;
                }
                if capture.is_some() {
                    // Inline XHTML content nested inside a captured field
                    continue;
                }

                let local = e.local_name();
                let local = local.as_ref();

                if local == b"item" || local == b"entry" {
                    entry = Some(EntryBuilder::default());
                    entry_depth = depth;
                    continue;
                }

                match entry.as_mut() {
                    Some(builder) => {
                        if let Some(field) = Field::from_local_name(local) {
                            if field == Field::Link && take_atom_link(&e, builder)? {
                                // href form; any text body is ignored
                                continue;
                            }
                            capture = Some(Capture {
                                field,
                                depth,
                                markup: has_markup(&e, field)?,
                                buffer: String::new(),
                            });
                        }
                    }
                    None => {
                        if local == b"title" && feed.title.is_none() && feed_title.is_none() {
                            feed_title = Some(Capture {
                                field: Field::Title,
                                depth,
                                markup: has_markup(&e, Field::Title)?,
                                buffer: String::new(),
                            });
                        }
                    }
                }
            }
            Event::Empty(e) => {
                if !saw_root {
                    return Err(FeedError::NotAFeed);
                }
                if capture.is_none() && e.local_name().as_ref() == b"link" {
                    if let Some(builder) = entry.as_mut() {
                        take_atom_link(&e, builder)?;
                    }
                }
            }
            Event::Text(t) => {
                let text = t
                    .unescape()
                    .map(|c| c.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&t).into_owned());
                append_text(&mut capture, &mut feed_title, &text);
            }
            Event::CData(c) => {
                let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                append_text(&mut capture, &mut feed_title, &text);
            }
            Event::End(_) => {
                if let Some(active) = capture.take() {
                    if active.depth == depth {
                        if let Some(builder) = entry.as_mut() {
                            builder.set(active.field, &active.buffer, active.markup);
                        }
                    } else {
                        capture = Some(active);
                    }
                } else if let Some(active) = feed_title.take() {
                    if active.depth == depth {
                        let title = clean_text(&active.buffer, active.markup);
                        if !title.is_empty() {
                            feed.title = Some(title);
                        }
                    } else {
                        feed_title = Some(active);
                    }
                } else if entry.is_some() && depth == entry_depth {
                    if let Some(builder) = entry.take() {
                        feed.entries.push(builder.build());
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(FeedError::NotAFeed);
    }

    Ok(feed)
}

fn check_root(e: &BytesStart<'_>) -> Result<(), FeedError> {
    match e.local_name().as_ref() {
        b"rss" | b"RDF" | b"feed" => Ok(()),
        _ => Err(FeedError::NotAFeed),
    }
}

/// Whether an element's text is HTML source.
///
/// An explicit `type` attribute decides (Atom `html`/`xhtml`, or an HTML
/// media type). Without one, RSS `description` and `content:encoded` carry
/// HTML and everything else is plain text.
fn has_markup(e: &BytesStart<'_>, field: Field) -> Result<bool, FeedError> {
    match e.try_get_attribute("type")? {
        Some(attr) => {
            let kind = attr.unescape_value()?;
            Ok(matches!(
                kind.trim().to_ascii_lowercase().as_str(),
                "html" | "xhtml" | "text/html" | "application/xhtml+xml"
            ))
        }
        None => Ok(matches!(field, Field::Description | Field::Content)),
    }
}

fn clean_text(raw: &str, markup: bool) -> String {
    if markup {
        strip_html(raw)
    } else {
        collapse_whitespace(raw)
    }
}

fn append_text(capture: &mut Option<Capture>, feed_title: &mut Option<Capture>, text: &str) {
    let target = match (capture.as_mut(), feed_title.as_mut()) {
        (Some(c), _) => c,
        (None, Some(t)) => t,
        (None, None) => return,
    };
    if !target.buffer.is_empty() {
        target.buffer.push(' ');
    }
    target.buffer.push_str(text);
}

/// Record an Atom-style `<link href="..."/>`.
///
/// Returns `false` when the element has no `href`, meaning it is an RSS link
/// whose URL is in the element text.
fn take_atom_link(e: &BytesStart<'_>, builder: &mut EntryBuilder) -> Result<bool, FeedError> {
    let href = match e.try_get_attribute("href")? {
        Some(attr) => attr.unescape_value()?.trim().to_string(),
        None => return Ok(false),
    };
    if href.is_empty() {
        return Ok(true);
    }

    let rel = match e.try_get_attribute("rel")? {
        Some(attr) => Some(attr.unescape_value()?.into_owned()),
        None => None,
    };

    match rel.as_deref() {
        None | Some("alternate") => {
            if builder.link.is_none() {
                builder.link = Some(href);
            }
        }
        Some(_) => {
            if builder.fallback_link.is_none() {
                builder.fallback_link = Some(href);
            }
        }
    }
    Ok(true)
}

fn tag_regex() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag pattern"))
}

fn whitespace_regex() -> &'static Regex {
    static WS: OnceLock<Regex> = OnceLock::new();
    WS.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace pattern"))
}

/// Trim and collapse runs of whitespace to a single space.
fn collapse_whitespace(text: &str) -> String {
    whitespace_regex().replace_all(text.trim(), " ").into_owned()
}

/// Reduce an HTML fragment to plain text.
///
/// Tags become spaces, common entities are decoded, and runs of whitespace
/// collapse to a single space.
pub fn strip_html(html: &str) -> String {
    let without_tags = tag_regex().replace_all(html, " ");
    let decoded = without_tags
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&");
    collapse_whitespace(&decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS2: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/">
  <channel>
    <title>Latest PhDs</title>
    <link>https://www.example.ac.uk</link>
    <item>
      <title>Funded PhD Studentship in Machine Learning</title>
      <link>https://www.example.ac.uk/phd/1</link>
      <description><![CDATA[<p>A fully <b>funded</b> doctoral position.</p>]]></description>
      <pubDate>Mon, 06 Jan 2025 10:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Research Assistant &amp; Graduate Fellowship</title>
      <link>https://www.example.ac.uk/phd/2</link>
      <description>&lt;p&gt;Computer vision &amp;amp; PyTorch&lt;/p&gt;</description>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Careers</title>
  <entry>
    <title type="html">Doctoral Researcher in NLP</title>
    <link rel="self" href="https://careers.example.edu/api/1"/>
    <link rel="alternate" href="https://careers.example.edu/jobs/1"/>
    <summary>Natural language processing group.</summary>
    <published>2025-02-01T09:00:00Z</published>
    <updated>2025-02-03T09:00:00Z</updated>
    <source><title>Other feed</title></source>
  </entry>
  <entry>
    <title>Postdoc</title>
    <link href="https://careers.example.edu/jobs/2"/>
    <content type="xhtml"><div xmlns="http://www.w3.org/1999/xhtml"><p>Deep <em>learning</em></p></div></content>
    <updated>2025-02-05T09:00:00Z</updated>
  </entry>
</feed>"#;

    const RDF: &str = r#"<?xml version="1.0"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns="http://purl.org/rss/1.0/"
         xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel rdf:about="https://jobs.example.org/">
    <title>Jobs</title>
  </channel>
  <item rdf:about="https://jobs.example.org/1">
    <title>Graduate Scholarship</title>
    <link>https://jobs.example.org/1</link>
    <dc:date>2025-03-01</dc:date>
  </item>
</rdf:RDF>"#;

    #[test]
    fn test_parse_rss2() {
        let feed = parse_feed(RSS2).unwrap();
        assert_eq!(feed.title.as_deref(), Some("Latest PhDs"));
        assert_eq!(feed.entries.len(), 2);

        let first = &feed.entries[0];
        assert_eq!(
            first.title.as_deref(),
            Some("Funded PhD Studentship in Machine Learning")
        );
        assert_eq!(first.link.as_deref(), Some("https://www.example.ac.uk/phd/1"));
        assert_eq!(
            first.summary.as_deref(),
            Some("A fully funded doctoral position.")
        );
        assert_eq!(
            first.published.as_deref(),
            Some("Mon, 06 Jan 2025 10:00:00 GMT")
        );

        let second = &feed.entries[1];
        assert_eq!(
            second.title.as_deref(),
            Some("Research Assistant & Graduate Fellowship")
        );
        assert_eq!(second.summary.as_deref(), Some("Computer vision & PyTorch"));
        assert_eq!(second.published, None);
    }

    #[test]
    fn test_parse_atom_prefers_alternate_link() {
        let feed = parse_feed(ATOM).unwrap();
        assert_eq!(feed.title.as_deref(), Some("Careers"));
        assert_eq!(feed.entries.len(), 2);

        let first = &feed.entries[0];
        assert_eq!(first.title.as_deref(), Some("Doctoral Researcher in NLP"));
        assert_eq!(
            first.link.as_deref(),
            Some("https://careers.example.edu/jobs/1")
        );
        assert_eq!(
            first.summary.as_deref(),
            Some("Natural language processing group.")
        );
        assert_eq!(first.published.as_deref(), Some("2025-02-01T09:00:00Z"));
    }

    #[test]
    fn test_parse_atom_inline_xhtml_content() {
        let feed = parse_feed(ATOM).unwrap();
        let second = &feed.entries[1];
        assert_eq!(second.summary.as_deref(), Some("Deep learning"));
        assert_eq!(
            second.link.as_deref(),
            Some("https://careers.example.edu/jobs/2")
        );
        // No <published>, so <updated> is used
        assert_eq!(second.published.as_deref(), Some("2025-02-05T09:00:00Z"));
    }

    #[test]
    fn test_parse_rdf() {
        let feed = parse_feed(RDF).unwrap();
        assert_eq!(feed.title.as_deref(), Some("Jobs"));
        assert_eq!(feed.entries.len(), 1);
        let entry = &feed.entries[0];
        assert_eq!(entry.title.as_deref(), Some("Graduate Scholarship"));
        assert_eq!(entry.link.as_deref(), Some("https://jobs.example.org/1"));
        assert_eq!(entry.published.as_deref(), Some("2025-03-01"));
        assert_eq!(entry.summary, None);
    }

    #[test]
    fn test_entry_without_fields() {
        let xml = "<rss><channel><item></item></channel></rss>";
        let feed = parse_feed(xml).unwrap();
        assert_eq!(feed.entries, vec![FeedEntry::default()]);
    }

    #[test]
    fn test_description_used_when_summary_missing() {
        let xml = r#"<rss><channel><item>
            <description>From description</description>
            <content:encoded xmlns:content="x">From content</content:encoded>
        </item></channel></rss>"#;
        let feed = parse_feed(xml).unwrap();
        assert_eq!(feed.entries[0].summary.as_deref(), Some("From description"));
    }

    #[test]
    fn test_plain_titles_keep_angle_brackets_and_entities() {
        let xml = r#"<rss><channel><item>
            <title>Bounds for x &lt; y and z &gt; w</title>
        </item><item>
            <title>AT&amp;amp;T   Fellowship</title>
        </item></channel></rss>"#;
        let feed = parse_feed(xml).unwrap();
        assert_eq!(
            feed.entries[0].title.as_deref(),
            Some("Bounds for x < y and z > w")
        );
        assert_eq!(feed.entries[1].title.as_deref(), Some("AT&amp;T Fellowship"));
    }

    #[test]
    fn test_html_typed_title_is_stripped() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"><entry>
            <title type="html">&lt;b&gt;Funded&lt;/b&gt; PhD &amp;amp; MSc</title>
        </entry><entry>
            <title type="text">x &lt;y&gt; z</title>
        </entry></feed>"#;
        let feed = parse_feed(xml).unwrap();
        assert_eq!(feed.entries[0].title.as_deref(), Some("Funded PhD & MSc"));
        assert_eq!(feed.entries[1].title.as_deref(), Some("x <y> z"));
    }

    #[test]
    fn test_markup_only_summary_falls_back() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"><entry>
            <title>Studentship</title>
            <summary type="html">&lt;img src="banner.png"/&gt;</summary>
            <content type="html">&lt;p&gt;Three year funded position.&lt;/p&gt;</content>
        </entry></feed>"#;
        let feed = parse_feed(xml).unwrap();
        assert_eq!(
            feed.entries[0].summary.as_deref(),
            Some("Three year funded position.")
        );
    }

    #[test]
    fn test_not_a_feed() {
        let html = "<html><body><p>Not a feed</p></body></html>";
        assert!(matches!(parse_feed(html), Err(FeedError::NotAFeed)));
        assert!(matches!(parse_feed(""), Err(FeedError::NotAFeed)));
    }

    #[test]
    fn test_malformed_xml() {
        let xml = "<rss><channel><item><title>Broken</item></channel></rss>";
        assert!(matches!(parse_feed(xml), Err(FeedError::Malformed(_))));
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(
            strip_html("<p>Hello&nbsp;<b>world</b></p>\n\n<br/>again"),
            "Hello world again"
        );
        assert_eq!(strip_html("Fish &amp; chips"), "Fish & chips");
        assert_eq!(strip_html("   "), "");
    }
}
