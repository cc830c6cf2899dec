//! Feed model: conversion from parsed upstream feeds, filtering, and
//! re-serialization into the supported output formats.

use chrono::{DateTime, Utc};
use fql::{FieldValue, Predicate, Record};
use serde::Serialize;
use std::fmt;
use tracing::warn;

/// Output format of the re-emitted feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// RSS 2.0
    Rss,
    /// Atom 1.0
    Atom,
    /// JSON Feed
    Json,
}

impl OutputFormat {
    /// Resolves the `out` query parameter. Anything other than the three
    /// concrete formats (including the empty string and `keep`) means "keep
    /// the input format" and resolves to `None`.
    pub fn from_param(param: &str) -> Option<Self> {
        match param {
            "rss" => Some(OutputFormat::Rss),
            "atom" => Some(OutputFormat::Atom),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }

    /// Content type of the serialized feed.
    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Rss | OutputFormat::Atom => "application/xml",
            OutputFormat::Json => "application/json",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Rss => "rss",
            OutputFormat::Atom => "atom",
            OutputFormat::Json => "json",
        })
    }
}

/// A format-independent feed, ready for filtering and re-serialization.
#[derive(Debug, Clone)]
pub struct Feed {
    pub title: String,
    pub link: String,
    pub description: String,
    pub copyright: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    /// The format the upstream feed arrived in.
    pub native_format: OutputFormat,
    pub items: Vec<FeedItem>,
}

/// One feed entry, flattened into the fields the filter language can see.
#[derive(Debug, Clone)]
pub struct FeedItem {
    pub title: String,
    pub description: String,
    pub content: String,
    pub link: String,
    pub guid: String,
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub enclosure: Option<Enclosure>,
}

/// A media attachment carried through from the upstream item.
#[derive(Debug, Clone)]
pub struct Enclosure {
    pub url: String,
    pub mime_type: String,
    pub length: u64,
}

/// Field names exposed to filter expressions. Lookup is exact-case; absent
/// timestamps surface as missing keys.
impl Record for FeedItem {
    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "Title" => Some(FieldValue::from(self.title.as_str())),
            "Description" => Some(FieldValue::from(self.description.as_str())),
            "Content" => Some(FieldValue::from(self.content.as_str())),
            "Link" => Some(FieldValue::from(self.link.as_str())),
            "GUID" => Some(FieldValue::from(self.guid.as_str())),
            "Published" => self.published.map(FieldValue::from),
            "Updated" => self.updated.map(FieldValue::from),
            _ => None,
        }
    }
}

impl Feed {
    /// Flattens a feed parsed by `feed-rs` into the proxy's model.
    pub fn from_parsed(feed: feed_rs::model::Feed) -> Self {
        let native_format = match feed.feed_type {
            feed_rs::model::FeedType::Atom => OutputFormat::Atom,
            feed_rs::model::FeedType::JSON => OutputFormat::Json,
            _ => OutputFormat::Rss,
        };

        Self {
            title: feed.title.map(|t| t.content).unwrap_or_default(),
            link: feed
                .links
                .first()
                .map(|l| l.href.clone())
                .unwrap_or_default(),
            description: feed.description.map(|t| t.content).unwrap_or_default(),
            copyright: feed.rights.map(|t| t.content),
            published: feed.published,
            updated: feed.updated,
            native_format,
            items: feed.entries.into_iter().map(FeedItem::from_entry).collect(),
        }
    }

    /// Drops every item the predicate rejects. An item that fails evaluation
    /// (missing key, bad literal, ...) is logged and dropped, never fatal to
    /// the feed.
    pub fn retain_matching(mut self, predicate: &Predicate) -> Self {
        self.items.retain(|item| match predicate.check_struct(item) {
            Ok(keep) => keep,
            Err(e) => {
                warn!(error = %e, guid = %item.guid, "check item failed");
                false
            }
        });
        self
    }

    /// Serializes the feed. Only the JSON encoder can fail.
    pub fn render(&self, format: OutputFormat) -> Result<String, serde_json::Error> {
        match format {
            OutputFormat::Rss => Ok(self.to_rss()),
            OutputFormat::Atom => Ok(self.to_atom()),
            OutputFormat::Json => self.to_json_feed(),
        }
    }

    fn to_rss(&self) -> String {
        let items: Vec<rss::Item> = self
            .items
            .iter()
            .map(|item| {
                let mut out = rss::Item::default();
                out.set_title(item.title.clone());
                out.set_link(item.link.clone());
                out.set_description(item.description.clone());
                if !item.content.is_empty() {
                    out.set_content(item.content.clone());
                }
                let mut guid = rss::Guid::default();
                guid.set_value(item.guid.clone());
                guid.set_permalink(false);
                out.set_guid(guid);
                out.set_pub_date(item.published.map(|d| d.to_rfc2822()));
                if let Some(enclosure) = &item.enclosure {
                    let mut out_enclosure = rss::Enclosure::default();
                    out_enclosure.set_url(enclosure.url.clone());
                    out_enclosure.set_mime_type(enclosure.mime_type.clone());
                    out_enclosure.set_length(enclosure.length.to_string());
                    out.set_enclosure(out_enclosure);
                }
                out
            })
            .collect();

        let mut channel = rss::Channel::default();
        channel.set_title(self.title.clone());
        channel.set_link(self.link.clone());
        channel.set_description(self.description.clone());
        channel.set_copyright(self.copyright.clone());
        channel.set_pub_date(self.published.map(|d| d.to_rfc2822()));
        channel.set_last_build_date(self.updated.map(|d| d.to_rfc2822()));
        channel.set_items(items);
        channel.to_string()
    }

    fn to_atom(&self) -> String {
        use atom_syndication::{Content, Entry, Link, Text};

        // Atom requires an `updated` element on the feed and on every entry.
        let feed_updated = self.updated.or(self.published).unwrap_or_else(Utc::now);

        let entries: Vec<Entry> = self
            .items
            .iter()
            .map(|item| {
                let mut out = Entry::default();
                out.set_title(Text::plain(item.title.clone()));
                out.set_id(item.guid.clone());
                out.set_updated(
                    item.updated
                        .or(item.published)
                        .unwrap_or(feed_updated)
                        .fixed_offset(),
                );
                out.set_published(item.published.map(|d| d.fixed_offset()));
                if !item.description.is_empty() {
                    out.set_summary(Text::plain(item.description.clone()));
                }
                if !item.content.is_empty() {
                    let mut content = Content::default();
                    content.set_value(item.content.clone());
                    content.set_content_type("html".to_string());
                    out.set_content(content);
                }
                let mut link = Link::default();
                link.set_href(item.link.clone());
                out.set_links(vec![link]);
                out
            })
            .collect();

        let mut feed = atom_syndication::Feed::default();
        feed.set_title(Text::plain(self.title.clone()));
        feed.set_id(self.link.clone());
        feed.set_updated(feed_updated.fixed_offset());
        feed.set_rights(self.copyright.clone().map(Text::plain));
        let mut link = Link::default();
        link.set_href(self.link.clone());
        feed.set_links(vec![link]);
        feed.set_entries(entries);
        feed.to_string()
    }

    fn to_json_feed(&self) -> Result<String, serde_json::Error> {
        #[derive(Serialize)]
        struct JsonFeed<'a> {
            version: &'static str,
            title: &'a str,
            #[serde(skip_serializing_if = "str::is_empty")]
            home_page_url: &'a str,
            #[serde(skip_serializing_if = "str::is_empty")]
            description: &'a str,
            items: Vec<JsonItem<'a>>,
        }

        #[derive(Serialize)]
        struct JsonItem<'a> {
            id: &'a str,
            #[serde(skip_serializing_if = "str::is_empty")]
            url: &'a str,
            title: &'a str,
            #[serde(skip_serializing_if = "str::is_empty")]
            summary: &'a str,
            #[serde(skip_serializing_if = "str::is_empty")]
            content_html: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            date_published: Option<String>,
            #[serde(skip_serializing_if = "Option::is_none")]
            date_modified: Option<String>,
        }

        let feed = JsonFeed {
            version: "https://jsonfeed.org/version/1.1",
            title: &self.title,
            home_page_url: &self.link,
            description: &self.description,
            items: self
                .items
                .iter()
                .map(|item| JsonItem {
                    id: &item.guid,
                    url: &item.link,
                    title: &item.title,
                    summary: &item.description,
                    content_html: &item.content,
                    date_published: item.published.map(|d| d.to_rfc3339()),
                    date_modified: item.updated.map(|d| d.to_rfc3339()),
                })
                .collect(),
        };
        serde_json::to_string(&feed)
    }
}

impl FeedItem {
    fn from_entry(entry: feed_rs::model::Entry) -> Self {
        let enclosure = entry
            .media
            .first()
            .and_then(|media| media.content.first())
            .map(|content| Enclosure {
                url: content
                    .url
                    .as_ref()
                    .map(|u| u.to_string())
                    .unwrap_or_default(),
                mime_type: content
                    .content_type
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_default(),
                length: content.size.unwrap_or(0),
            });

        Self {
            title: entry.title.map(|t| t.content).unwrap_or_default(),
            description: entry.summary.map(|t| t.content).unwrap_or_default(),
            content: entry.content.and_then(|c| c.body).unwrap_or_default(),
            link: entry
                .links
                .first()
                .map(|l| l.href.clone())
                .unwrap_or_default(),
            guid: entry.id,
            published: entry.published,
            updated: entry.updated,
            enclosure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(title: &str, guid: &str) -> FeedItem {
        FeedItem {
            title: title.to_string(),
            description: format!("about {title}"),
            content: String::new(),
            link: format!("https://example.com/{guid}"),
            guid: guid.to_string(),
            published: Some(Utc.with_ymd_and_hms(2023, 6, 15, 12, 0, 0).unwrap()),
            updated: None,
            enclosure: None,
        }
    }

    fn feed(items: Vec<FeedItem>) -> Feed {
        Feed {
            title: "Example".to_string(),
            link: "https://example.com/".to_string(),
            description: "An example feed".to_string(),
            copyright: None,
            published: Some(Utc.with_ymd_and_hms(2023, 6, 15, 12, 0, 0).unwrap()),
            updated: Some(Utc.with_ymd_and_hms(2023, 6, 16, 12, 0, 0).unwrap()),
            native_format: OutputFormat::Rss,
            items,
        }
    }

    #[test]
    fn test_output_format_from_param() {
        assert_eq!(OutputFormat::from_param("rss"), Some(OutputFormat::Rss));
        assert_eq!(OutputFormat::from_param("atom"), Some(OutputFormat::Atom));
        assert_eq!(OutputFormat::from_param("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_param("keep"), None);
        assert_eq!(OutputFormat::from_param(""), None);
        assert_eq!(OutputFormat::from_param("xml"), None);
    }

    #[test]
    fn test_record_fields() {
        let it = item("Hello", "id-1");

        assert_eq!(it.field("Title"), Some(FieldValue::from("Hello")));
        assert_eq!(it.field("GUID"), Some(FieldValue::from("id-1")));
        assert!(matches!(
            it.field("Published"),
            Some(FieldValue::Timestamp(_))
        ));
        assert_eq!(it.field("Updated"), None);
        assert_eq!(it.field("Nope"), None);
    }

    #[test]
    fn test_retain_matching_drops_failing_items() {
        let predicate = fql::parse(r#"Title ~! "^Ad:""#).unwrap();
        let feed = feed(vec![item("Ad: spam", "a"), item("News", "b")]);

        let filtered = feed.retain_matching(&predicate);
        assert_eq!(filtered.items.len(), 1);
        assert_eq!(filtered.items[0].guid, "b");
    }

    #[test]
    fn test_retain_matching_drops_erroring_items() {
        // `Updated` is absent on these items, so evaluation errors; the items
        // are treated as non-matching.
        let predicate = fql::parse("Updated > '2020-01-01T00:00:00Z'").unwrap();
        let feed = feed(vec![item("a", "a"), item("b", "b")]);

        let filtered = feed.retain_matching(&predicate);
        assert!(filtered.items.is_empty());
    }

    #[test]
    fn test_render_rss() {
        let body = feed(vec![item("Hello", "id-1")])
            .render(OutputFormat::Rss)
            .unwrap();

        assert!(body.contains("<rss"));
        assert!(body.contains("<title>Hello</title>"));
        assert!(body.contains("id-1"));
    }

    #[test]
    fn test_render_atom() {
        let body = feed(vec![item("Hello", "id-1")])
            .render(OutputFormat::Atom)
            .unwrap();

        assert!(body.contains("<feed"));
        assert!(body.contains("Hello"));
    }

    #[test]
    fn test_render_json_feed() {
        let body = feed(vec![item("Hello", "id-1")])
            .render(OutputFormat::Json)
            .unwrap();

        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["version"], "https://jsonfeed.org/version/1.1");
        assert_eq!(value["items"][0]["title"], "Hello");
        assert_eq!(value["items"][0]["id"], "id-1");
    }

    #[test]
    fn test_from_parsed_rss() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
            <rss version="2.0"><channel>
            <title>T</title>
            <link>https://example.com/</link>
            <description>D</description>
            <item>
              <title>First</title>
              <link>https://example.com/1</link>
              <guid>one</guid>
              <description>first item</description>
              <pubDate>Thu, 15 Jun 2023 12:00:00 GMT</pubDate>
            </item>
            </channel></rss>"#;

        let parsed = feed_rs::parser::parse(xml.as_bytes()).unwrap();
        let feed = Feed::from_parsed(parsed);

        assert_eq!(feed.native_format, OutputFormat::Rss);
        assert_eq!(feed.title, "T");
        assert_eq!(feed.items.len(), 1);
        assert_eq!(feed.items[0].title, "First");
        assert_eq!(feed.items[0].guid, "one");
        assert!(feed.items[0].published.is_some());
    }
}
