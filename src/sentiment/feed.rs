use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use reqwest::Client;

use super::types::RawHeadline;
use crate::constants::sentiment::DEFAULT_SOURCE;
use crate::error::SentimentError;

#[async_trait]
pub trait HeadlineSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self) -> Result<Vec<RawHeadline>, SentimentError>;
}

/// RSS 2.0 topic feed (`<item><title/><source/></item>`).
pub struct RssFeed {
    client: Client,
    url: String,
    max_items: usize,
}

impl RssFeed {
    pub fn new(client: Client, url: impl Into<String>, max_items: usize) -> Self {
        Self {
            client,
            url: url.into(),
            max_items,
        }
    }
}

#[async_trait]
impl HeadlineSource for RssFeed {
    fn name(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> Result<Vec<RawHeadline>, SentimentError> {
        let transport = |e: reqwest::Error| SentimentError::Transport {
            url: self.url.clone(),
            reason: e.to_string(),
        };

        let body = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?
            .text()
            .await
            .map_err(transport)?;

        parse_rss(&body, self.max_items).map_err(|reason| SentimentError::Feed {
            url: self.url.clone(),
            reason,
        })
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Source,
    Other,
}

/// First `max_items` items of an RSS document, in feed order.
pub fn parse_rss(xml: &str, max_items: usize) -> Result<Vec<RawHeadline>, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut in_item = false;
    let mut field = Field::Other;
    let mut title = String::new();
    let mut source = String::new();

    while items.len() < max_items {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"item" => {
                    in_item = true;
                    title.clear();
                    source.clear();
                }
                b"title" if in_item => field = Field::Title,
                b"source" if in_item => field = Field::Source,
                _ => field = Field::Other,
            },
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape_with(html_entity)
                    .map(|t| t.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&e).into_owned());
                push_text(field, &text, &mut title, &mut source);
            }
            Ok(Event::CData(e)) => {
                let raw = e.into_inner();
                push_text(field, &String::from_utf8_lossy(&raw), &mut title, &mut source);
            }
            Ok(Event::End(e)) => {
                if e.name().as_ref() == b"item" && in_item {
                    in_item = false;
                    if !title.trim().is_empty() {
                        items.push(RawHeadline {
                            title: title.trim().to_string(),
                            source: source_for(title.trim(), source.trim()),
                        });
                    }
                }
                field = Field::Other;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(format!(
                    "XML error at position {}: {}",
                    reader.buffer_position(),
                    e
                ))
            }
        }
    }

    Ok(items)
}

/// XML entities plus the HTML ones publishers leave in feed titles.
fn html_entity(name: &str) -> Option<&'static str> {
    match name {
        "amp" => Some("&"),
        "lt" => Some("<"),
        "gt" => Some(">"),
        "quot" => Some("\""),
        "apos" => Some("'"),
        "nbsp" => Some(" "),
        "ndash" => Some("-"),
        "mdash" => Some("-"),
        "rsquo" | "lsquo" => Some("'"),
        "rdquo" | "ldquo" => Some("\""),
        "hellip" => Some("..."),
        _ => None,
    }
}

fn push_text(field: Field, text: &str, title: &mut String, source: &mut String) {
    match field {
        Field::Title => title.push_str(text),
        Field::Source => source.push_str(text),
        Field::Other => {}
    }
}

/// `<source>` when given, else the "Headline - Publisher" suffix.
fn source_for(title: &str, source: &str) -> String {
    if !source.is_empty() {
        return source.to_string();
    }
    match title.rsplit_once(" - ") {
        Some((_, publisher)) if !publisher.trim().is_empty() => publisher.trim().to_string(),
        _ => DEFAULT_SOURCE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
        <rss version="2.0"><channel>
          <title>"gold price india" - Google News</title>
          <item>
            <title>Gold prices rise on festive buying - The Hindu</title>
            <source url="https://www.thehindu.com">The Hindu</source>
          </item>
          <item>
            <title><![CDATA[Gold slips as dollar firms - Mint]]></title>
          </item>
          <item>
            <title>Gold &amp; silver rates today</title>
          </item>
        </channel></rss>"#;

    #[test]
    fn test_parses_items_and_sources() {
        let items = parse_rss(FEED, 8).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].title, "Gold prices rise on festive buying - The Hindu");
        assert_eq!(items[0].source, "The Hindu");
        assert_eq!(items[1].title, "Gold slips as dollar firms - Mint");
        assert_eq!(items[1].source, "Mint");
        assert_eq!(items[2].title, "Gold & silver rates today");
        assert_eq!(items[2].source, DEFAULT_SOURCE);
    }

    #[test]
    fn test_channel_title_is_not_an_item() {
        let items = parse_rss(FEED, 8).unwrap();
        assert!(items.iter().all(|i| !i.title.contains("Google News")));
    }

    #[test]
    fn test_respects_item_cap() {
        assert_eq!(parse_rss(FEED, 2).unwrap().len(), 2);
    }

    #[test]
    fn test_malformed_feed_is_an_error() {
        assert!(parse_rss("<rss><channel><item><title>x</item></rss>", 8).is_err());
    }

    #[test]
    fn test_bad_entity_keeps_the_rest_of_the_feed() {
        let xml = r#"<rss><channel>
          <item><title>Gold steady ahead of policy meet - Mint</title></item>
          <item><title>Gold&nbsp;rates jump in Chennai</title></item>
          <item><title>Silver &bogus; demand cools</title></item>
        </channel></rss>"#;

        let items = parse_rss(xml, 8).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].title, "Gold steady ahead of policy meet - Mint");
        assert_eq!(items[1].title, "Gold rates jump in Chennai");
        assert_eq!(items[2].title, "Silver &bogus; demand cools");
    }
}
