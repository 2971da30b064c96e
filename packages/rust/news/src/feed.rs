//! RSS feed parsing.

use insightmatch_shared::{InsightMatchError, Result};
use quick_xml::Reader;
use quick_xml::events::Event;

/// One `<item>` of an RSS channel, with whitespace trimmed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub pub_date: String,
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Title,
    Link,
    Description,
    PubDate,
}

impl FeedItem {
    fn push(&mut self, field: Field, text: &str) {
        let slot = match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::Description => &mut self.description,
            Field::PubDate => &mut self.pub_date,
        };
        slot.push_str(text);
    }

    fn finish(mut self) -> Option<Self> {
        for slot in [
            &mut self.title,
            &mut self.link,
            &mut self.description,
            &mut self.pub_date,
        ] {
            *slot = slot.trim().to_string();
        }
        (!self.title.is_empty() && !self.link.is_empty()).then_some(self)
    }
}

/// Parse the `<item>` elements of an RSS document, in document order.
///
/// Items without a title or link are dropped. Channel-level elements are
/// ignored.
pub fn parse_feed(xml: &[u8]) -> Result<Vec<FeedItem>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut current: Option<FeedItem> = None;
    let mut field: Option<Field> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"item" => current = Some(FeedItem::default()),
                b"title" => field = Some(Field::Title),
                b"link" => field = Some(Field::Link),
                b"description" => field = Some(Field::Description),
                b"pubDate" => field = Some(Field::PubDate),
                _ => field = None,
            },
            Ok(Event::Text(text)) => {
                if let (Some(item), Some(field)) = (current.as_mut(), field) {
                    let text = text
                        .unescape()
                        .map_err(|e| InsightMatchError::decode(format!("RSS feed: {e}")))?;
                    item.push(field, &text);
                }
            }
            Ok(Event::CData(data)) => {
                if let (Some(item), Some(field)) = (current.as_mut(), field) {
                    item.push(field, &String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"item" {
                    if let Some(item) = current.take().and_then(FeedItem::finish) {
                        items.push(item);
                    }
                }
                field = None;
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(InsightMatchError::decode(format!(
                    "RSS feed at byte {}: {e}",
                    reader.buffer_position()
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fixture_feed() {
        let xml = std::fs::read_to_string("../../../fixtures/rss/news-search.xml")
            .expect("fixture should exist");
        let items = parse_feed(xml.as_bytes()).expect("parse");

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].title, "알파테크, 신규 투자 유치 - 경제일보");
        assert_eq!(items[0].link, "https://news.example.com/articles/1001");
        assert_eq!(items[0].pub_date, "Mon, 15 Jan 2024 09:00:00 GMT");
        assert!(items[0].description.contains("<a href"));
        assert_eq!(items[1].title, "알파테크 & 파트너스 협약");
        // the link-less item is dropped
        assert_eq!(items[2].link, "https://news.example.com/articles/1003");
    }

    #[test]
    fn items_without_title_or_link_are_skipped() {
        let xml = br#"<rss><channel><title>feed</title>
            <item><title>only title</title></item>
            <item><link>https://x.test/only-link</link></item>
            <item><title> ok </title><link> https://x.test/ok </link></item>
        </channel></rss>"#;
        let items = parse_feed(xml).expect("parse");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "ok");
        assert_eq!(items[0].link, "https://x.test/ok");
        assert_eq!(items[0].description, "");
    }

    #[test]
    fn channel_title_is_not_an_item() {
        let xml =
            br#"<rss><channel><title>feed</title><link>https://x.test</link></channel></rss>"#;
        assert!(parse_feed(xml).expect("parse").is_empty());
    }

    #[test]
    fn malformed_feed_is_decode_error() {
        let err = parse_feed(b"<rss><channel><item><title>x</link></item>").unwrap_err();
        assert!(matches!(err, InsightMatchError::Decode { .. }));
    }
}
