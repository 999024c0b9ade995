//! Mapping of one decoded `<review>` entry onto typed records.
//!
//! Every assumption about the feed's shape lives here. The rules per field:
//! - `isbn` / `isbn13` are kept only when they are purely numeric.
//! - integer fields must parse; anything else fails the entry.
//! - timestamps are absent when empty, otherwise must parse.
//! - descriptive strings default to empty when the element is missing.

use std::collections::BTreeSet;

use bookshelf_shared::{Author, Book, BookshelfError, Result, Review};
use chrono::{DateTime, FixedOffset};

use crate::page::RawEntry;
use crate::xml::XmlNode;

/// Timestamp layout used by the feed, e.g. `Wed Mar 13 14:06:08 -0700 2019`.
const FEED_DATE_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// The records produced from one feed entry.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEntry {
    /// Shelf names in feed order.
    pub shelf_names: Vec<String>,
    pub review: Review,
    pub book: Book,
}

/// Normalize one feed entry.
pub fn normalize_entry(entry: &RawEntry) -> Result<NormalizedEntry> {
    let node = entry.node();

    let shelf_names = shelf_names(node)?;
    let review = Review {
        review_id: required_text(node, "id")?,
        rating: integer(node, "rating")?,
        votes: integer(node, "votes")?,
        spoiler_flag: text_or_empty(node, "spoiler_flag"),
        spoilers_state: text_or_empty(node, "spoilers_state"),
        date_added: timestamp(node, "date_added")?,
        date_updated: timestamp(node, "date_updated")?,
        started_at: timestamp(node, "started_at")?,
        read_at: timestamp(node, "read_at")?,
        shelves: shelf_names.iter().cloned().collect::<BTreeSet<_>>(),
    };

    let book_node = required(node, "book")?;
    let book = normalize_book(book_node)?;

    Ok(NormalizedEntry {
        shelf_names,
        review,
        book,
    })
}

fn normalize_book(node: &XmlNode) -> Result<Book> {
    // `<id type="integer">` and `<text_reviews_count type="integer">` carry
    // attributes; only the element text is wanted.
    let book_id = required_text(node, "id")?;

    let authors = node
        .first("authors")
        .map(|authors| authors.all("author"))
        .unwrap_or_default()
        .iter()
        .map(normalize_author)
        .collect::<Result<Vec<_>>>()?;

    Ok(Book {
        book_id,
        isbn: numeric_isbn(node, "isbn"),
        isbn13: numeric_isbn(node, "isbn13"),
        text_reviews_count: integer(node, "text_reviews_count")?,
        uri: text_or_empty(node, "uri"),
        link: text_or_empty(node, "link"),
        title: text_or_empty(node, "title"),
        title_without_series: text_or_empty(node, "title_without_series"),
        image_url: text_or_empty(node, "image_url"),
        small_image_url: text_or_empty(node, "small_image_url"),
        large_image_url: text_or_empty(node, "large_image_url"),
        description: text_or_empty(node, "description"),
        authors,
    })
}

fn normalize_author(node: &XmlNode) -> Result<Author> {
    Ok(Author {
        id: trimmed(node, "id"),
        name: trimmed(node, "name"),
        link: trimmed(node, "link"),
        image_url: trimmed(node, "image_url"),
        small_image_url: trimmed(node, "small_image_url"),
        average_rating: decimal(node, "average_rating")?,
        ratings_count: integer(node, "ratings_count")?,
        text_reviews_count: integer(node, "text_reviews_count")?,
    })
}

fn shelf_names(node: &XmlNode) -> Result<Vec<String>> {
    let Some(shelves) = node.first("shelves") else {
        return Ok(Vec::new());
    };

    shelves
        .all("shelf")
        .iter()
        .map(|shelf| {
            shelf
                .attr("name")
                .map(String::from)
                .ok_or_else(|| BookshelfError::normalize("<shelf> has no `name` attribute"))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Field coercions
// ---------------------------------------------------------------------------

fn required<'a>(node: &'a XmlNode, name: &str) -> Result<&'a XmlNode> {
    node.first(name)
        .ok_or_else(|| BookshelfError::normalize(format!("missing <{name}>")))
}

fn required_text(node: &XmlNode, name: &str) -> Result<String> {
    let value = required(node, name)?.text().trim();
    if value.is_empty() {
        return Err(BookshelfError::normalize(format!("<{name}> is empty")));
    }
    Ok(value.to_string())
}

fn text_or_empty(node: &XmlNode, name: &str) -> String {
    node.child_text(name).unwrap_or_default().to_string()
}

fn trimmed(node: &XmlNode, name: &str) -> String {
    node.child_text(name).unwrap_or_default().trim().to_string()
}

fn integer(node: &XmlNode, name: &str) -> Result<i64> {
    let raw = required(node, name)?.text();
    raw.trim().parse().map_err(|_| {
        BookshelfError::normalize(format!("<{name}> value {raw:?} is not an integer"))
    })
}

fn decimal(node: &XmlNode, name: &str) -> Result<f64> {
    let raw = required(node, name)?.text();
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| BookshelfError::normalize(format!("<{name}> value {raw:?} is not a number")))
}

/// Keep an ISBN only when it is a non-empty run of ASCII digits.
fn numeric_isbn(node: &XmlNode, name: &str) -> Option<String> {
    let raw = node.child_text(name)?.trim();
    (!raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit())).then(|| raw.to_string())
}

fn timestamp(node: &XmlNode, name: &str) -> Result<Option<DateTime<FixedOffset>>> {
    let raw = node.child_text(name).unwrap_or_default().trim();
    if raw.is_empty() {
        return Ok(None);
    }
    parse_feed_date(raw)
        .map(Some)
        .ok_or_else(|| BookshelfError::date_parse(name, raw))
}

/// Parse a feed timestamp, accepting RFC 3339 and RFC 2822 as fallbacks.
pub fn parse_feed_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(raw, FEED_DATE_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .or_else(|_| DateTime::parse_from_rfc2822(raw))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::FeedPage;
    use crate::xml;
    use bookshelf_shared::ErrorKind;

    fn load_fixture(name: &str) -> String {
        let path = format!("../../../fixtures/xml/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }

    fn entry(review_xml: &str) -> RawEntry {
        RawEntry::new(xml::decode(review_xml).expect("decode entry").root)
    }

    /// A minimal valid entry with `book_extra` spliced into `<book>`.
    fn entry_with_book(review_extra: &str, book_extra: &str) -> RawEntry {
        entry(&format!(
            r#"<review>
                <id>900</id><rating>3</rating><votes>1</votes>
                {review_extra}
                <book>
                    <id type="integer">77</id>
                    <text_reviews_count type="integer">5</text_reviews_count>
                    {book_extra}
                </book>
            </review>"#
        ))
    }

    #[test]
    fn normalizes_fixture_entry() {
        let page = FeedPage::parse(&load_fixture("single-review.xml")).expect("parse fixture");
        let normalized = normalize_entry(&page.entries[0]).unwrap();

        let review = &normalized.review;
        assert_eq!(review.review_id, "2741083321");
        assert_eq!(review.rating, 5);
        assert_eq!(review.votes, 2);
        assert_eq!(review.spoiler_flag, "false");
        assert_eq!(review.spoilers_state, "none");
        assert_eq!(
            review.date_added.map(|d| d.to_rfc3339()),
            Some("2019-03-13T14:06:08-07:00".into())
        );
        assert_eq!(
            review.date_updated.map(|d| d.to_rfc3339()),
            Some("2019-04-02T09:15:00-07:00".into())
        );
        assert!(review.started_at.is_some());
        assert!(review.read_at.is_none());

        assert_eq!(normalized.shelf_names, vec!["read", "favorites", "sci-fi"]);
        assert!(review.shelves.contains("favorites"));

        let book = &normalized.book;
        assert_eq!(book.book_id, "18007564");
        assert_eq!(book.isbn, None);
        assert_eq!(book.isbn13.as_deref(), Some("9780553418026"));
        assert_eq!(book.text_reviews_count, 71224);
        assert_eq!(book.title, "The Martian");
        assert_eq!(book.description, "Six days ago, astronaut Mark Watney became one of the first people to walk on Mars.");

        assert_eq!(book.authors.len(), 1);
        let author = &book.authors[0];
        assert_eq!(author.id, "6540057");
        assert_eq!(author.name, "Andy Weir");
        assert_eq!(author.link, "https://www.goodreads.com/author/show/6540057.Andy_Weir");
        assert_eq!(author.image_url, "https://images.gr-assets.com/authors/1.jpg");
        assert_eq!(author.small_image_url, "");
        assert_eq!(author.average_rating, 4.4);
        assert_eq!(author.ratings_count, 1207395);
    }

    #[test]
    fn empty_date_added_is_absent() {
        let normalized = normalize_entry(&entry_with_book("<date_added></date_added>", "")).unwrap();
        assert_eq!(normalized.review.date_added, None);
    }

    #[test]
    fn unparseable_date_fails_with_date_error() {
        let err = normalize_entry(&entry_with_book("<read_at>last tuesday</read_at>", ""))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DateParse);
        assert!(err.to_string().contains("read_at"));
    }

    #[test]
    fn rfc3339_dates_are_accepted() {
        let normalized =
            normalize_entry(&entry_with_book("<read_at>2020-05-01T12:00:00Z</read_at>", ""))
                .unwrap();
        assert_eq!(
            normalized.review.read_at.map(|d| d.to_rfc3339()),
            Some("2020-05-01T12:00:00+00:00".into())
        );
    }

    #[test]
    fn non_numeric_isbn_is_discarded() {
        let normalized = normalize_entry(&entry_with_book(
            "",
            "<isbn>0-19-853453-1</isbn><isbn13>9780198534531</isbn13>",
        ))
        .unwrap();
        assert_eq!(normalized.book.isbn, None);
        assert_eq!(normalized.book.isbn13.as_deref(), Some("9780198534531"));
    }

    #[test]
    fn check_digit_x_and_nil_isbns_are_discarded() {
        let normalized = normalize_entry(&entry_with_book(
            "",
            r#"<isbn>019853453X</isbn><isbn13 nil="true"/>"#,
        ))
        .unwrap();
        assert_eq!(normalized.book.isbn, None);
        assert_eq!(normalized.book.isbn13, None);
    }

    #[test]
    fn author_fields_are_trimmed_and_default_empty() {
        let normalized = normalize_entry(&entry_with_book(
            "",
            r#"<authors><author>
                <id> 1 </id><name>A</name>
                <link>  http://x  </link>
                <image_url nocopyright="true">  http://x  </image_url>
                <average_rating>3.50</average_rating>
                <ratings_count>10</ratings_count>
                <text_reviews_count>2</text_reviews_count>
            </author></authors>"#,
        ))
        .unwrap();

        let author = &normalized.book.authors[0];
        assert_eq!(author.id, "1");
        assert_eq!(author.link, "http://x");
        assert_eq!(author.image_url, "http://x");
        assert_eq!(author.small_image_url, "");
        assert_eq!(author.average_rating, 3.5);
    }

    #[test]
    fn book_id_uses_text_not_attributes() {
        let normalized = normalize_entry(&entry_with_book("", "")).unwrap();
        assert_eq!(normalized.book.book_id, "77");
        assert_eq!(normalized.book.text_reviews_count, 5);
        assert!(normalized.book.authors.is_empty());
        assert!(normalized.shelf_names.is_empty());
    }

    #[test]
    fn non_numeric_rating_fails_entry() {
        let err = normalize_entry(&entry(
            r#"<review><id>1</id><rating>five</rating><votes>0</votes>
               <book><id>2</id><text_reviews_count>0</text_reviews_count></book></review>"#,
        ))
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Normalize);
        assert!(err.to_string().contains("five"));
    }

    #[test]
    fn missing_book_fails_entry() {
        let err = normalize_entry(&entry(
            "<review><id>1</id><rating>0</rating><votes>0</votes></review>",
        ))
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Normalize);
        assert!(err.to_string().contains("<book>"));
    }

    #[test]
    fn unnamed_shelf_fails_entry() {
        let err = normalize_entry(&entry_with_book(
            r#"<shelves><shelf name="read"/><shelf/></shelves>"#,
            "",
        ))
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Normalize);
    }

    #[test]
    fn feed_date_format() {
        let parsed = parse_feed_date("Tue Jan 01 10:20:30 -0800 2019").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2019-01-01T10:20:30-08:00");
        assert!(parse_feed_date("2019/01/01").is_none());
    }
}
