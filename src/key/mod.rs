//! Bookmark keys and range construction.
//!
//! A bookmark id is a fixed-point decimal: the integer digits form a
//! source-specific page key and the three fractional digits index a
//! paragraph (`.001` is paragraph 0, `.051` is paragraph 50). The first two
//! digits of the page key always name the source, and each source fixes the
//! total page-key width. For WOM the layout is `ssbuuIqq.ppp` — source,
//! book, unit, question indicator, question, paragraph.
//!
//! Partial page keys bound range scans: widening a fragment with zeros
//! gives the lowest id sharing that prefix, widening with nines the
//! highest. Everything here is pure; malformed input degrades to the empty
//! range rather than an error.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::BookmarkError;

/// A transcript source, identified by the leading two digits of every
/// bookmark id it owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Wom,
    Jsb,
    Acim,
    Raj,
    Acol,
    Www,
}

impl Source {
    pub const ALL: [Source; 6] = [
        Source::Wom,
        Source::Jsb,
        Source::Acim,
        Source::Raj,
        Source::Acol,
        Source::Www,
    ];

    /// Resolve a 2-digit source identifier.
    pub fn from_prefix(prefix: &str) -> Option<Source> {
        match prefix {
            "10" => Some(Source::Wom),
            "11" => Some(Source::Jsb),
            "12" => Some(Source::Acim),
            "13" => Some(Source::Raj),
            "14" => Some(Source::Acol),
            "15" => Some(Source::Www),
            _ => None,
        }
    }

    /// Resolve the source named by the first two characters of a key or
    /// key fragment.
    pub fn from_key(key: &str) -> Option<Source> {
        key.get(..2).and_then(Source::from_prefix)
    }

    /// The 2-digit identifier this source's page keys start with.
    pub fn prefix(&self) -> &'static str {
        match self {
            Source::Wom => "10",
            Source::Jsb => "11",
            Source::Acim => "12",
            Source::Raj => "13",
            Source::Acol => "14",
            Source::Www => "15",
        }
    }

    /// Full page-key width in digits, paragraph fraction excluded.
    pub fn key_width(&self) -> usize {
        match self {
            Source::Wom | Source::Jsb => 8,
            Source::Acim => 6,
            Source::Raj | Source::Acol | Source::Www => 7,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Source::Wom => "WOM",
            Source::Jsb => "JSB",
            Source::Acim => "ACIM",
            Source::Raj => "RAJ",
            Source::Acol => "ACOL",
            Source::Www => "WWW",
        };
        write!(f, "{}", name)
    }
}

/// Canonical bookmark id: page key plus 3-digit paragraph index, stored as
/// a count of thousandths so comparison and range math stay exact.
///
/// Normalized once at the boundary from string or floating wire forms;
/// internal logic never sees the wire representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BookmarkId(u64);

impl BookmarkId {
    /// Page key: the integer digits of the id.
    pub fn page_key(&self) -> u64 {
        self.0 / 1000
    }

    /// Paragraph index in `[0, 999]`.
    pub fn paragraph(&self) -> u16 {
        (self.0 % 1000) as u16
    }

    /// The leading two digits of the page key, as used for shard routing.
    pub fn source_prefix(&self) -> String {
        let mut page = self.page_key();
        while page >= 100 {
            page /= 10;
        }
        format!("{:02}", page)
    }

    /// The source this id belongs to, if the prefix is recognized.
    pub fn source(&self) -> Option<Source> {
        Source::from_prefix(&self.source_prefix())
    }

    /// Normalize a floating wire value. The value must carry at least the
    /// 2-digit source prefix and fit the fixed-point representation.
    pub fn from_f64(value: f64) -> Result<Self, BookmarkError> {
        if !value.is_finite() || !(10.0..1.0e12).contains(&value) {
            return Err(BookmarkError::InvalidKey(value.to_string()));
        }
        Ok(BookmarkId((value * 1000.0).round() as u64))
    }

    pub(crate) const fn from_thousandths(thousandths: u64) -> Self {
        BookmarkId(thousandths)
    }
}

impl FromStr for BookmarkId {
    type Err = BookmarkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || BookmarkError::InvalidKey(s.to_string());

        let (page, paragraph) = match s.split_once('.') {
            Some((page, paragraph)) => (page, paragraph),
            None => (s, ""),
        };

        // The page key needs at least the 2-digit source prefix, and a
        // leading zero would make the prefix ambiguous.
        if page.len() < 2 || page.starts_with('0') || !page.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if paragraph.len() > 3 || !paragraph.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let page: u64 = page.parse().map_err(|_| invalid())?;
        let mut frac: u64 = if paragraph.is_empty() {
            0
        } else {
            paragraph.parse().map_err(|_| invalid())?
        };
        // A short fraction is a truncated decimal: ".1" means ".100".
        for _ in paragraph.len()..3 {
            frac *= 10;
        }

        page.checked_mul(1000)
            .and_then(|v| v.checked_add(frac))
            .map(BookmarkId)
            .ok_or_else(invalid)
    }
}

impl fmt::Display for BookmarkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:03}", self.page_key(), self.paragraph())
    }
}

impl Serialize for BookmarkId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(self.0 as f64 / 1000.0)
    }
}

impl<'de> Deserialize<'de> for BookmarkId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct IdVisitor;

        impl Visitor<'_> for IdVisitor {
            type Value = BookmarkId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a fixed-point bookmark id as a number or string")
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                BookmarkId::from_f64(v).map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                BookmarkId::from_f64(v as f64).map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                BookmarkId::from_f64(v as f64).map_err(E::custom)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

/// Inclusive sort-key range over the bookmark id dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRange {
    pub start: BookmarkId,
    pub end: BookmarkId,
}

impl KeyRange {
    /// The degenerate `{0,0}` range: matches nothing.
    pub const EMPTY: KeyRange = KeyRange {
        start: BookmarkId(0),
        end: BookmarkId(0),
    };

    pub fn is_empty(&self) -> bool {
        *self == KeyRange::EMPTY
    }

    pub fn contains(&self, id: BookmarkId) -> bool {
        self.start <= id && id <= self.end
    }
}

/// Build the id range covered by a full or partial page key.
///
/// The fragment must start with a 2-digit source identifier. A range scan
/// bounded by the result returns exactly the ids whose page key begins with
/// the fragment's digits, at any paragraph value. Unrecognized sources,
/// fragments longer than the source's key width, and non-digit input all
/// yield [`KeyRange::EMPTY`] — a safe empty result, never an error.
pub fn key_range(fragment: &str) -> KeyRange {
    let source = match Source::from_key(fragment) {
        Some(source) => source,
        None => return KeyRange::EMPTY,
    };
    let width = source.key_width();
    if fragment.len() > width || !fragment.bytes().all(|b| b.is_ascii_digit()) {
        return KeyRange::EMPTY;
    }

    let base: u64 = match fragment.parse() {
        Ok(base) => base,
        Err(_) => return KeyRange::EMPTY,
    };

    // Widen to the full key width: zeros give the lowest page key with
    // this prefix, nines the highest.
    let magnitude = 10u64.pow((width - fragment.len()) as u32);
    let low = base * magnitude;
    let high = low + (magnitude - 1);

    KeyRange {
        start: BookmarkId(low * 1000),
        end: BookmarkId(high * 1000 + 999),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> BookmarkId {
        s.parse().unwrap()
    }

    #[test]
    fn parse_and_display_round_trip() {
        assert_eq!(id("1300100.001").to_string(), "1300100.001");
        assert_eq!(id("10102015.051").to_string(), "10102015.051");
        assert_eq!(id("1300100.999").to_string(), "1300100.999");
    }

    #[test]
    fn parse_pads_short_fractions() {
        assert_eq!(id("1300100.1"), id("1300100.100"));
        assert_eq!(id("1300100"), id("1300100.000"));
        assert_eq!(id("1300100.").to_string(), "1300100.000");
    }

    #[test]
    fn parse_rejects_malformed_keys() {
        for bad in ["", "5", "5.000", "abc", "13x0100.001", "1300100.0001", "013.000", "1300100.-1"] {
            assert!(bad.parse::<BookmarkId>().is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn from_f64_matches_parse() {
        assert_eq!(BookmarkId::from_f64(1300100.001).unwrap(), id("1300100.001"));
        assert_eq!(BookmarkId::from_f64(10000000.0).unwrap(), id("10000000.000"));
        assert!(BookmarkId::from_f64(5.0).is_err());
        assert!(BookmarkId::from_f64(f64::NAN).is_err());
        assert!(BookmarkId::from_f64(-1.0).is_err());
    }

    #[test]
    fn ids_order_numerically() {
        let mut ids = vec![id("1300100.999"), id("1300100.001"), id("1300101.000")];
        ids.sort();
        assert_eq!(
            ids,
            vec![id("1300100.001"), id("1300100.999"), id("1300101.000")]
        );
    }

    #[test]
    fn source_prefix_is_leading_digit_pair() {
        assert_eq!(id("1300100.001").source_prefix(), "13");
        assert_eq!(id("10102015.051").source_prefix(), "10");
        assert_eq!(id("1300100.001").source(), Some(Source::Raj));
        assert_eq!(id("9900100.001").source(), None);
    }

    #[test]
    fn serde_accepts_numbers_and_strings() {
        let from_number: BookmarkId = serde_json::from_str("1300100.001").unwrap();
        let from_string: BookmarkId = serde_json::from_str("\"1300100.001\"").unwrap();
        assert_eq!(from_number, from_string);
        assert_eq!(serde_json::to_string(&from_number).unwrap(), "1300100.001");
    }

    #[test]
    fn range_for_bare_source_covers_the_source() {
        let range = key_range("10");
        assert_eq!(range.start, id("10000000.000"));
        assert_eq!(range.end, id("10999999.999"));
        assert!(range.contains(id("10102015.051")));
        assert!(!range.contains(id("1300100.001")));
    }

    #[test]
    fn range_for_full_width_fragment_spans_one_page() {
        let range = key_range("1300100");
        assert_eq!(range.start, id("1300100.000"));
        assert_eq!(range.end, id("1300100.999"));
        assert!(range.contains(id("1300100.001")));
        assert!(range.contains(id("1300100.999")));
        assert!(!range.contains(id("1300101.000")));
        assert!(!range.contains(id("1300099.999")));
    }

    #[test]
    fn prefix_containment_holds_for_every_source() {
        for source in Source::ALL {
            let range = key_range(source.prefix());
            assert!(range.start <= range.end);
            // Lowest and highest full keys under this source.
            let width = source.key_width() as u32;
            let low: u64 = source.prefix().parse::<u64>().unwrap() * 10u64.pow(width - 2);
            let high = low + 10u64.pow(width - 2) - 1;
            assert!(range.contains(BookmarkId::from_thousandths(low * 1000)));
            assert!(range.contains(BookmarkId::from_thousandths(high * 1000 + 999)));
        }
    }

    #[test]
    fn overlong_fragment_is_empty() {
        assert!(key_range("100000000").is_empty()); // WOM width is 8
        assert!(key_range("13001001").is_empty()); // RAJ width is 7
    }

    #[test]
    fn unrecognized_source_is_empty() {
        assert!(key_range("99").is_empty());
        assert!(key_range("9").is_empty());
        assert!(key_range("").is_empty());
    }

    #[test]
    fn non_digit_fragment_is_empty() {
        assert!(key_range("10a5").is_empty());
        assert!(key_range("10.5").is_empty());
    }
}
