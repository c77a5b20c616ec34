//! Event record translation.
//!
//! libchadwick writes one event as a single line of comma-separated values,
//! with text fields wrapped in double quotes, in the order of the enabled
//! headers. Values are split on every comma and stripped of every quote;
//! the library never emits a comma inside a value.

use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

/// The text up to the first NUL, decoded lossily.
fn record_text(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Split a raw event line into its values.
pub fn split_record(bytes: &[u8]) -> Vec<String> {
    record_text(bytes)
        .split(',')
        .map(|item| item.replace('"', ""))
        .collect()
}

/// One event as an ordered header → value mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventRecord {
    entries: Vec<(String, String)>,
}

impl EventRecord {
    /// Pair `headers` with the values of `bytes`.
    ///
    /// Pairing stops at the shorter of the two lists.
    pub fn from_bytes<S: AsRef<str>>(bytes: &[u8], headers: &[S]) -> Self {
        let entries = headers
            .iter()
            .zip(split_record(bytes))
            .map(|(h, v)| (h.as_ref().to_string(), v))
            .collect();
        Self { entries }
    }

    pub fn from_pairs<K: Into<String>, V: Into<String>>(
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Value for `header`; the first occurrence wins.
    pub fn get(&self, header: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, header: &str) -> bool {
        self.get(header).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(h, v)| (h.as_str(), v.as_str()))
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(h, _)| h.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, v)| v.as_str())
    }
}

impl Serialize for EventRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (h, v) in &self.entries {
            map.serialize_entry(h, v)?;
        }
        map.end()
    }
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (h, v)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}={}", h, v)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &[u8] = b"\"ANA201804020\",\"CLE\",1,0,0,0,0,\"CBFX\",0,0,\"lindf001\",\"S8/G\"";

    #[test]
    fn test_split_strips_quotes() {
        let values = split_record(LINE);
        assert_eq!(values.len(), 12);
        assert_eq!(values[0], "ANA201804020");
        assert_eq!(values[2], "1");
        assert_eq!(values[11], "S8/G");
    }

    #[test]
    fn test_split_stops_at_nul() {
        let mut buf = b"\"A\",2".to_vec();
        buf.extend_from_slice(&[0, b'x', b',', b'y']);
        assert_eq!(split_record(&buf), vec!["A", "2"]);
    }

    #[test]
    fn test_split_keeps_empty_values() {
        assert_eq!(split_record(b"1,,\"\",3"), vec!["1", "", "", "3"]);
        assert_eq!(split_record(b""), vec![""]);
    }

    #[test]
    fn test_from_bytes_zips_headers() {
        let rec = EventRecord::from_bytes(b"\"ANA201804020\",1,\"S8/G\"", &["GAME_ID", "INN_CT", "EVENT_TX"]);
        assert_eq!(rec.get("GAME_ID"), Some("ANA201804020"));
        assert_eq!(rec.get("INN_CT"), Some("1"));
        assert_eq!(rec.get("OUTS_CT"), None);
        assert_eq!(rec.headers().collect::<Vec<_>>(), ["GAME_ID", "INN_CT", "EVENT_TX"]);
    }

    #[test]
    fn test_from_bytes_truncates_to_shorter_side() {
        let rec = EventRecord::from_bytes(b"a,b,c", &["X", "Y"]);
        assert_eq!(rec.len(), 2);

        let rec = EventRecord::from_bytes(b"a", &["X", "Y"]);
        assert_eq!(rec.len(), 1);
        assert!(!rec.contains("Y"));
    }

    #[test]
    fn test_serializes_in_header_order() {
        let rec = EventRecord::from_pairs([("Z", "1"), ("A", "2")]);
        let json = serde_json::to_string(&rec).unwrap();
        assert_eq!(json, r#"{"Z":"1","A":"2"}"#);
        assert_eq!(rec.to_string(), "Z=1 A=2");
    }
}
