//! Bracketed query-string parameters
//!
//! Clients send filters the way `qs` encodes nested objects:
//! `filters[action][$in]=create&filters[action][$in]=update`, or with explicit
//! indices, `filters[action][$in][0]=create`. [`QueryParams`] keeps every
//! decoded pair in order and answers lookups by key.

use url::form_urlencoded;

/// Decoded query-string pairs in their original order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn parse(query: Option<&str>) -> Self {
        let pairs = query
            .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();
        Self { pairs }
    }

    /// First value for `key`, ignoring empty values
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, v)| k == key && !v.is_empty())
            .map(|(_, v)| v.as_str())
    }

    /// Every non-empty value for `key` or for indexed `key[N]`
    pub fn get_all(&self, key: &str) -> Vec<String> {
        self.pairs
            .iter()
            .filter(|(k, v)| !v.is_empty() && (k == key || is_indexed(k, key)))
            .map(|(_, v)| v.clone())
            .collect()
    }
}

fn is_indexed(candidate: &str, key: &str) -> bool {
    candidate
        .strip_prefix(key)
        .and_then(|rest| rest.strip_prefix('['))
        .and_then(|rest| rest.strip_suffix(']'))
        .is_some_and(|index| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_brackets() {
        let params = QueryParams::parse(Some(
            "filters%5BuserId%5D=3&sort=timestamp%3Aasc&filters[dateFrom]=",
        ));
        assert_eq!(params.get("filters[userId]"), Some("3"));
        assert_eq!(params.get("sort"), Some("timestamp:asc"));
        assert_eq!(params.get("filters[dateFrom]"), None);
        assert_eq!(params.get("missing"), None);
    }

    #[test]
    fn test_repeated_and_indexed_values() {
        let params = QueryParams::parse(Some(
            "filters[action][$in]=create&filters[action][$in][1]=delete&filters[action][$in][x]=bad",
        ));
        assert_eq!(
            params.get_all("filters[action][$in]"),
            vec!["create".to_string(), "delete".to_string()]
        );
        assert!(QueryParams::parse(None).get_all("filters[action][$in]").is_empty());
    }
}
