//! Wire types for the backend "resolve link" endpoint.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Body POSTed to `{ADDRESS}/api/fs/link`.
#[derive(Debug, Serialize)]
pub struct LinkRequest<'a> {
    pub path: &'a str,
}

/// Backend reply. Only `code == 200` carries usable `data`.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendLinkResult {
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<LinkData>,
}

/// Where the file actually lives and which headers to send when fetching it.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkData {
    pub url: String,
    #[serde(default)]
    pub header: Option<BTreeMap<String, HeaderValues>>,
}

/// A header override is either one value or several.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum HeaderValues {
    One(String),
    Many(Vec<String>),
}

impl HeaderValues {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let values: &[String] = match self {
            HeaderValues::One(value) => std::slice::from_ref(value),
            HeaderValues::Many(values) => values,
        };
        values.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_link_with_mixed_header_shapes() {
        let result: BackendLinkResult = serde_json::from_str(
            r#"{"code":200,"message":"success","data":{"url":"https://cdn.example/f.jpg",
                "header":{"Referer":"https://a.example/","X-Token":["a","b"]}}}"#,
        )
        .unwrap();

        let data = result.data.unwrap();
        assert_eq!(data.url, "https://cdn.example/f.jpg");
        let header = data.header.unwrap();
        assert_eq!(header["Referer"].iter().collect::<Vec<_>>(), vec!["https://a.example/"]);
        assert_eq!(header["X-Token"].iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn error_result_without_data() {
        let result: BackendLinkResult =
            serde_json::from_str(r#"{"code":404,"message":"object not found","data":null}"#).unwrap();
        assert_eq!(result.code, 404);
        assert!(result.data.is_none());
    }

    #[test]
    fn null_header_map_is_absent() {
        let result: BackendLinkResult =
            serde_json::from_str(r#"{"code":200,"data":{"url":"https://x/","header":null}}"#).unwrap();
        assert!(result.data.unwrap().header.is_none());
    }
}
