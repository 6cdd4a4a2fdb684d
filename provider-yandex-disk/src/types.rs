//! Yandex Disk API response types
//!
//! Data structures for deserializing Yandex Disk REST API v1 responses.

use serde::{Deserialize, Serialize};

/// Yandex Disk resource (file or folder)
///
/// See: https://yandex.com/dev/disk-api/doc/en/reference/meta
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    /// Resource name
    pub name: String,

    /// Full path, prefixed with `disk:`
    pub path: String,

    /// `file` or `dir`
    #[serde(rename = "type")]
    pub resource_type: String,

    /// File size in bytes (omitted for folders)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    /// Modification time (ISO 8601)
    #[serde(default)]
    pub modified: String,

    /// MD5 checksum (for files)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5: Option<String>,

    /// Children, present when the resource is a folder
    #[serde(rename = "_embedded", default, skip_serializing_if = "Option::is_none")]
    pub embedded: Option<ResourceList>,
}

impl Resource {
    pub fn is_dir(&self) -> bool {
        self.resource_type == "dir"
    }
}

/// One page of a folder's children
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceList {
    #[serde(default)]
    pub items: Vec<Resource>,

    #[serde(default)]
    pub limit: Option<u32>,

    #[serde(default)]
    pub offset: Option<u32>,

    #[serde(default)]
    pub total: Option<u64>,
}

/// Response of `GET /resources/download`
///
/// See: https://yandex.com/dev/disk-api/doc/en/reference/content
#[derive(Debug, Clone, Deserialize)]
pub struct Link {
    pub href: String,

    #[serde(default)]
    pub method: Option<String>,

    #[serde(default)]
    pub templated: bool,
}

/// Error body returned with non-2xx answers
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub message: String,
}

impl ApiErrorBody {
    pub fn summary(&self) -> String {
        let text = if self.message.is_empty() {
            &self.description
        } else {
            &self.message
        };
        if self.error.is_empty() {
            text.clone()
        } else {
            format!("{}: {}", self.error, text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_folder_with_items() {
        let json = r#"{
            "name": "A",
            "path": "disk:/A",
            "type": "dir",
            "modified": "2024-01-01T00:00:00+00:00",
            "_embedded": {
                "items": [
                    {
                        "name": "doc.docx",
                        "path": "disk:/A/doc.docx",
                        "type": "file",
                        "size": 500,
                        "modified": "2024-02-01T10:00:00+00:00",
                        "md5": "d41d8cd98f00b204e9800998ecf8427e"
                    },
                    {
                        "name": "B",
                        "path": "disk:/A/B",
                        "type": "dir",
                        "modified": "2024-01-05T00:00:00+00:00"
                    }
                ],
                "limit": 1000,
                "offset": 0,
                "total": 2
            }
        }"#;

        let resource: Resource = serde_json::from_str(json).unwrap();
        assert!(resource.is_dir());

        let items = resource.embedded.unwrap().items;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].size, Some(500));
        assert!(!items[0].is_dir());
        assert!(items[1].is_dir());
        assert_eq!(items[1].size, None);
    }

    #[test]
    fn test_error_body_summary() {
        let body: ApiErrorBody = serde_json::from_str(
            r#"{"error":"DiskNotFoundError","description":"Resource not found.","message":"Не удается найти запрошенный ресурс."}"#,
        )
        .unwrap();
        assert!(body.summary().starts_with("DiskNotFoundError: "));
    }
}
