//! Project metadata as stored in the registry document.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Format of the human-readable `date` field.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One hosted project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    /// Stable project identifier
    pub id: String,

    /// Display name
    pub name: String,

    /// Directory name of the extracted tree under the managed root
    pub path: String,

    /// Free-form description
    #[serde(default)]
    pub desc: String,

    /// Last write time, local time formatted with [`DATE_FORMAT`]
    #[serde(default)]
    pub date: String,

    /// Last write time in seconds since the Unix epoch, used for ordering
    #[serde(default)]
    pub timestamp: i64,
}

impl ProjectRecord {
    /// Creates an unstamped record; the registry fills in `date` and
    /// `timestamp` when it is stored.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        path: impl Into<String>,
        desc: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            path: path.into(),
            desc: desc.into(),
            date: String::new(),
            timestamp: 0,
        }
    }

    pub(crate) fn stamp(&mut self, now: DateTime<Local>) {
        self.date = now.format(DATE_FORMAT).to_string();
        self.timestamp = now.timestamp();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_stamp_sets_both_times() {
        let mut record = ProjectRecord::new("Ab3dE9xZ", "Checkout flow", "Ab3dE9xZ", "");
        let now = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();

        record.stamp(now);

        assert_eq!(record.date, "2024-03-09 14:05:07");
        assert_eq!(record.timestamp, now.timestamp());
    }

    #[test]
    fn test_document_field_names() {
        let mut record = ProjectRecord::new("id1", "Name", "path1", "about");
        record.timestamp = 42;
        record.date = "2024-01-01 00:00:00".to_string();

        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(
            value,
            serde_json::json!({
                "id": "id1",
                "name": "Name",
                "path": "path1",
                "desc": "about",
                "date": "2024-01-01 00:00:00",
                "timestamp": 42
            })
        );
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let record: ProjectRecord =
            serde_json::from_str(r#"{"id":"a","name":"A","path":"a"}"#).unwrap();

        assert_eq!(record.desc, "");
        assert_eq!(record.timestamp, 0);
    }
}
