use serde::{Deserialize, Serialize};

/// S3-style bucket notification. Only `Records[0]` is ever processed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<EventRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(rename = "eventName", default, skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Entity {
    pub bucket: BucketRef,
    pub object: ObjectRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketRef {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectRef {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(rename = "eTag", default, skip_serializing_if = "Option::is_none")]
    pub e_tag: Option<String>,
    #[serde(rename = "versionId", default, skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
}

impl TriggerEvent {
    #[cfg(test)]
    pub fn for_object(bucket: &str, key: &str) -> Self {
        Self {
            records: vec![EventRecord {
                event_name: Some("s3:ObjectCreated:Put".to_string()),
                s3: S3Entity {
                    bucket: BucketRef {
                        name: bucket.to_string(),
                    },
                    object: ObjectRef {
                        key: key.to_string(),
                        size: None,
                        e_tag: None,
                        version_id: None,
                    },
                },
            }],
        }
    }

    pub fn first_record(&self) -> Option<&EventRecord> {
        self.records.first()
    }

    pub fn ignored_records(&self) -> usize {
        self.records.len().saturating_sub(1)
    }
}

impl ObjectRef {
    /// Keys arrive form-encoded (`+` for space, `%XX` escapes).
    pub fn decoded_key(&self) -> Result<String, std::string::FromUtf8Error> {
        let spaced = self.key.replace('+', " ");
        urlencoding::decode(&spaced).map(|key| key.into_owned())
    }

    /// Version id when the bucket is versioned, otherwise the ETag.
    pub fn revision(&self) -> Option<&str> {
        self.version_id
            .as_deref()
            .or(self.e_tag.as_deref())
            .map(|rev| rev.trim_matches('"'))
            .filter(|rev| !rev.is_empty())
    }
}
