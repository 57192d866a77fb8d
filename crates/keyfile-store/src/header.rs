use serde_json::{Map, Value};

use keyfile_types::{format, Datime, DocumentUuid};

use crate::error::{FileError, FileResult};

/// Top-level fields of a document, everything but `Keys` and
/// `StreamerInfos`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentHeader {
    pub created: Datime,
    pub modified: Datime,
    pub uuid: DocumentUuid,
    pub producer_version: Option<i64>,
    pub io_version: i64,
    pub title: String,
}

impl DocumentHeader {
    /// Header of a document that is being created.
    pub fn fresh() -> Self {
        let now = Datime::now();
        Self {
            created: now,
            modified: now,
            uuid: DocumentUuid::new(),
            producer_version: None,
            io_version: format::CURRENT_IO_VERSION,
            title: String::new(),
        }
    }

    /// Validate and read the header of a parsed document.
    ///
    /// The `type` marker must be present and equal to the file-type marker,
    /// and the io-version must be present and not newer than this build
    /// supports. Missing timestamps and UUID are filled in.
    pub fn from_root(root: &Map<String, Value>) -> FileResult<Self> {
        match root.get(format::TYPE) {
            Some(Value::String(marker)) if marker == format::FILE_TYPE_MARKER => {}
            Some(other) => {
                return Err(FileError::Format(format!(
                    "document type is {other}, expected {}",
                    format::FILE_TYPE_MARKER
                )))
            }
            None => return Err(FileError::Format("document has no type marker".into())),
        }

        let io_version = root
            .get(format::IO_VERSION)
            .and_then(Value::as_i64)
            .ok_or_else(|| FileError::Format("document has no io-version".into()))?;
        if io_version > format::CURRENT_IO_VERSION {
            return Err(FileError::UnsupportedVersion {
                found: io_version,
                supported: format::CURRENT_IO_VERSION,
            });
        }

        let timestamp = |field: &str| -> FileResult<Datime> {
            match root.get(field).and_then(Value::as_str) {
                Some(s) => Ok(Datime::parse_sql(s)?),
                None => Ok(Datime::now()),
            }
        };
        let uuid = match root.get(format::UUID).and_then(Value::as_str) {
            Some(s) => s.parse()?,
            None => DocumentUuid::new(),
        };

        Ok(Self {
            created: timestamp(format::CREATED)?,
            modified: timestamp(format::MODIFIED)?,
            uuid,
            producer_version: root.get(format::PRODUCER_VERSION).and_then(Value::as_i64),
            io_version,
            title: root
                .get(format::TITLE)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
    }

    /// Write the header fields into a document root.
    pub fn write_into(&self, root: &mut Map<String, Value>, reproducible: bool) {
        let (created, modified, uuid) = if reproducible {
            (Datime::reproducible(), Datime::reproducible(), DocumentUuid::nil())
        } else {
            (self.created, self.modified, self.uuid)
        };
        root.insert(format::CREATED.into(), Value::String(created.to_sql_string()));
        root.insert(format::MODIFIED.into(), Value::String(modified.to_sql_string()));
        root.insert(format::UUID.into(), Value::String(uuid.to_string()));
        root.insert(format::TYPE.into(), Value::String(format::FILE_TYPE_MARKER.into()));
        if let Some(code) = self.producer_version {
            root.insert(format::PRODUCER_VERSION.into(), Value::from(code));
        }
        root.insert(format::IO_VERSION.into(), Value::from(self.io_version));
        if self.title.is_empty() {
            root.remove(format::TITLE);
        } else {
            root.insert(format::TITLE.into(), Value::String(self.title.clone()));
        }
    }
}
