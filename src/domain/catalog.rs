//! Catalog records mirrored from persistent storage.
//!
//! Dates (`birth_date`, `publish_date`) serialize as `YYYY-MM-DD`; row
//! timestamps serialize as RFC 3339. The same serialized shape is used for
//! API payloads and for cached entries, so records round-trip through JSON.

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime, format_description::FormatItem, macros::format_description};

/// Wire format for `birth_date` and `publish_date` values.
pub const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Render a calendar date as `YYYY-MM-DD`.
pub fn format_date(date: Date) -> String {
    date.format(&DATE_FORMAT)
        .expect("formatting a calendar date should succeed")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorRecord {
    pub id: i64,
    pub name: String,
    pub bio: Option<String>,
    #[serde(with = "opt_date_string")]
    pub birth_date: Option<Date>,
    #[serde(with = "timestamp_string")]
    pub created_at: OffsetDateTime,
    #[serde(with = "timestamp_string")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookRecord {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    #[serde(with = "date_string")]
    pub publish_date: Date,
    pub author_id: i64,
    #[serde(with = "timestamp_string")]
    pub created_at: OffsetDateTime,
    #[serde(with = "timestamp_string")]
    pub updated_at: OffsetDateTime,
}

/// Author fields embedded in a single-book read.
///
/// A book whose `author_id` no longer resolves still reads successfully; the
/// relation comes back as [`RelatedAuthor::placeholder`] with every field
/// null rather than failing the lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedAuthor {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub bio: Option<String>,
    #[serde(with = "opt_date_string")]
    pub birth_date: Option<Date>,
    #[serde(with = "opt_timestamp_string")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(with = "opt_timestamp_string")]
    pub updated_at: Option<OffsetDateTime>,
}

impl RelatedAuthor {
    /// The all-null stand-in for a dangling `author_id`.
    pub fn placeholder() -> Self {
        Self {
            id: None,
            name: None,
            bio: None,
            birth_date: None,
            created_at: None,
            updated_at: None,
        }
    }
}

impl From<AuthorRecord> for RelatedAuthor {
    fn from(author: AuthorRecord) -> Self {
        Self {
            id: Some(author.id),
            name: Some(author.name),
            bio: author.bio,
            birth_date: author.birth_date,
            created_at: Some(author.created_at),
            updated_at: Some(author.updated_at),
        }
    }
}

pub mod date_string {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use time::Date;

    use super::DATE_FORMAT;

    pub fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        date.format(DATE_FORMAT)
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Date::parse(&raw, DATE_FORMAT).map_err(serde::de::Error::custom)
    }
}

pub mod opt_date_string {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Date;

    use super::DATE_FORMAT;

    pub fn serialize<S: Serializer>(
        date: &Option<Date>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match date {
            Some(date) => super::date_string::serialize(date, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Date>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| Date::parse(&raw, DATE_FORMAT).map_err(serde::de::Error::custom))
            .transpose()
    }
}

pub mod timestamp_string {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use time::OffsetDateTime;
    use time::format_description::well_known::Rfc3339;

    pub fn serialize<S: Serializer>(
        value: &OffsetDateTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        value
            .format(&Rfc3339)
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<OffsetDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        OffsetDateTime::parse(&raw, &Rfc3339).map_err(serde::de::Error::custom)
    }
}

pub mod opt_timestamp_string {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::OffsetDateTime;
    use time::format_description::well_known::Rfc3339;

    pub fn serialize<S: Serializer>(
        value: &Option<OffsetDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => super::timestamp_string::serialize(value, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<OffsetDateTime>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| OffsetDateTime::parse(&raw, &Rfc3339).map_err(serde::de::Error::custom))
            .transpose()
    }
}
