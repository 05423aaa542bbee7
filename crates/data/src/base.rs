//! Envelope fields shared by every record type.
//!
//! Each concrete record embeds a [`Base`] and delegates to it first in every
//! phase: parse the envelope, validate the envelope, normalize the envelope,
//! then move on to its own fields.
use chrono::{DateTime, Utc};
use serde::Serialize;
use structure::{
    Meta, Normalizable, Normalizer, ObjectParser, Origin, Parsable, Validatable, Validator,
};

pub const ID_LENGTH_MAXIMUM: usize = 64;
pub const DEVICE_ID_LENGTH_MAXIMUM: usize = 1000;
pub const UPLOAD_ID_LENGTH_MAXIMUM: usize = 64;
/// Minutes; one week either side of UTC.
pub const TIMEZONE_OFFSET_MAXIMUM: i64 = 7 * 24 * 60;
/// Milliseconds; one day either side.
pub const CLOCK_DRIFT_OFFSET_MAXIMUM: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Base {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone_offset: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clock_drift_offset: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<DateTime<Utc>>,
}

impl Base {
    pub fn new(type_: &str, sub_type: Option<&str>) -> Self {
        Self {
            type_: Some(type_.to_owned()),
            sub_type: sub_type.map(str::to_owned),
            ..Self::default()
        }
    }

    /// The discriminator as currently present on the record.
    pub fn meta(&self) -> Meta {
        Meta::new(
            self.type_.clone().unwrap_or_default(),
            self.sub_type.as_deref(),
        )
    }

    /// Checks the discriminator against the record type's registered constants.
    ///
    /// With `want_sub_type == None` the record must not carry a `subType`.
    pub fn validate_discriminator(
        &self,
        validator: &mut Validator<'_>,
        want_type: &str,
        want_sub_type: Option<&str>,
    ) {
        validator
            .string("type", self.type_.as_deref())
            .equal_to(want_type);
        match want_sub_type {
            Some(want) => {
                validator
                    .string("subType", self.sub_type.as_deref())
                    .exists()
                    .equal_to(want);
            }
            None => {
                validator
                    .string("subType", self.sub_type.as_deref())
                    .not_exists();
            }
        }
    }
}

impl Parsable for Base {
    fn parse(&mut self, parser: &mut ObjectParser<'_>) {
        self.id = parser.string("id");
        self.type_ = parser.string("type");
        self.sub_type = parser.string("subType");
        self.time = parser.time("time");
        self.device_id = parser.string("deviceId");
        self.upload_id = parser.string("uploadId");
        self.timezone_offset = parser.int("timezoneOffset");
        self.clock_drift_offset = parser.int("clockDriftOffset");
        self.created_time = parser.time("createdTime");
        self.modified_time = parser.time("modifiedTime");
    }
}

impl Validatable for Base {
    fn validate(&self, validator: &mut Validator<'_>) {
        validator
            .string("id", self.id.as_deref())
            .length_in_range(1, ID_LENGTH_MAXIMUM);
        validator
            .string("type", self.type_.as_deref())
            .exists()
            .not_empty();
        validator.time("time", self.time).exists();
        validator
            .string("deviceId", self.device_id.as_deref())
            .length_in_range(1, DEVICE_ID_LENGTH_MAXIMUM);
        validator
            .string("uploadId", self.upload_id.as_deref())
            .length_in_range(1, UPLOAD_ID_LENGTH_MAXIMUM);
        validator
            .int("timezoneOffset", self.timezone_offset)
            .in_range(-TIMEZONE_OFFSET_MAXIMUM, TIMEZONE_OFFSET_MAXIMUM);
        validator
            .int("clockDriftOffset", self.clock_drift_offset)
            .in_range(-CLOCK_DRIFT_OFFSET_MAXIMUM, CLOCK_DRIFT_OFFSET_MAXIMUM);
    }
}

impl Normalizable for Base {
    fn normalize(&mut self, normalizer: &mut Normalizer<'_>) {
        // Store-managed; a client never gets to set these.
        if normalizer.origin() == Origin::User {
            self.created_time = None;
            self.modified_time = None;
        }
    }
}
