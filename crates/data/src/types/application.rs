//! Settings reported by the uploading application.
use serde::Serialize;
use serde_json::Value;
use structure::{Meta, Normalizable, Normalizer, ObjectParser, Parsable, Validatable, Validator};

use crate::{Base, Datum};

pub const TYPE: &str = "applicationSettings";

pub const NAME_LENGTH_MAXIMUM: usize = 1000;
pub const VERSION_LENGTH_MAXIMUM: usize = 1000;
pub const BUILD_LENGTH_MAXIMUM: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSettings {
    #[serde(flatten)]
    pub base: Base,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            base: Base::new(TYPE, None),
            name: None,
            version: None,
            build: None,
        }
    }
}

pub fn construct() -> Box<dyn Datum> {
    Box::new(ApplicationSettings::default())
}

impl Parsable for ApplicationSettings {
    fn parse(&mut self, parser: &mut ObjectParser<'_>) {
        self.base.parse(parser);
        self.name = parser.string("name");
        self.version = parser.string("version");
        self.build = parser.string("build");
    }
}

impl Validatable for ApplicationSettings {
    fn validate(&self, validator: &mut Validator<'_>) {
        self.base.validate(validator);
        self.base.validate_discriminator(validator, TYPE, None);

        validator
            .string("name", self.name.as_deref())
            .exists()
            .length_in_range(1, NAME_LENGTH_MAXIMUM);
        validator
            .string("version", self.version.as_deref())
            .exists()
            .length_in_range(1, VERSION_LENGTH_MAXIMUM);
        validator
            .string("build", self.build.as_deref())
            .length_in_range(1, BUILD_LENGTH_MAXIMUM);
    }
}

impl Normalizable for ApplicationSettings {
    fn normalize(&mut self, normalizer: &mut Normalizer<'_>) {
        self.base.normalize(normalizer);
    }
}

impl Datum for ApplicationSettings {
    fn meta(&self) -> Meta {
        self.base.meta()
    }

    fn to_document(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
