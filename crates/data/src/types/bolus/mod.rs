//! Insulin dosing events. Every bolus record discriminates by `subType`.

pub mod normal;
pub mod pen;

pub const TYPE: &str = "bolus";

/// Units of insulin; shared by the sub types that carry a `normal` dose.
pub const NORMAL_MAXIMUM: f64 = 100.0;
pub const NORMAL_MINIMUM: f64 = 0.0;
