//! Built-in record types.
//!
//! | Module | type / subType |
//! |--------|----------------|
//! | [`bolus::normal`] | `bolus` / `normal` |
//! | [`bolus::pen`] | `bolus` / `pen` |
//! | [`cbg`] | `cbg` |
//! | [`application`] | `applicationSettings` |
//! | [`pump_settings`] | `pumpSettings` |
//! | [`calculator`] | `wizard` |
//!
//! Each module exposes its discriminator constants, its record struct and a
//! `construct` function the registry dispatches to.
use structure::Origin;

pub mod application;
pub mod bolus;
pub mod calculator;
pub mod cbg;
pub mod pump_settings;

/// Origins whose records were already accepted once: the store and the server.
pub(crate) fn is_stored(origin: Origin) -> bool {
    matches!(origin, Origin::Store | Origin::Internal)
}
