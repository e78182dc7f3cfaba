//! Internal utility helpers for date handling and serde shapes.

pub(crate) mod date;
pub(crate) mod serde;
