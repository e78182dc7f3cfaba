//! Output rendering for the CLI surface.

pub(crate) mod json;
