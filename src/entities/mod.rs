//! Entity-level search workflows shared by the HTTP API and the CLI.

pub(crate) mod trial;
