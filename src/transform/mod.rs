//! Transform adapters from upstream API shapes into response-facing records.

pub(crate) mod trial;
