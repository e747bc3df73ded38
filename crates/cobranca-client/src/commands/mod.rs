pub(crate) mod common;
pub mod invoice;
pub mod report;
