//! Test suites for the entrypoint startup pipeline.

pub(crate) mod support;
