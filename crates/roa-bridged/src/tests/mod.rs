//! Test suites for the ROA bridge.

pub(crate) mod support;
