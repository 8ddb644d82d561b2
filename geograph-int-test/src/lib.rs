//! Integration test support for the geograph spatial index.

pub mod test_util;
