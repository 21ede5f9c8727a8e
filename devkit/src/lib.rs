/*!
# sc-metrics DevKit - test doubles for the metrics agent

- In-memory Entity Sources and client provider with call recording
- Entity builders with timestamps relative to a fixed clock
- Harness running full aggregation cycles with snapshot assertions
*/

pub mod fixtures;
pub mod source_stub;
pub mod test_utils;

pub use source_stub::{MockEntitySource, MockProvider};
pub use test_utils::TestHarness;
