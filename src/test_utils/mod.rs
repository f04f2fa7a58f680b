//! the test_utils folder here will share sample records and store fixtures
//! between unit tests
mod records;
mod store;

pub use records::*;
pub use store::*;
