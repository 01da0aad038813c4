pub mod field;
pub mod search;
pub mod test_detail;

pub use field::*;
pub use search::*;
pub use test_detail::*;
