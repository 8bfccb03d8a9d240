//! Set operations over the registered networks of whole tries

mod set;

pub use set::{difference, flatten, union};
