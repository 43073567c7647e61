pub mod customer;

pub use customer::{AdminContext, CustomerContext};
