//! Data models for the application
//!
//! Each sub-module represents one feature area; everything is re-exported here.

mod account;
mod batch;
mod quota;
mod upload;

pub use account::*;
pub use batch::*;
pub use quota::*;
pub use upload::*;
