//! XInput2 requests
//!
//! Each request locks the [`Display`](crate::connection::Display) for its
//! whole duration and returns the first failure it meets.

pub mod cursor;
pub mod hierarchy;

pub use cursor::{define_device_cursor, undefine_device_cursor};
pub use hierarchy::{change_hierarchy, change_hierarchy_raw};
