//! Alert proxy domain types and pure logic.
//!
//! Nothing in this crate performs I/O. The log client, the notification
//! registry, the job store and the HTTP layer all build on these types.

pub mod alert;
pub mod annotation;
pub mod channels;
pub mod duration;
pub mod error;
pub mod job;
pub mod log;
pub mod notification;
pub mod time;
pub mod types;
