//! Small utilities without functionality specific to Lodestone,
//! for small Rust-specific tasks.

mod inspect_none;
mod lock_or_panic;


pub use self::{inspect_none::InspectNone, lock_or_panic::LockOrPanic};
