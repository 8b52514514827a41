//! Flash engine
//!
//! [`SerialFlash`] wraps a [`Transport`](crate::transport::Transport) and
//! exposes the page-addressed primitives: protection, erase, program,
//! streaming reads and identification. The bitmap allocator lives in
//! [`crate::bitmap`] and is implemented on the same type.

mod engine;
mod ident;
mod read;

pub use engine::SerialFlash;
pub use ident::{ChipIdentity, EXPECTED_IDENTITY};
pub use read::ReadSession;
