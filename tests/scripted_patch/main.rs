//! Scripted patch integration tests.
//!
//! Patches by key and by index against a store of contact spheres and the
//! social masks that embed copies of them.

#[path = "../common/mod.rs"]
mod common;

mod by_index;
mod by_key;
mod restart;
mod scenario;
