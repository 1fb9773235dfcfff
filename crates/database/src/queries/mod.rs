//! Database query operations

pub mod blobs;

pub use blobs::{delete_blob, get_blob, list_keys, put_blob};
