// rdl-aio/src/lib.rs
//! Filesystem operations for rdl (atomic writes, json)

pub mod fs;
pub mod json_io;

pub use fs::{
    atomic_copy_file, atomic_write_file, create_dir_all, read_to_bytes, remove_file_if_exists,
};
pub use json_io::{read_json, write_json_atomic};
