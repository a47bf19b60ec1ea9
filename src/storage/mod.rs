pub mod append_file;
pub mod hint;
pub mod mmap_file;
pub mod paths;
pub mod segment;
