pub mod image_io;

pub use image_io::{load_reference, load_stack, read_metadata, save_stack};
