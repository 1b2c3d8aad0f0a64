pub mod atomic_write;
pub mod logging;

pub use atomic_write::write_file_atomic;
pub use logging::truncate_text;
