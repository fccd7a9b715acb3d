mod files;
mod headers;
pub mod progress;
mod size;

// Export utility functions
pub use self::files::{create_dirs, output_file_name, unique_file_names};
pub use self::headers::parse_headers;
pub use self::size::format_bytes;
