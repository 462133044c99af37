mod format;
mod path;
mod timeout;

pub use format::{format_elapsed, format_size};
pub use path::{clone_dir_name, pack_size};
pub use timeout::abort_grace;
