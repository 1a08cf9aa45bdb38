//! Image file support
//!
//! Decodes source images and brush stamps from data URLs or the asset tree.

mod loader;
pub mod types;

pub(crate) use loader::url_for_log;
pub use loader::{png_data_url, ImageLoader};
pub use types::*;
