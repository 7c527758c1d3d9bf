//! Helper functions for templates and terminal output

mod date;
mod html;
mod url;

pub use date::*;
pub use html::*;
pub use url::*;
