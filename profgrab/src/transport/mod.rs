//! Source resolution and remote retrieval
//!
//! - [`resolve`]: decide whether a source string is a URL and canonicalize it
//! - [`http`]: fetch a resolved URL with a bounded timeout

pub mod http;
pub mod resolve;

pub use http::fetch_url;
pub use resolve::{adjust_url, ResolvedUrl};
