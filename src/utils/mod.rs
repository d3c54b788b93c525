//! Utility modules shared across the crate.
//!
//! - [`HttpClient`]: reqwest client with timeouts and a crate user agent
//! - [`clean_text`]: normalize extracted text
//! - [`truncate_chars`]: deterministic, UTF-8 safe truncation to a provider's input limit
//! - [`split_sentences`] / [`key_terms`]: building blocks for the local template generator

mod http;
mod text;

pub use http::HttpClient;
pub use text::{
    clean_filename, clean_text, key_terms, split_sentences, truncate_chars,
    truncate_with_ellipsis,
};
