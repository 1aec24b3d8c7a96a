mod client;
mod parser;

pub use client::HttpFeedClient;
pub use parser::parse_feed;
