mod http;

pub use http::HttpMediaSource;
