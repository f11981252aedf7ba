//! Provider adapters — concrete backends behind [`crate::ProviderAdapter`].

pub mod http;

pub use http::HttpProviderAdapter;
