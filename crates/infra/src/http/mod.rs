//! HTTP client utilities.

mod client;

pub use client::{HttpClient, HttpClientBuilder};
