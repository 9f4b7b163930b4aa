pub mod client;

pub use client::{ListEndpoint, ListQuery, RestClient, SearchEndpoint};
