pub mod http;
pub mod web;
