//! Integration tests for the discovery pipeline
//!
//! These tests use wiremock to stand in for the listing site and run full
//! sessions end-to-end against temporary checkpoint files.

mod concurrency_tests;
mod crawl_tests;
mod support;
