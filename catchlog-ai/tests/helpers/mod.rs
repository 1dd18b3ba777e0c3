//! Test Helper Utilities
//!
//! Shared utilities for testing catchlog-ai

#![allow(dead_code)]

pub mod log_capture;
pub mod test_app;

pub use test_app::{
    json_body, multipart_request, text_body, CannedAnalyzer, Part, TestApp, PNG_BYTES,
};
