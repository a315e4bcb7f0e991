//! Integration tests for error handling

use framepress_core::error::{FramepressError, ResultExt};

#[test]
fn test_error_context_chaining() {
    let base_error = FramepressError::encoder("libx264 not found");
    let with_context = base_error.with_context("failed to open encoder");

    let msg = format!("{}", with_context);
    assert!(msg.contains("failed to open encoder"));
    assert!(msg.contains("libx264 not found"));
}

#[test]
fn test_result_ext_context() {
    let result: Result<(), FramepressError> = Err(FramepressError::source("device busy"));
    let with_context = result.context("failed to open capture device");

    assert!(with_context.is_err());
    let err = with_context.unwrap_err();
    let msg = format!("{}", err);
    assert!(msg.contains("failed to open capture device"));
    assert!(msg.contains("device busy"));
}

#[test]
fn test_variant_display_prefixes() {
    assert!(FramepressError::source("x").to_string().starts_with("Capture error"));
    assert!(FramepressError::sink("x").to_string().starts_with("Output error"));
    assert!(FramepressError::convert("x").to_string().starts_with("Convert error"));
    assert!(FramepressError::encoder("x").to_string().starts_with("Encoder error"));
    assert!(FramepressError::config("x").to_string().starts_with("Configuration error"));
}

#[test]
fn test_io_error_conversion() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such device");
    let err: FramepressError = io_err.into();
    assert!(matches!(err, FramepressError::Io(_)));
    assert!(err.to_string().contains("no such device"));
}

#[test]
fn test_source_chain_is_preserved() {
    use std::error::Error;

    let err = FramepressError::sink("queue full").with_context("write failed");
    let source = err.source().expect("context error should have a source");
    assert!(source.to_string().contains("queue full"));
}
