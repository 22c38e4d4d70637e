//! Integration tests for error handling in shroud-runtime

use shroud_runtime::ShroudError;

#[test]
fn test_invalid_classification_error_message() {
    let error = ShroudError::invalid_classification("balance", "flags conflict");

    let error_msg = error.to_string();
    assert!(error_msg.contains("Invalid classification"));
    assert!(error_msg.contains("balance"));
    assert!(error_msg.contains("flags conflict"));
}

#[test]
fn test_serialization_error_message() {
    let error = ShroudError::serialization_error("invalid JSON format");

    let error_msg = error.to_string();
    assert!(error_msg.contains("Serialization error"));
    assert!(error_msg.contains("invalid JSON format"));
}

#[test]
fn test_other_error_message() {
    let error = ShroudError::other("unexpected error occurred");

    assert_eq!(error.to_string(), "unexpected error occurred");
}

#[test]
fn test_io_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let error: ShroudError = io_error.into();

    let error_msg = error.to_string();
    assert!(error_msg.contains("I/O error"));
    assert!(error_msg.contains("file not found"));
}

#[test]
fn test_json_error_conversion() {
    let json_error = serde_json::from_str::<u32>("nope").unwrap_err();
    let error: ShroudError = json_error.into();

    assert!(matches!(error, ShroudError::SerializationError(_)));
}

#[test]
fn test_error_debug_format() {
    let error = ShroudError::invalid_classification("x", "test");
    let debug_output = format!("{:?}", error);

    assert!(debug_output.contains("InvalidClassification"));
}

#[test]
fn test_result_type_err() {
    use shroud_runtime::Result;

    let result: Result<i32> = Err(ShroudError::other("test error"));
    if let Err(error) = result {
        assert_eq!(error.to_string(), "test error");
    } else {
        panic!("Expected error");
    }
}
