use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        ExportError::configuration("x")
            .to_string()
            .contains("configuration error:")
    );
    assert!(
        ExportError::conversion_context("x")
            .to_string()
            .contains("conversion context error:")
    );
    assert!(ExportError::encode("x").to_string().contains("encode error:"));
    assert!(ExportError::usage("x").to_string().contains("usage error:"));
    assert!(
        ExportError::sequence("x")
            .to_string()
            .contains("sequence error:")
    );
    assert!(ExportError::state("x").to_string().contains("state error:"));
}

#[test]
fn only_usage_errors_are_usage() {
    assert!(ExportError::usage("missing output").is_usage());
    assert!(!ExportError::encode("boom").is_usage());
    assert!(!ExportError::validation("bad").is_usage());
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = ExportError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
