//! Integration-test-only package; see `tests/`.
