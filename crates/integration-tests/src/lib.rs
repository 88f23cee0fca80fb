//! End-to-end tests for the relay and dispatcher live under `tests/`.
