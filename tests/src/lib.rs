//! Cross-crate integration tests.

#[cfg(test)]
mod rollout;
