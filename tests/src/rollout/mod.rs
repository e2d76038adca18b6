//! Rollout test helpers and scenarios.
//!
//! These tests drive the full provisioning flow (key distribution, script synthesis
//! and sequenced resource creation) against in-process cluster backends.

mod helpers;
mod scenarios;
