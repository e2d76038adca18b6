//! Readiness pacing between rollout steps.
//!
//! The sequencer does not probe node health. It pauses at fixed points and leaves
//! the pause length to a [`ReadinessWait`] implementation.

use std::fmt;
use std::time::Duration;

use crate::config::RolloutConfig;

/// Points in a rollout where the sequencer pauses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitPoint {
    /// After the genesis node's workload and endpoint exist.
    GenesisCreated,
    /// After follower `i`'s workload and endpoint exist.
    FollowerCreated(usize),
    /// After the last validator, before the first processor.
    BeforeProcessors,
}

impl fmt::Display for WaitPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GenesisCreated => write!(f, "genesis created"),
            Self::FollowerCreated(index) => write!(f, "follower {index} created"),
            Self::BeforeProcessors => write!(f, "before processors"),
        }
    }
}

/// Decides how long to pause at each [`WaitPoint`] and performs the pause.
pub trait ReadinessWait {
    fn delay_for(&self, point: WaitPoint) -> Duration;

    /// Block until the network is considered ready past `point`.
    fn wait(&mut self, point: WaitPoint) {
        let delay = self.delay_for(point);
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}

impl<T: ReadinessWait + ?Sized> ReadinessWait for &mut T {
    fn delay_for(&self, point: WaitPoint) -> Duration {
        (**self).delay_for(point)
    }

    fn wait(&mut self, point: WaitPoint) {
        (**self).wait(point)
    }
}

/// Sleeps for configured fixed intervals.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixedDelays {
    pub genesis: Duration,
    pub follower: Duration,
    pub before_processors: Duration,
}

impl FixedDelays {
    pub fn from_config(config: &RolloutConfig) -> Self {
        Self {
            genesis: Duration::from_secs(config.genesis_delay_secs),
            follower: Duration::from_secs(config.follower_delay_secs),
            before_processors: Duration::from_secs(config.processor_settle_secs),
        }
    }
}

impl Default for FixedDelays {
    fn default() -> Self {
        Self::from_config(&RolloutConfig::default())
    }
}

impl ReadinessWait for FixedDelays {
    fn delay_for(&self, point: WaitPoint) -> Duration {
        match point {
            WaitPoint::GenesisCreated => self.genesis,
            WaitPoint::FollowerCreated(_) => self.follower,
            WaitPoint::BeforeProcessors => self.before_processors,
        }
    }
}

/// Never pauses. Used for dry runs and tests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NoWait;

impl ReadinessWait for NoWait {
    fn delay_for(&self, _point: WaitPoint) -> Duration {
        Duration::ZERO
    }
}
