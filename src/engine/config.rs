//! Engine construction-time configuration, ported from the original
//! engine's `Config` (a clock selection plus a free-form parameter map) and
//! widened with the bus settings SPEC_FULL.md adds.

use crate::bus::BusConfig;
use crate::clock::ClockMode;
use crate::policy::DispatchPolicyDto;
use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Picks which [`crate::clock::Clock`] implementation [`super::Engine::new`]
/// constructs.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "mode")]
pub enum ClockConfig {
    Backtest {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        /// Nominal replay granularity, carried through to
        /// [`crate::clock::BacktestClock`] but not enforced by `advance_to`.
        #[serde(with = "duration_seconds")]
        step: Duration,
    },
    Realtime,
    Accelerated {
        sim_start: DateTime<Utc>,
        factor: f64,
    },
}

impl ClockConfig {
    pub fn mode(&self) -> ClockMode {
        match self {
            ClockConfig::Backtest { .. } => ClockMode::Backtest,
            ClockConfig::Realtime => ClockMode::Realtime,
            ClockConfig::Accelerated { .. } => ClockMode::Accelerated,
        }
    }
}

/// Serializes a [`Duration`] as whole seconds, since `chrono::Duration` has
/// no `Serialize`/`Deserialize` impl of its own.
mod duration_seconds {
    use super::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(value.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let seconds = i64::deserialize(deserializer)?;
        Ok(Duration::seconds(seconds))
    }
}

/// Top-level engine configuration, supplied once to
/// [`super::Engine::new`]/[`super::Engine::initialize`].
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    pub clock: ClockConfig,
    #[serde(default)]
    pub bus: BusConfigDto,
    /// Advisory soft cap on queued events, surfaced to
    /// [`crate::queue::EventQueue`] callers but never enforced by the queue
    /// itself; see `DESIGN.md` Open Question 2.
    #[serde(default)]
    pub event_queue_capacity: Option<usize>,
    /// Free-form key/value parameters, looked up via
    /// [`super::context::EngineContext::get_config_param`].
    #[serde(default)]
    pub parameters: IndexMap<String, String>,
}

impl EngineConfig {
    pub fn get_param(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }
}

/// Serializable stand-in for [`BusConfig`] (which holds a non-serializable
/// [`crate::policy::DispatchPolicy`] by value but no external resources),
/// kept separate so `EngineConfig` round-trips through config files the way
/// the original's parameter map did.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BusConfigDto {
    pub mode: BusModeDto,
    pub thread_pool_size: Option<usize>,
    #[serde(default)]
    pub policy: DispatchPolicyDto,
}

impl Default for BusConfigDto {
    fn default() -> Self {
        Self {
            mode: BusModeDto::Sync,
            thread_pool_size: None,
            policy: DispatchPolicyDto::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize)]
pub enum BusModeDto {
    Sync,
    Async,
}

impl From<&BusConfigDto> for BusConfig {
    fn from(dto: &BusConfigDto) -> Self {
        use crate::bus::{BusMode, ExecutorConfig};
        BusConfig {
            mode: match dto.mode {
                BusModeDto::Sync => BusMode::Sync,
                BusModeDto::Async => BusMode::Async,
            },
            executor: match dto.thread_pool_size {
                Some(threads) => ExecutorConfig::ThreadPool { threads },
                None => ExecutorConfig::Inline,
            },
            initial_policy: dto.policy.into(),
        }
    }
}
