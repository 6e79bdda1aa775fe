//! # Trigger
//!
//! Condition/action pair the [`super::Engine`] evaluates against every
//! processed [`Event`]. Ported from the original engine's
//! `TriggerCondition`/`TriggerAction`/`Trigger` trio. The original's
//! `clone()` virtual methods (needed in C++ to deep-copy through a base
//! pointer) have no counterpart here; ownership makes that unnecessary.

use crate::error::EngineResult;
use crate::event::Event;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

/// Decides whether a [`Trigger`]'s action should fire for a given event.
pub trait TriggerCondition: Send + Sync {
    fn check(&self, event: &Event, current_time: DateTime<Utc>) -> bool;
    fn description(&self) -> String;
}

/// The side effect a [`Trigger`] performs once its condition is satisfied.
pub trait TriggerAction: Send + Sync {
    fn execute(&self, triggering_event: &Event, current_time: DateTime<Utc>) -> EngineResult<()>;
    fn description(&self) -> String;
}

/// A named, independently enable-able condition/action pair, evaluated by
/// [`super::Engine`] against every event it processes.
pub struct Trigger {
    id: Uuid,
    name: String,
    condition: Box<dyn TriggerCondition>,
    action: Box<dyn TriggerAction>,
    enabled: AtomicBool,
}

impl Trigger {
    pub fn new(
        name: impl Into<String>,
        condition: Box<dyn TriggerCondition>,
        action: Box<dyn TriggerAction>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            condition,
            action,
            enabled: AtomicBool::new(true),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn condition(&self) -> &dyn TriggerCondition {
        self.condition.as_ref()
    }

    pub fn action(&self) -> &dyn TriggerAction {
        self.action.as_ref()
    }

    /// Check the condition and, if satisfied and the trigger is enabled, run
    /// the action. Disabled triggers are skipped entirely and report no
    /// firing.
    pub fn evaluate(&self, event: &Event, current_time: DateTime<Utc>) -> EngineResult<bool> {
        if !self.is_enabled() {
            return Ok(false);
        }
        if !self.condition.check(event, current_time) {
            return Ok(false);
        }
        self.action.execute(event, current_time)?;
        Ok(true)
    }
}

impl std::fmt::Debug for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trigger")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("enabled", &self.is_enabled())
            .field("condition", &self.condition.description())
            .field("action", &self.action.description())
            .finish()
    }
}

/// Adapts a plain closure into a [`TriggerCondition`], for callers who don't
/// need a named type.
pub struct FnCondition<F> {
    description: String,
    check: F,
}

impl<F> FnCondition<F>
where
    F: Fn(&Event, DateTime<Utc>) -> bool + Send + Sync,
{
    pub fn new(description: impl Into<String>, check: F) -> Self {
        Self {
            description: description.into(),
            check,
        }
    }
}

impl<F> TriggerCondition for FnCondition<F>
where
    F: Fn(&Event, DateTime<Utc>) -> bool + Send + Sync,
{
    fn check(&self, event: &Event, current_time: DateTime<Utc>) -> bool {
        (self.check)(event, current_time)
    }

    fn description(&self) -> String {
        self.description.clone()
    }
}

/// Adapts a plain closure into a [`TriggerAction`].
pub struct FnAction<F> {
    description: String,
    execute: F,
}

impl<F> FnAction<F>
where
    F: Fn(&Event, DateTime<Utc>) -> EngineResult<()> + Send + Sync,
{
    pub fn new(description: impl Into<String>, execute: F) -> Self {
        Self {
            description: description.into(),
            execute,
        }
    }
}

impl<F> TriggerAction for FnAction<F>
where
    F: Fn(&Event, DateTime<Utc>) -> EngineResult<()> + Send + Sync,
{
    fn execute(&self, triggering_event: &Event, current_time: DateTime<Utc>) -> EngineResult<()> {
        (self.execute)(triggering_event, current_time)
    }

    fn description(&self) -> String {
        self.description.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventType;
    use std::sync::atomic::{AtomicUsize, Ordering as StdOrdering};
    use std::sync::Arc;

    fn event() -> Event {
        Event::builder(EventType::Alert, Utc::now()).build()
    }

    #[test]
    fn evaluate_fires_action_when_condition_holds() {
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = fired.clone();
        let trigger = Trigger::new(
            "always-fires",
            Box::new(FnCondition::new("always true", |_, _| true)),
            Box::new(FnAction::new("count", move |_, _| {
                fired_clone.fetch_add(1, StdOrdering::SeqCst);
                Ok(())
            })),
        );

        assert!(trigger.evaluate(&event(), Utc::now()).unwrap());
        assert_eq!(fired.load(StdOrdering::SeqCst), 1);
    }

    #[test]
    fn evaluate_skips_action_when_condition_fails() {
        let trigger = Trigger::new(
            "never-fires",
            Box::new(FnCondition::new("always false", |_, _| false)),
            Box::new(FnAction::new("noop", |_, _| Ok(()))),
        );
        assert!(!trigger.evaluate(&event(), Utc::now()).unwrap());
    }

    #[test]
    fn disabled_trigger_never_fires() {
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = fired.clone();
        let trigger = Trigger::new(
            "disableable",
            Box::new(FnCondition::new("always true", |_, _| true)),
            Box::new(FnAction::new("count", move |_, _| {
                fired_clone.fetch_add(1, StdOrdering::SeqCst);
                Ok(())
            })),
        );
        trigger.set_enabled(false);
        assert!(!trigger.evaluate(&event(), Utc::now()).unwrap());
        assert_eq!(fired.load(StdOrdering::SeqCst), 0);
    }
}
