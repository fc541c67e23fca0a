use super::entity::Entity;
use crate::core::Result;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Transition points at which observers run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    Saving,
    Saved,
    Creating,
    Created,
    Updating,
    Updated,
    Deleting,
    Deleted,
}

impl LifecycleEvent {
    pub const ALL: [LifecycleEvent; 8] = [
        Self::Saving,
        Self::Saved,
        Self::Creating,
        Self::Created,
        Self::Updating,
        Self::Updated,
        Self::Deleting,
        Self::Deleted,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Saving => "saving",
            Self::Saved => "saved",
            Self::Creating => "creating",
            Self::Created => "created",
            Self::Updating => "updating",
            Self::Updated => "updated",
            Self::Deleting => "deleting",
            Self::Deleted => "deleted",
        }
    }

    /// Events fired before a transition may veto it.
    pub fn is_haltable(&self) -> bool {
        matches!(
            self,
            Self::Saving | Self::Creating | Self::Updating | Self::Deleting
        )
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Observer verdict. `Cancel` is ignored on events that are not haltable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookSignal {
    Proceed,
    Cancel,
}

impl From<bool> for HookSignal {
    fn from(proceed: bool) -> Self {
        if proceed { Self::Proceed } else { Self::Cancel }
    }
}

pub type LifecycleHook = Arc<dyn Fn(&mut Entity) -> Result<HookSignal> + Send + Sync>;

/// Ordered observers per event, run synchronously in registration order.
#[derive(Clone, Default)]
pub struct HookRegistry {
    hooks: HashMap<LifecycleEvent, Vec<LifecycleHook>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, event: LifecycleEvent, hook: LifecycleHook) {
        self.hooks.entry(event).or_default().push(hook);
    }

    pub fn count(&self, event: LifecycleEvent) -> usize {
        self.hooks.get(&event).map_or(0, Vec::len)
    }

    /// Runs the observers of `event`. Returns `false` when a haltable event
    /// was cancelled; later observers of that event do not run. An observer
    /// error aborts immediately.
    pub fn fire(&self, event: LifecycleEvent, entity: &mut Entity) -> Result<bool> {
        let Some(hooks) = self.hooks.get(&event) else {
            return Ok(true);
        };

        for hook in hooks {
            let signal = hook(entity)?;
            if signal == HookSignal::Cancel && event.is_haltable() {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for event in LifecycleEvent::ALL {
            let count = self.count(event);
            if count > 0 {
                map.entry(&event.name(), &count);
            }
        }
        map.finish()
    }
}
