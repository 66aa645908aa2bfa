//! Wrapper options.

/// Per-operation-category fault propagation.
///
/// A fault is always captured into the wrapper's error slot first. With the
/// category flag off (the default) the operation then returns its failure
/// value; with it on, the fault is re-raised as `Err` after being recorded.
/// Expected outcomes never propagate regardless of these flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropagationPolicy {
    /// Key and predicate loads.
    pub load: bool,
    /// Saves and pending-change flushes.
    pub save: bool,
    /// Tracked deletes.
    pub delete: bool,
    /// Direct statements.
    pub direct: bool,
}

impl PropagationPolicy {
    /// No propagation: every fault is reported through return values only.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            load: false,
            save: false,
            delete: false,
            direct: false,
        }
    }

    /// Propagate faults for every operation category.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            load: true,
            save: true,
            delete: true,
            direct: true,
        }
    }
}

/// Options governing a wrapper instance, with the wrapper's lifetime.
#[derive(Debug, Clone, Copy, Default)]
pub struct BusinessOptions {
    /// Run the validation pipeline inside every save. Off by default.
    pub auto_validate: bool,
    /// Fault propagation per operation category. All off by default.
    pub propagation: PropagationPolicy,
}

impl BusinessOptions {
    /// Creates options with all defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether saves validate automatically.
    #[must_use]
    pub const fn auto_validate(mut self, value: bool) -> Self {
        self.auto_validate = value;
        self
    }

    /// Sets the full propagation policy.
    #[must_use]
    pub const fn propagation(mut self, policy: PropagationPolicy) -> Self {
        self.propagation = policy;
        self
    }

    /// Enables or disables fault propagation for every category.
    #[must_use]
    pub const fn propagate_all(mut self, value: bool) -> Self {
        self.propagation = if value {
            PropagationPolicy::all()
        } else {
            PropagationPolicy::none()
        };
        self
    }
}
