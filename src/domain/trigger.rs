// One-shot condition latch for converting continuous local signals into
// single notifications.

/// Fires at most once over its lifetime: the first call where the
/// predicate holds returns true, every other call returns false. Once
/// latched the predicate is no longer evaluated, so checking every tick
/// stays free after the fire.
#[derive(Debug, Default, Clone)]
pub struct SingleFireTrigger {
    fired: bool,
}

impl SingleFireTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check_and_fire(&mut self, predicate: impl FnOnce() -> bool) -> bool {
        if self.fired {
            return false;
        }
        if predicate() {
            self.fired = true;
            return true;
        }
        false
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }
}
