/// Memory binding state of a buffer

use crate::registry::MemoryKey;

/// Whether a buffer is bound to memory, and where
///
/// A binding to an allocation that was freed afterwards stays `Bound`; the
/// registry detects it because the memory key no longer resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BindingState {
    #[default]
    Unbound,
    Bound {
        memory: MemoryKey,
        offset: u64,
    },
}

impl BindingState {
    pub fn is_bound(&self) -> bool {
        matches!(self, BindingState::Bound { .. })
    }
}
