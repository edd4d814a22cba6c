use crate::ordering::{OrderItem, OrderingStrategy};

/// Keep the definition order.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DefinedOrdering;

impl OrderingStrategy for DefinedOrdering {
    fn order(&self, _: &mut [OrderItem<'_>], _: u64) {}
}
