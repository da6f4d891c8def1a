use std::fmt;

use crate::domain::basket::BasketId;

/// Where a `create_order` call is. A post-commit stage is reached once its
/// step has run, whether or not the channel took the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStage {
    Validating,
    Assembled,
    Persisted,
    PrimaryNotified,
    SecondaryNotified,
    Enqueued,
    Completed,
    Aborted(&'static str),
}

impl OrderStage {
    fn rank(&self) -> Option<u8> {
        match self {
            OrderStage::Validating => Some(0),
            OrderStage::Assembled => Some(1),
            OrderStage::Persisted => Some(2),
            OrderStage::PrimaryNotified => Some(3),
            OrderStage::SecondaryNotified => Some(4),
            OrderStage::Enqueued => Some(5),
            OrderStage::Completed => Some(6),
            OrderStage::Aborted(_) => None,
        }
    }

    /// Past the commit point; nothing after this undoes the order.
    pub fn is_committed(&self) -> bool {
        self.rank().is_some_and(|rank| rank >= 2)
    }

    pub fn can_transition_to(&self, next: &OrderStage) -> bool {
        match (self.rank(), next.rank()) {
            (Some(from), Some(to)) => to == from + 1,
            // Abort only before the order is persisted
            (Some(_), None) => !self.is_committed(),
            (None, _) => false,
        }
    }
}

impl fmt::Display for OrderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStage::Validating => f.write_str("validating"),
            OrderStage::Assembled => f.write_str("assembled"),
            OrderStage::Persisted => f.write_str("persisted"),
            OrderStage::PrimaryNotified => f.write_str("primary_notified"),
            OrderStage::SecondaryNotified => f.write_str("secondary_notified"),
            OrderStage::Enqueued => f.write_str("enqueued"),
            OrderStage::Completed => f.write_str("completed"),
            OrderStage::Aborted(reason) => write!(f, "aborted({reason})"),
        }
    }
}

/// Stages one invocation went through, in order.
#[derive(Debug, Clone)]
pub struct StageTrail {
    basket_id: BasketId,
    stages: Vec<OrderStage>,
}

impl StageTrail {
    pub fn start(basket_id: BasketId) -> Self {
        tracing::debug!(basket_id = basket_id, stage = %OrderStage::Validating, "Order stage");
        Self {
            basket_id,
            stages: vec![OrderStage::Validating],
        }
    }

    pub fn current(&self) -> OrderStage {
        self.stages.last().copied().unwrap_or(OrderStage::Validating)
    }

    /// Out-of-order transitions are ignored and logged.
    pub fn advance(&mut self, next: OrderStage) {
        let current = self.current();
        if !current.can_transition_to(&next) {
            tracing::error!(
                basket_id = self.basket_id,
                from = %current,
                to = %next,
                "Illegal order stage transition"
            );
            return;
        }

        tracing::debug!(basket_id = self.basket_id, stage = %next, "Order stage");
        self.stages.push(next);
    }

    pub fn into_stages(self) -> Vec<OrderStage> {
        self.stages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_is_linear() {
        let mut trail = StageTrail::start(1);
        for stage in [
            OrderStage::Assembled,
            OrderStage::Persisted,
            OrderStage::PrimaryNotified,
            OrderStage::SecondaryNotified,
            OrderStage::Enqueued,
            OrderStage::Completed,
        ] {
            trail.advance(stage);
        }

        assert_eq!(trail.current(), OrderStage::Completed);
        assert_eq!(trail.into_stages().len(), 7);
    }

    #[test]
    fn test_abort_only_before_commit() {
        assert!(OrderStage::Validating.can_transition_to(&OrderStage::Aborted("empty_basket")));
        assert!(OrderStage::Assembled.can_transition_to(&OrderStage::Aborted("persistence_failed")));
        assert!(!OrderStage::Persisted.can_transition_to(&OrderStage::Aborted("queue")));
        assert!(!OrderStage::Enqueued.can_transition_to(&OrderStage::Aborted("queue")));
    }

    #[test]
    fn test_skipping_a_stage_is_ignored() {
        let mut trail = StageTrail::start(1);
        trail.advance(OrderStage::Persisted);
        assert_eq!(trail.current(), OrderStage::Validating);
    }

    #[test]
    fn test_aborted_is_terminal() {
        let aborted = OrderStage::Aborted("basket_not_found");
        assert!(!aborted.can_transition_to(&OrderStage::Assembled));
        assert!(!aborted.is_committed());
    }
}
