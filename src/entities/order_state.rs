use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle state shared by invoices, invoice items and factors.
///
/// `Returned` is declared for a future returns flow; no transition currently
/// reaches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "accepted")]
    Accepted,
    #[sea_orm(string_value = "rejected")]
    Rejected,
    #[sea_orm(string_value = "canceled")]
    Canceled,
    #[sea_orm(string_value = "sending")]
    Sending,
    #[sea_orm(string_value = "finished")]
    Finished,
    #[sea_orm(string_value = "returned")]
    Returned,
}

/// Actions a store operator or the owning user may request on an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderAction {
    Accept,
    Reject,
    Cancel,
    Sending,
    Finished,
}

impl OrderState {
    /// Returns the state an action leads to from `self`, or `None` when the
    /// action is not legal in the current state.
    ///
    /// Callers treat `None` as a silent no-op: the order keeps its current
    /// state and no side effect runs. Store UIs rely on this for idempotent
    /// retries.
    pub fn next(self, action: OrderAction) -> Option<OrderState> {
        match (self, action) {
            (OrderState::Pending, OrderAction::Accept) => Some(OrderState::Accepted),
            (OrderState::Pending, OrderAction::Reject) => Some(OrderState::Rejected),
            (OrderState::Pending, OrderAction::Cancel) => Some(OrderState::Canceled),
            (OrderState::Accepted, OrderAction::Sending) => Some(OrderState::Sending),
            (OrderState::Sending, OrderAction::Finished) => Some(OrderState::Finished),
            _ => None,
        }
    }

    /// Whether the action releases reserved stock back to the store.
    pub fn restocks(action: OrderAction) -> bool {
        matches!(action, OrderAction::Reject | OrderAction::Cancel)
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderState::Rejected
                | OrderState::Canceled
                | OrderState::Finished
                | OrderState::Returned
        )
    }
}

/// Wire names, as accepted by the `status` filter key.
impl std::str::FromStr for OrderState {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(OrderState::Pending),
            "accepted" => Ok(OrderState::Accepted),
            "rejected" => Ok(OrderState::Rejected),
            "canceled" => Ok(OrderState::Canceled),
            "sending" => Ok(OrderState::Sending),
            "finished" => Ok(OrderState::Finished),
            "returned" => Ok(OrderState::Returned),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_ACTIONS: [OrderAction; 5] = [
        OrderAction::Accept,
        OrderAction::Reject,
        OrderAction::Cancel,
        OrderAction::Sending,
        OrderAction::Finished,
    ];

    #[test]
    fn pending_fans_out() {
        assert_eq!(
            OrderState::Pending.next(OrderAction::Accept),
            Some(OrderState::Accepted)
        );
        assert_eq!(
            OrderState::Pending.next(OrderAction::Reject),
            Some(OrderState::Rejected)
        );
        assert_eq!(
            OrderState::Pending.next(OrderAction::Cancel),
            Some(OrderState::Canceled)
        );
    }

    #[test]
    fn happy_path_runs_to_finished() {
        let accepted = OrderState::Pending.next(OrderAction::Accept).unwrap();
        let sending = accepted.next(OrderAction::Sending).unwrap();
        let finished = sending.next(OrderAction::Finished).unwrap();
        assert_eq!(finished, OrderState::Finished);
        assert!(finished.is_terminal());
    }

    #[test]
    fn terminal_states_absorb_everything() {
        for state in [
            OrderState::Rejected,
            OrderState::Canceled,
            OrderState::Finished,
            OrderState::Returned,
        ] {
            for action in ALL_ACTIONS {
                assert_eq!(state.next(action), None);
            }
        }
    }

    #[test]
    fn no_transition_reaches_returned() {
        for state in [
            OrderState::Pending,
            OrderState::Accepted,
            OrderState::Sending,
        ] {
            for action in ALL_ACTIONS {
                assert_ne!(state.next(action), Some(OrderState::Returned));
            }
        }
    }

    #[test]
    fn states_parse_from_their_wire_names() {
        assert_eq!("pending".parse(), Ok(OrderState::Pending));
        assert_eq!("finished".parse(), Ok(OrderState::Finished));
        assert_eq!("returned".parse(), Ok(OrderState::Returned));
        assert_eq!("bogus".parse::<OrderState>(), Err(()));
    }

    #[test]
    fn only_reject_and_cancel_restock() {
        assert!(OrderState::restocks(OrderAction::Reject));
        assert!(OrderState::restocks(OrderAction::Cancel));
        assert!(!OrderState::restocks(OrderAction::Accept));
        assert!(!OrderState::restocks(OrderAction::Sending));
        assert!(!OrderState::restocks(OrderAction::Finished));
    }
}
