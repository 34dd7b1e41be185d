//! Revert targets and the A/B shortcuts of three-checkpoint flows.

use serde::{Deserialize, Serialize};

use crate::error::ApprovalError;
use crate::flow::FlowInstance;

/// Named shortcut over the general revert primitive.
///
/// Only offered on flows with exactly three checkpoints (A/B/C) once the third
/// one has been reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevertShortcut {
    ToA,
    ToB,
}

impl RevertShortcut {
    /// Zero-based index of the checkpoint the shortcut keeps.
    fn index(self) -> usize {
        match self {
            RevertShortcut::ToA => 0,
            RevertShortcut::ToB => 1,
        }
    }
}

/// Where a revert lands. Signatures at checkpoints after the resolved
/// checkpoint are invalidated; the checkpoint itself is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RevertTarget {
    Checkpoint(u32),
    /// The checkpoint right before the furthest-reached one.
    Previous,
    Shortcut(RevertShortcut),
}

/// Shortcuts the flow currently offers.
pub fn available_shortcuts(flow: &FlowInstance) -> Vec<RevertShortcut> {
    if flow.is_cancelled() || !has_abc_shape(flow) {
        return Vec::new();
    }
    vec![RevertShortcut::ToA, RevertShortcut::ToB]
}

fn has_abc_shape(flow: &FlowInstance) -> bool {
    let checkpoints = flow.checkpoints();
    checkpoints.len() == 3
        && flow
            .furthest_checkpoint()
            .is_some_and(|c| c.order == checkpoints[2].order)
}

/// Resolve `target` to a checkpoint order strictly before the furthest-reached
/// checkpoint.
pub fn resolve_target(flow: &FlowInstance, target: RevertTarget) -> Result<u32, ApprovalError> {
    let furthest = flow
        .furthest_checkpoint()
        .map(|c| c.order)
        .ok_or_else(|| ApprovalError::InvalidRevertTarget("flow has no checkpoints".into()))?;

    match target {
        RevertTarget::Checkpoint(order) => {
            if flow.checkpoint(order).is_none() {
                return Err(ApprovalError::UnknownCheckpoint(order));
            }
            if order >= furthest {
                return Err(ApprovalError::InvalidRevertTarget(format!(
                    "checkpoint {order} is not before checkpoint {furthest}"
                )));
            }
            Ok(order)
        }
        RevertTarget::Previous => flow
            .checkpoints()
            .iter()
            .map(|c| c.order)
            .filter(|o| *o < furthest)
            .max()
            .ok_or_else(|| {
                ApprovalError::InvalidRevertTarget("already at the first checkpoint".into())
            }),
        RevertTarget::Shortcut(shortcut) => {
            if !has_abc_shape(flow) {
                return Err(ApprovalError::InvalidRevertTarget(
                    "shortcuts are only offered from the third of three checkpoints".into(),
                ));
            }
            Ok(flow.checkpoints()[shortcut.index()].order)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::*;
    use gateflow_core::UserId;

    fn abc_at_c() -> FlowInstance {
        let mut flow = created(abc_template());
        sign(&mut flow, 1, &role_actor(UserId::new(), "economist")).unwrap();
        sign(&mut flow, 2, &role_actor(UserId::new(), "cfp")).unwrap();
        flow
    }

    #[test]
    fn shortcuts_appear_only_once_c_is_reached() {
        let mut flow = created(abc_template());
        assert!(available_shortcuts(&flow).is_empty());

        sign(&mut flow, 1, &role_actor(UserId::new(), "economist")).unwrap();
        assert!(available_shortcuts(&flow).is_empty());
        assert!(matches!(
            resolve_target(&flow, RevertTarget::Shortcut(RevertShortcut::ToA)),
            Err(ApprovalError::InvalidRevertTarget(_))
        ));

        sign(&mut flow, 2, &role_actor(UserId::new(), "cfp")).unwrap();
        assert_eq!(
            available_shortcuts(&flow),
            vec![RevertShortcut::ToA, RevertShortcut::ToB]
        );
        assert_eq!(resolve_target(&flow, RevertTarget::Shortcut(RevertShortcut::ToB)), Ok(2));
    }

    #[test]
    fn shortcuts_need_exactly_three_checkpoints() {
        let member = || role_actor(UserId::new(), "member");

        let mut four = created(chain_template(4));
        for order in 1..=3 {
            sign(&mut four, order, &member()).unwrap();
        }
        assert_eq!(four.furthest_checkpoint().map(|c| c.order), Some(4));
        assert!(available_shortcuts(&four).is_empty());
        assert!(resolve_target(&four, RevertTarget::Shortcut(RevertShortcut::ToA)).is_err());

        let mut two = created(chain_template(2));
        sign(&mut two, 1, &member()).unwrap();
        assert!(available_shortcuts(&two).is_empty());
    }

    #[test]
    fn cancelled_flows_offer_no_shortcuts() {
        let mut flow = abc_at_c();
        cancel(&mut flow, "supplier withdrew").unwrap();
        assert!(available_shortcuts(&flow).is_empty());
    }

    #[test]
    fn targets_must_lie_before_the_furthest_checkpoint() {
        let flow = abc_at_c();

        assert_eq!(resolve_target(&flow, RevertTarget::Previous), Ok(2));
        assert_eq!(resolve_target(&flow, RevertTarget::Checkpoint(1)), Ok(1));
        assert!(matches!(
            resolve_target(&flow, RevertTarget::Checkpoint(3)),
            Err(ApprovalError::InvalidRevertTarget(_))
        ));
        assert_eq!(
            resolve_target(&flow, RevertTarget::Checkpoint(9)),
            Err(ApprovalError::UnknownCheckpoint(9))
        );

        let fresh = created(abc_template());
        assert!(matches!(
            resolve_target(&fresh, RevertTarget::Previous),
            Err(ApprovalError::InvalidRevertTarget(_))
        ));
    }
}
