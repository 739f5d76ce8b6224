//! Operation trees.
//!
//! Operations are stored flat, each pointing at its parent (`None` for a
//! reply to the starting number). The functions here turn such a list into
//! the nested form served to clients and recompute results along the
//! parent→child edges.

use crate::{
    Discussion, DiscussionWithOperations, NumthreadError, Operation, OperationId, OperationNode,
    Result,
};
use std::collections::{HashMap, HashSet};

/// Builds the subtrees hanging off `parent` (`None` = the starting number).
///
/// Siblings keep the order of `operations`. Operations whose parent is not
/// in the list are unreachable and left out.
pub fn build_operation_tree(
    operations: &[Operation],
    parent: Option<OperationId>,
) -> Vec<OperationNode> {
    let mut by_parent: HashMap<Option<OperationId>, Vec<&Operation>> = HashMap::new();
    for operation in operations {
        by_parent.entry(operation.parent_id).or_default().push(operation);
    }

    let mut visited = HashSet::with_capacity(operations.len());
    build_level(&by_parent, parent, &mut visited)
}

fn build_level(
    by_parent: &HashMap<Option<OperationId>, Vec<&Operation>>,
    parent: Option<OperationId>,
    visited: &mut HashSet<OperationId>,
) -> Vec<OperationNode> {
    let Some(children) = by_parent.get(&parent) else {
        return Vec::new();
    };

    let mut nodes = Vec::with_capacity(children.len());
    for operation in children {
        if !visited.insert(operation.id) {
            continue;
        }
        nodes.push(OperationNode {
            operation: (*operation).clone(),
            children: build_level(by_parent, Some(operation.id), visited),
        });
    }
    nodes
}

pub fn attach_operations(
    discussion: Discussion,
    operations: &[Operation],
) -> DiscussionWithOperations {
    DiscussionWithOperations {
        discussion,
        operations: build_operation_tree(operations, None),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub operation_count: usize,
    /// Replies to the starting number sit at depth 1.
    pub max_depth: usize,
    pub leaf_count: usize,
}

impl TreeStats {
    pub fn of(forest: &[OperationNode]) -> Self {
        let mut stats = TreeStats::default();
        let mut stack: Vec<(&OperationNode, usize)> = forest.iter().map(|n| (n, 1)).collect();

        while let Some((node, depth)) = stack.pop() {
            stats.operation_count += 1;
            stats.max_depth = stats.max_depth.max(depth);
            if node.is_leaf() {
                stats.leaf_count += 1;
            }
            stack.extend(node.children.iter().map(|child| (child, depth + 1)));
        }
        stats
    }
}

/// Recomputes every result from `starting_number`, in input order.
///
/// Parents must precede their children, which holds for any list read back
/// from the store since a parent has to exist before it can be replied to.
pub fn replay(starting_number: f64, operations: &[Operation]) -> Result<Vec<(OperationId, f64)>> {
    let mut values: HashMap<OperationId, f64> = HashMap::with_capacity(operations.len());
    let mut replayed = Vec::with_capacity(operations.len());

    for operation in operations {
        let left = match operation.parent_id {
            None => starting_number,
            Some(parent) => *values.get(&parent).ok_or(NumthreadError::ParentNotFound)?,
        };
        let result = operation
            .operation_type
            .apply(left, operation.right_number)?;
        values.insert(operation.id, result);
        replayed.push((operation.id, result));
    }
    Ok(replayed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Author, OperationType, UserId};
    use chrono::Utc;

    struct Builder {
        discussion: Discussion,
        author: Author,
        operations: Vec<Operation>,
    }

    impl Builder {
        fn new(starting_number: f64) -> Self {
            let author = Author {
                user_id: UserId::new_v4(),
                username: "alex".into(),
            };
            Self {
                discussion: Discussion::new(starting_number, &author),
                author,
                operations: Vec::new(),
            }
        }

        fn reply(&mut self, parent: Option<OperationId>, op: OperationType, right: f64) -> OperationId {
            let left = match parent {
                None => self.discussion.starting_number,
                Some(id) => self.operations.iter().find(|o| o.id == id).unwrap().result,
            };
            let operation = Operation {
                id: OperationId::new_v4(),
                discussion_id: self.discussion.id,
                parent_id: parent,
                operation_type: op,
                right_number: right,
                left_number: left,
                result: op.apply(left, right).unwrap(),
                created_by: self.author.user_id,
                created_by_username: self.author.username.clone(),
                created_at: Utc::now(),
            };
            let id = operation.id;
            self.operations.push(operation);
            id
        }
    }

    #[test]
    fn builds_nested_tree_in_creation_order() {
        let mut b = Builder::new(10.0);
        let plus = b.reply(None, OperationType::Add, 5.0);
        let times = b.reply(Some(plus), OperationType::Multiply, 2.0);
        let half = b.reply(None, OperationType::Divide, 2.0);
        let minus = b.reply(Some(plus), OperationType::Subtract, 1.0);

        let forest = build_operation_tree(&b.operations, None);
        assert_eq!(forest.len(), 2);
        assert_eq!(forest[0].operation.id, plus);
        assert_eq!(forest[1].operation.id, half);
        assert_eq!(forest[1].operation.result, 5.0);

        let children: Vec<_> = forest[0].children.iter().map(|c| c.operation.id).collect();
        assert_eq!(children, vec![times, minus]);
        assert_eq!(forest[0].children[0].operation.result, 30.0);
        assert_eq!(forest[0].children[1].operation.result, 14.0);
    }

    #[test]
    fn children_inherit_parent_result() {
        let mut b = Builder::new(3.0);
        let mut parent = None;
        for _ in 0..5 {
            parent = Some(b.reply(parent, OperationType::Multiply, 2.0));
        }

        let forest = build_operation_tree(&b.operations, None);
        let mut node = &forest[0];
        loop {
            for child in &node.children {
                assert_eq!(child.operation.left_number, node.operation.result);
            }
            match node.children.first() {
                Some(child) => node = child,
                None => break,
            }
        }
        assert_eq!(node.operation.result, 96.0);
    }

    #[test]
    fn subtree_for_a_given_parent() {
        let mut b = Builder::new(1.0);
        let root = b.reply(None, OperationType::Add, 1.0);
        b.reply(Some(root), OperationType::Add, 1.0);
        b.reply(None, OperationType::Add, 2.0);

        let subtree = build_operation_tree(&b.operations, Some(root));
        assert_eq!(subtree.len(), 1);
        assert_eq!(subtree[0].operation.result, 3.0);
    }

    #[test]
    fn orphans_are_unreachable() {
        let mut b = Builder::new(1.0);
        let root = b.reply(None, OperationType::Add, 1.0);
        b.reply(Some(root), OperationType::Add, 1.0);
        b.operations.remove(0);

        assert!(build_operation_tree(&b.operations, None).is_empty());
    }

    #[test]
    fn empty_discussion_has_no_operations() {
        let b = Builder::new(42.0);
        let with_ops = attach_operations(b.discussion.clone(), &b.operations);
        assert!(with_ops.operations.is_empty());
        assert_eq!(TreeStats::of(&with_ops.operations), TreeStats::default());
    }

    #[test]
    fn stats_count_depth_and_leaves() {
        let mut b = Builder::new(10.0);
        let a = b.reply(None, OperationType::Add, 1.0);
        let c = b.reply(Some(a), OperationType::Add, 1.0);
        b.reply(Some(c), OperationType::Add, 1.0);
        b.reply(None, OperationType::Subtract, 1.0);

        let stats = TreeStats::of(&build_operation_tree(&b.operations, None));
        assert_eq!(
            stats,
            TreeStats {
                operation_count: 4,
                max_depth: 3,
                leaf_count: 2,
            }
        );
    }

    #[test]
    fn replay_matches_stored_results() {
        let mut b = Builder::new(7.0);
        let a = b.reply(None, OperationType::Multiply, 3.0);
        let c = b.reply(Some(a), OperationType::Divide, 2.0);
        b.reply(Some(c), OperationType::Subtract, 0.5);
        b.reply(None, OperationType::Add, -7.0);

        let replayed = replay(b.discussion.starting_number, &b.operations).unwrap();
        for (operation, (id, value)) in b.operations.iter().zip(&replayed) {
            assert_eq!(operation.id, *id);
            assert_eq!(operation.result, *value);
        }
    }

    #[test]
    fn replay_propagates_a_new_starting_number() {
        let mut b = Builder::new(2.0);
        let a = b.reply(None, OperationType::Add, 3.0);
        b.reply(Some(a), OperationType::Multiply, 4.0);

        let replayed = replay(10.0, &b.operations).unwrap();
        assert_eq!(replayed[0].1, 13.0);
        assert_eq!(replayed[1].1, 52.0);
    }

    #[test]
    fn replay_fails_on_missing_parent() {
        let mut b = Builder::new(2.0);
        let a = b.reply(None, OperationType::Add, 3.0);
        b.reply(Some(a), OperationType::Multiply, 4.0);
        b.operations.remove(0);

        assert!(matches!(
            replay(2.0, &b.operations),
            Err(NumthreadError::ParentNotFound)
        ));
    }
}
