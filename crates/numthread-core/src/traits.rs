use crate::{
    tree::attach_operations, Author, Discussion, DiscussionId, DiscussionWithOperations,
    NewOperation, Operation, OperationId, Result, User, UserId,
};
use std::collections::HashMap;

/// Record storage for users, discussions and operations.
///
/// Every listing preserves insertion order; tree building relies on it to
/// keep siblings in creation order.
pub trait DiscussionStore: Send + Sync {
    fn create_user(&self, username: String, password_hash: String) -> Result<User>;
    fn find_user_by_username(&self, username: &str) -> Option<User>;
    fn find_user_by_id(&self, id: UserId) -> Option<User>;

    fn create_discussion(&self, starting_number: f64, author: &Author) -> Discussion;
    fn find_discussion(&self, id: DiscussionId) -> Option<Discussion>;
    fn list_discussions(&self) -> Vec<Discussion>;

    /// Resolves the parent value, applies the operation and appends the
    /// record.
    fn create_operation(&self, new: NewOperation, author: &Author) -> Result<Operation>;
    fn find_operation(&self, id: OperationId) -> Option<Operation>;
    fn operations_for_discussion(&self, id: DiscussionId) -> Vec<Operation>;
    fn all_operations(&self) -> Vec<Operation>;

    fn discussion_with_operations(&self, id: DiscussionId) -> Option<DiscussionWithOperations> {
        let discussion = self.find_discussion(id)?;
        let operations = self.operations_for_discussion(id);
        Some(attach_operations(discussion, &operations))
    }

    /// Every discussion with its tree, newest first. Discussions created in
    /// the same instant are ordered by most recent insertion.
    fn all_discussions_with_operations(&self) -> Vec<DiscussionWithOperations> {
        let mut discussions = self.list_discussions();
        discussions.reverse();
        discussions.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut by_discussion: HashMap<DiscussionId, Vec<Operation>> = HashMap::new();
        for operation in self.all_operations() {
            by_discussion
                .entry(operation.discussion_id)
                .or_default()
                .push(operation);
        }

        discussions
            .into_iter()
            .map(|discussion| {
                let operations = by_discussion.remove(&discussion.id).unwrap_or_default();
                attach_operations(discussion, &operations)
            })
            .collect()
    }
}
