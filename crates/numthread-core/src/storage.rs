use crate::{
    Author, Discussion, DiscussionId, DiscussionStore, NewOperation, NumthreadError, Operation,
    OperationId, Result, User, UserId,
};
use chrono::Utc;
use dashmap::{mapref::entry::Entry, DashMap};
use parking_lot::RwLock;
use tracing::debug;

/// Memory-resident store. Everything is lost when the process exits.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<Vec<User>>,
    usernames: DashMap<String, UserId>,
    discussions: RwLock<Vec<Discussion>>,
    operations: RwLock<Vec<Operation>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_count(&self) -> usize {
        self.users.read().len()
    }

    pub fn discussion_count(&self) -> usize {
        self.discussions.read().len()
    }

    pub fn operation_count(&self) -> usize {
        self.operations.read().len()
    }
}

impl DiscussionStore for MemoryStore {
    fn create_user(&self, username: String, password_hash: String) -> Result<User> {
        match self.usernames.entry(username.clone()) {
            Entry::Occupied(_) => Err(NumthreadError::UsernameTaken),
            Entry::Vacant(slot) => {
                let user = User::new(username, password_hash);
                slot.insert(user.id);
                self.users.write().push(user.clone());
                debug!(user_id = %user.id, "stored user");
                Ok(user)
            }
        }
    }

    fn find_user_by_username(&self, username: &str) -> Option<User> {
        let id = *self.usernames.get(username)?;
        self.find_user_by_id(id)
    }

    fn find_user_by_id(&self, id: UserId) -> Option<User> {
        self.users.read().iter().find(|user| user.id == id).cloned()
    }

    fn create_discussion(&self, starting_number: f64, author: &Author) -> Discussion {
        let discussion = Discussion::new(starting_number, author);
        self.discussions.write().push(discussion.clone());
        debug!(discussion_id = %discussion.id, "stored discussion");
        discussion
    }

    fn find_discussion(&self, id: DiscussionId) -> Option<Discussion> {
        self.discussions
            .read()
            .iter()
            .find(|discussion| discussion.id == id)
            .cloned()
    }

    fn list_discussions(&self) -> Vec<Discussion> {
        self.discussions.read().clone()
    }

    fn create_operation(&self, new: NewOperation, author: &Author) -> Result<Operation> {
        let starting_number = self
            .find_discussion(new.discussion_id)
            .ok_or(NumthreadError::DiscussionNotFound)?
            .starting_number;

        let mut operations = self.operations.write();

        let left_number = match new.parent_id {
            None => starting_number,
            Some(parent_id) => {
                let parent = operations
                    .iter()
                    .find(|operation| operation.id == parent_id)
                    .ok_or(NumthreadError::ParentNotFound)?;
                if parent.discussion_id != new.discussion_id {
                    return Err(NumthreadError::ParentMismatch);
                }
                parent.result
            }
        };

        let result = new.operation_type.apply(left_number, new.right_number)?;

        let operation = Operation {
            id: OperationId::new_v4(),
            discussion_id: new.discussion_id,
            parent_id: new.parent_id,
            operation_type: new.operation_type,
            right_number: new.right_number,
            left_number,
            result,
            created_by: author.user_id,
            created_by_username: author.username.clone(),
            created_at: Utc::now(),
        };
        operations.push(operation.clone());
        debug!(operation_id = %operation.id, "stored operation");
        Ok(operation)
    }

    fn find_operation(&self, id: OperationId) -> Option<Operation> {
        self.operations
            .read()
            .iter()
            .find(|operation| operation.id == id)
            .cloned()
    }

    fn operations_for_discussion(&self, id: DiscussionId) -> Vec<Operation> {
        self.operations
            .read()
            .iter()
            .filter(|operation| operation.discussion_id == id)
            .cloned()
            .collect()
    }

    fn all_operations(&self) -> Vec<Operation> {
        self.operations.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{tree, OperationType};
    use std::sync::Arc;
    use std::thread;

    fn store_with_author() -> (MemoryStore, Author) {
        let store = MemoryStore::new();
        let user = store
            .create_user("alex".to_string(), "hash".to_string())
            .unwrap();
        (store, Author::from(&user))
    }

    fn reply(
        discussion_id: DiscussionId,
        parent_id: Option<OperationId>,
        operation_type: OperationType,
        right_number: f64,
    ) -> NewOperation {
        NewOperation {
            discussion_id,
            parent_id,
            operation_type,
            right_number,
        }
    }

    #[test]
    fn usernames_are_unique_and_case_sensitive() {
        let (store, _) = store_with_author();

        assert!(matches!(
            store.create_user("alex".into(), "other".into()),
            Err(NumthreadError::UsernameTaken)
        ));
        assert!(store.create_user("Alex".into(), "other".into()).is_ok());
        assert_eq!(store.user_count(), 2);
    }

    #[test]
    fn users_are_found_by_name_and_id() {
        let (store, author) = store_with_author();

        let by_name = store.find_user_by_username("alex").unwrap();
        assert_eq!(by_name.id, author.user_id);
        assert_eq!(store.find_user_by_id(author.user_id).unwrap().username, "alex");
        assert!(store.find_user_by_username("nobody").is_none());
        assert!(store.find_user_by_id(UserId::new_v4()).is_none());
    }

    #[test]
    fn operations_chain_from_starting_number() {
        let (store, author) = store_with_author();
        let discussion = store.create_discussion(10.0, &author);

        let first = store
            .create_operation(reply(discussion.id, None, OperationType::Add, 5.0), &author)
            .unwrap();
        assert_eq!(first.left_number, 10.0);
        assert_eq!(first.result, 15.0);

        let second = store
            .create_operation(
                reply(discussion.id, Some(first.id), OperationType::Multiply, 2.0),
                &author,
            )
            .unwrap();
        assert_eq!(second.left_number, 15.0);
        assert_eq!(second.result, 30.0);

        let third = store
            .create_operation(reply(discussion.id, None, OperationType::Divide, 2.0), &author)
            .unwrap();
        assert_eq!(third.result, 5.0);
        assert_eq!(third.created_by_username, "alex");

        let stored = store.operations_for_discussion(discussion.id);
        let replayed = tree::replay(discussion.starting_number, &stored).unwrap();
        let results: Vec<f64> = replayed.into_iter().map(|(_, value)| value).collect();
        assert_eq!(results, vec![15.0, 30.0, 5.0]);
    }

    #[test]
    fn unknown_discussion_and_parent_are_rejected() {
        let (store, author) = store_with_author();
        let discussion = store.create_discussion(1.0, &author);

        assert!(matches!(
            store.create_operation(
                reply(DiscussionId::new_v4(), None, OperationType::Add, 1.0),
                &author
            ),
            Err(NumthreadError::DiscussionNotFound)
        ));
        assert!(matches!(
            store.create_operation(
                reply(discussion.id, Some(OperationId::new_v4()), OperationType::Add, 1.0),
                &author
            ),
            Err(NumthreadError::ParentNotFound)
        ));
        assert_eq!(store.operation_count(), 0);
    }

    #[test]
    fn parent_must_belong_to_the_same_discussion() {
        let (store, author) = store_with_author();
        let first = store.create_discussion(1.0, &author);
        let second = store.create_discussion(2.0, &author);
        let op = store
            .create_operation(reply(first.id, None, OperationType::Add, 1.0), &author)
            .unwrap();

        assert!(matches!(
            store.create_operation(
                reply(second.id, Some(op.id), OperationType::Add, 1.0),
                &author
            ),
            Err(NumthreadError::ParentMismatch)
        ));
    }

    #[test]
    fn division_by_zero_stores_nothing() {
        let (store, author) = store_with_author();
        let discussion = store.create_discussion(1.0, &author);

        assert!(matches!(
            store.create_operation(reply(discussion.id, None, OperationType::Divide, 0.0), &author),
            Err(NumthreadError::DivisionByZero)
        ));
        assert!(store.operations_for_discussion(discussion.id).is_empty());
    }

    #[test]
    fn discussions_are_listed_newest_first_with_trees() {
        let (store, author) = store_with_author();
        let older = store.create_discussion(1.0, &author);
        thread::sleep(std::time::Duration::from_millis(5));
        let newer = store.create_discussion(2.0, &author);

        let op = store
            .create_operation(reply(older.id, None, OperationType::Add, 1.0), &author)
            .unwrap();
        store
            .create_operation(reply(older.id, Some(op.id), OperationType::Add, 1.0), &author)
            .unwrap();

        let all = store.all_discussions_with_operations();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].discussion.id, newer.id);
        assert!(all[0].operations.is_empty());
        assert_eq!(all[1].discussion.id, older.id);
        assert_eq!(all[1].operations.len(), 1);
        assert_eq!(all[1].operations[0].children[0].operation.result, 3.0);

        let single = store.discussion_with_operations(older.id).unwrap();
        assert_eq!(single, all[1]);
        assert!(store.discussion_with_operations(DiscussionId::new_v4()).is_none());
    }

    #[test]
    fn concurrent_registration_admits_one_user() {
        let store = Arc::new(MemoryStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.create_user("race".into(), "hash".into()).is_ok())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(store.user_count(), 1);
    }
}
