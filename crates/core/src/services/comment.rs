//! Comment service and thread assembly.
//!
//! Comments are stored flat with an optional parent pointer. Reads load the
//! event's comments oldest first and fold them into a forest with
//! [`build_comment_tree`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use eventhub_common::{AppError, AppResult, IdGenerator};
use eventhub_db::{
    entities::comment,
    map_db_err,
    repositories::{
        CommentRepository, CommentVotes, EventRepository, UserRepository, counts::count_of,
        vote_ledger,
    },
};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, Set, TransactionTrait, prelude::DateTimeWithTimeZone,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::event::{VoteInput, VoteResult};
use super::user::MemberView;

/// Input for posting a comment.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PostCommentInput {
    #[validate(length(min = 1))]
    pub user_id: String,

    #[validate(length(max = 10000))]
    pub content: String,

    /// Comment being replied to; must belong to the same event.
    pub parent_id: Option<String>,
}

/// One stored comment with its author and upvote total.
#[derive(Debug, Clone)]
pub struct CommentRecord {
    pub comment: comment::Model,
    pub author: Option<MemberView>,
    pub upvotes: u64,
}

/// A comment with its replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentNode {
    pub id: String,
    pub parent_id: Option<String>,
    pub content: String,
    pub created_at: DateTimeWithTimeZone,
    pub upvotes: u64,
    pub user: Option<MemberView>,
    pub replies: Vec<CommentNode>,
}

impl From<CommentRecord> for CommentNode {
    fn from(record: CommentRecord) -> Self {
        Self {
            id: record.comment.id,
            parent_id: record.comment.parent_id,
            content: record.comment.content,
            created_at: record.comment.created_at,
            upvotes: record.upvotes,
            user: record.author,
            replies: Vec::new(),
        }
    }
}

/// Fold a chronologically ordered comment list into a forest.
///
/// A record attaches to its parent when the parent appears earlier in the
/// list. Anything else becomes a root: no parent, or a parent id that does
/// not resolve within the set (the latter is logged). Siblings keep input
/// order and every record yields exactly one node.
#[must_use]
pub fn build_comment_tree(records: Vec<CommentRecord>) -> Vec<CommentNode> {
    let index: HashMap<&str, usize> = records
        .iter()
        .enumerate()
        .map(|(i, r)| (r.comment.id.as_str(), i))
        .collect();

    let parents: Vec<Option<usize>> = records
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let parent_id = r.comment.parent_id.as_deref()?;
            match index.get(parent_id) {
                Some(&p) if p < i => Some(p),
                _ => {
                    tracing::warn!(
                        comment_id = %r.comment.id,
                        parent_id = %parent_id,
                        "Comment parent not in thread, treating as root"
                    );
                    None
                }
            }
        })
        .collect();

    let mut slots: Vec<Option<CommentNode>> = records
        .into_iter()
        .map(|r| Some(CommentNode::from(r)))
        .collect();
    let mut roots = Vec::new();

    // Parents precede children, so walking backwards completes every subtree
    // before it is moved into its parent.
    for (i, parent) in parents.iter().enumerate().rev() {
        let Some(mut node) = slots[i].take() else {
            continue;
        };
        node.replies.reverse();

        let parent_node = match *parent {
            Some(p) => slots[p].as_mut(),
            None => None,
        };
        match parent_node {
            Some(parent_node) => parent_node.replies.push(node),
            None => roots.push(node),
        }
    }

    roots.reverse();
    roots
}

/// Load an event's comments with authors and upvotes, oldest first.
pub(crate) async fn load_records<C: ConnectionTrait>(
    conn: &C,
    event_id: &str,
) -> AppResult<Vec<CommentRecord>> {
    let comment_repo = CommentRepository::new();
    let comments = comment_repo.find_by_event(conn, event_id).await?;
    if comments.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<String> = comments.iter().map(|c| c.id.clone()).collect();
    let mut author_ids: Vec<String> = comments.iter().map(|c| c.user_id.clone()).collect();
    author_ids.sort_unstable();
    author_ids.dedup();

    let upvotes = comment_repo.upvote_counts(conn, &ids).await?;
    let authors = UserRepository::new().find_by_ids(conn, &author_ids).await?;

    Ok(comments
        .into_iter()
        .map(|c| CommentRecord {
            upvotes: count_of(&upvotes, &c.id),
            author: authors.get(&c.user_id).cloned().map(MemberView::from),
            comment: c,
        })
        .collect())
}

/// Comment service for business logic.
#[derive(Clone)]
pub struct CommentService {
    db: Arc<DatabaseConnection>,
    comment_repo: CommentRepository,
    event_repo: EventRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            comment_repo: CommentRepository::new(),
            event_repo: EventRepository::new(),
            user_repo: UserRepository::new(),
            id_gen: IdGenerator::new(),
        }
    }

    /// The event's discussion as a forest.
    pub async fn list(&self, event_id: &str) -> AppResult<Vec<CommentNode>> {
        let conn = self.db.as_ref();
        self.event_repo.get_by_id(conn, event_id).await?;
        let records = load_records(conn, event_id).await?;
        Ok(build_comment_tree(records))
    }

    /// Post a comment, optionally as a reply. Returns the new leaf node.
    pub async fn post(&self, event_id: &str, input: PostCommentInput) -> AppResult<CommentNode> {
        input.validate()?;

        let content = input.content.trim();
        if content.is_empty() {
            return Err(AppError::Validation("content cannot be empty".to_string()));
        }

        let txn = self.db.begin().await.map_err(map_db_err)?;

        self.event_repo.get_by_id(&txn, event_id).await?;
        let author = self.user_repo.get_by_id(&txn, &input.user_id).await?;
        if let Some(parent_id) = input.parent_id.as_deref() {
            self.comment_repo
                .get_in_event(&txn, event_id, parent_id)
                .await?;
        }

        let created = self
            .comment_repo
            .create(
                &txn,
                comment::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    event_id: Set(event_id.to_string()),
                    parent_id: Set(input.parent_id.clone()),
                    user_id: Set(author.id.clone()),
                    content: Set(content.to_string()),
                    created_at: Set(Utc::now().into()),
                },
            )
            .await?;

        txn.commit().await.map_err(map_db_err)?;

        tracing::info!(
            comment_id = %created.id,
            event_id = %event_id,
            reply = created.parent_id.is_some(),
            "Comment posted"
        );

        Ok(CommentNode::from(CommentRecord {
            comment: created,
            author: Some(author.into()),
            upvotes: 0,
        }))
    }

    /// Toggle the member's upvote on a comment.
    pub async fn toggle_vote(&self, comment_id: &str, input: VoteInput) -> AppResult<VoteResult> {
        input.validate()?;

        let txn = self.db.begin().await.map_err(map_db_err)?;

        self.comment_repo.get_by_id(&txn, comment_id).await?;
        self.user_repo.get_by_id(&txn, &input.user_id).await?;

        let toggled = vote_ledger::toggle(
            &CommentVotes,
            &txn,
            &self.id_gen,
            comment_id,
            &input.user_id,
        )
        .await?;

        txn.commit().await.map_err(map_db_err)?;

        Ok(toggled.into())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;
    use eventhub_db::entities::{
        event::{self, EventCategory, EventKind, EventStatus},
        user,
    };
    use sea_orm::{DatabaseBackend, MockDatabase, Value};

    fn record(id: &str, parent: Option<&str>, offset_secs: i64) -> CommentRecord {
        CommentRecord {
            comment: comment::Model {
                id: id.to_string(),
                event_id: "event1".to_string(),
                parent_id: parent.map(ToString::to_string),
                user_id: "m1".to_string(),
                content: format!("comment {id}"),
                created_at: (Utc::now() + Duration::seconds(offset_secs)).into(),
            },
            author: None,
            upvotes: 0,
        }
    }

    fn count_nodes(nodes: &[CommentNode]) -> usize {
        nodes.iter().map(|n| 1 + count_nodes(&n.replies)).sum()
    }

    fn ids(nodes: &[CommentNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.id.as_str()).collect()
    }

    #[test]
    fn test_reply_nests_under_parent() {
        let tree = build_comment_tree(vec![record("c1", None, 0), record("c2", Some("c1"), 1)]);

        assert_eq!(ids(&tree), ["c1"]);
        assert_eq!(ids(&tree[0].replies), ["c2"]);
        assert!(tree[0].replies[0].replies.is_empty());
    }

    #[test]
    fn test_siblings_stay_chronological() {
        let tree = build_comment_tree(vec![
            record("r1", None, 0),
            record("a", Some("r1"), 1),
            record("r2", None, 2),
            record("b", Some("r1"), 3),
            record("a1", Some("a"), 4),
            record("c", Some("r1"), 5),
        ]);

        assert_eq!(ids(&tree), ["r1", "r2"]);
        assert_eq!(ids(&tree[0].replies), ["a", "b", "c"]);
        assert_eq!(ids(&tree[0].replies[0].replies), ["a1"]);
        assert_eq!(count_nodes(&tree), 6);
    }

    #[test]
    fn test_deep_chain() {
        let mut records = vec![record("n0", None, 0)];
        for i in 1..200 {
            records.push(record(
                &format!("n{i}"),
                Some(&format!("n{}", i - 1)),
                i64::from(i),
            ));
        }

        let tree = build_comment_tree(records);

        assert_eq!(tree.len(), 1);
        assert_eq!(count_nodes(&tree), 200);
    }

    #[test]
    fn test_unresolvable_parent_becomes_root() {
        // Parent from another event, or otherwise missing from the set.
        let tree = build_comment_tree(vec![
            record("c1", None, 0),
            record("orphan", Some("elsewhere"), 1),
        ]);

        assert_eq!(ids(&tree), ["c1", "orphan"]);
        assert_eq!(tree[1].parent_id.as_deref(), Some("elsewhere"));
        assert_eq!(count_nodes(&tree), 2);
    }

    #[test]
    fn test_parent_later_in_list_is_not_followed() {
        let tree = build_comment_tree(vec![
            record("early", Some("late"), 0),
            record("late", Some("early"), 1),
        ]);

        // "early" cannot hang off a later record; "late" attaches to it.
        assert_eq!(ids(&tree), ["early"]);
        assert_eq!(ids(&tree[0].replies), ["late"]);
        assert_eq!(count_nodes(&tree), 2);
    }

    #[test]
    fn test_self_parent_is_a_root() {
        let tree = build_comment_tree(vec![record("loop", Some("loop"), 0)]);
        assert_eq!(ids(&tree), ["loop"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(build_comment_tree(Vec::new()).is_empty());
    }

    fn test_event() -> event::Model {
        event::Model {
            id: "event1".to_string(),
            title: "Ramen crawl".to_string(),
            description: None,
            kind: EventKind::Discussion,
            status: EventStatus::Open,
            category: EventCategory::Food,
            creator_id: "m1".to_string(),
            created_at: Utc::now().into(),
            finalized_at: None,
            final_date: None,
            final_location: None,
            final_details: None,
        }
    }

    fn test_user() -> user::Model {
        user::Model {
            id: "m1".to_string(),
            name: "Member".to_string(),
            email: "m1@example.com".to_string(),
            avatar_url: None,
            created_at: Utc::now().into(),
        }
    }

    fn post_input(content: &str, parent: Option<&str>) -> PostCommentInput {
        PostCommentInput {
            user_id: "m1".to_string(),
            content: content.to_string(),
            parent_id: parent.map(ToString::to_string),
        }
    }

    #[tokio::test]
    async fn test_post_blank_content_is_rejected() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = CommentService::new(db);

        let result = service.post("event1", post_input(" \n\t ", None)).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_post_reply_to_foreign_parent_is_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_event()]])
                .append_query_results([[test_user()]])
                .append_query_results([Vec::<comment::Model>::new()])
                .into_connection(),
        );
        let service = CommentService::new(db);

        let result = service
            .post("event1", post_input("me too", Some("other_event_comment")))
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_post_returns_trimmed_leaf() {
        let stored = record("c1", None, 0).comment;
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_event()]])
                .append_query_results([[test_user()]])
                .append_query_results([[comment::Model {
                    content: "see you there".to_string(),
                    ..stored
                }]])
                .into_connection(),
        );
        let service = CommentService::new(db.clone());

        let node = service
            .post("event1", post_input("  see you there  ", None))
            .await
            .unwrap();

        assert_eq!(node.content, "see you there");
        assert_eq!(node.upvotes, 0);
        assert!(node.replies.is_empty());
        assert_eq!(node.user.map(|u| u.id).as_deref(), Some("m1"));

        drop(service);
        let log = format!("{:?}", Arc::try_unwrap(db).ok().unwrap().into_transaction_log());
        assert!(log.contains("see you there"));
        assert!(!log.contains("  see you there  "));
    }

    #[tokio::test]
    async fn test_list_unknown_event() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<event::Model>::new()])
                .into_connection(),
        );
        let service = CommentService::new(db);

        assert!(matches!(
            service.list("ghost").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_attaches_upvotes_and_authors() {
        let root = record("c1", None, 0).comment;
        let reply = record("c2", Some("c1"), 1).comment;

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_event()]])
                .append_query_results([[root, reply]])
                .append_query_results([[maplit::btreemap! {
                    "key" => Value::from("c2"),
                    "count" => Value::BigInt(Some(3)),
                }]])
                .append_query_results([[test_user()]])
                .into_connection(),
        );
        let service = CommentService::new(db);

        let tree = service.list("event1").await.unwrap();

        assert_eq!(ids(&tree), ["c1"]);
        assert_eq!(tree[0].upvotes, 0);
        assert_eq!(tree[0].user.as_ref().map(|u| u.id.as_str()), Some("m1"));
        assert_eq!(ids(&tree[0].replies), ["c2"]);
        assert_eq!(tree[0].replies[0].upvotes, 3);
    }
}
