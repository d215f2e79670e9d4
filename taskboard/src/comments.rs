//! Per-task comment list, newest first.

use taskboard_proto::{Comment, CommentId};

/// Comments of one task ordered newest first.
///
/// Built from a fetch with [`CommentList::from_fetched`]; confirmed comments
/// from this client are added with [`CommentList::prepend`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentList {
    comments: Vec<Comment>,
}

impl CommentList {
    /// An empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            comments: Vec::new(),
        }
    }

    /// Builds a list from fetched rows, sorting newest first.
    ///
    /// The sort is stable, so rows sharing a timestamp keep fetch order.
    #[must_use]
    pub fn from_fetched(mut comments: Vec<Comment>) -> Self {
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Self { comments }
    }

    /// Puts a confirmed comment at the head of the list.
    ///
    /// A comment whose id is already present is ignored and `false` is
    /// returned.
    pub fn prepend(&mut self, comment: Comment) -> bool {
        if self.contains(&comment.id) {
            return false;
        }
        self.comments.insert(0, comment);
        true
    }

    /// Whether a comment with this id is in the list.
    #[must_use]
    pub fn contains(&self, id: &CommentId) -> bool {
        self.comments.iter().any(|c| c.id == *id)
    }

    /// The newest comment.
    #[must_use]
    pub fn first(&self) -> Option<&Comment> {
        self.comments.first()
    }

    /// Comments newest first.
    pub fn iter(&self) -> std::slice::Iter<'_, Comment> {
        self.comments.iter()
    }

    /// Comments as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[Comment] {
        &self.comments
    }

    /// Number of comments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.comments.len()
    }

    /// Whether there are no comments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }
}

impl<'a> IntoIterator for &'a CommentList {
    type Item = &'a Comment;
    type IntoIter = std::slice::Iter<'a, Comment>;

    fn into_iter(self) -> Self::IntoIter {
        self.comments.iter()
    }
}
