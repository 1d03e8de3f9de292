use crate::models::Comment;

pub fn sync(comments: &mut Vec<Comment>, snapshot: Vec<Comment>) -> bool {
    if *comments == snapshot {
        return false;
    }
    *comments = snapshot;
    true
}

/// Appends without checking the id, a redelivered add shows up twice
pub fn add(comments: &mut Vec<Comment>, comment: Comment) -> bool {
    comments.push(comment);
    true
}

pub fn update(comments: &mut Vec<Comment>, comment: &Comment) -> bool {
    let mut changed = false;
    for existing in comments.iter_mut().filter(|c| c.id == comment.id) {
        if existing != comment {
            *existing = comment.clone();
            changed = true;
        }
    }
    changed
}

pub fn delete(comments: &mut Vec<Comment>, id: &str) -> bool {
    let before = comments.len();
    comments.retain(|c| c.id != id);
    comments.len() != before
}
