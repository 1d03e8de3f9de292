use crate::models::Comment;
use crate::reconcile::Document;

/// The text widget the room is rendered into
pub trait EditorWidget {
    fn value(&self) -> String;
    fn set_value(&mut self, value: &str);
    /// Select lines `start..=end` (1-based) and bring them into view
    fn select_lines(&mut self, start: u32, end: u32);
}

/// Lines currently selected in the editor, 1-based and inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSelection {
    pub start: u32,
    pub end: u32,
}

impl LineSelection {
    pub fn new(start: u32, end: u32) -> Self {
        Self {
            start: start.min(end),
            end: start.max(end),
        }
    }

    /// Anchor for a new comment: the first line, plus a `start-end` range when
    /// more than one line is selected
    pub fn anchor(&self) -> (u32, Option<String>) {
        if self.start == self.end {
            (self.start, None)
        } else {
            (self.start, Some(format!("{}-{}", self.start, self.end)))
        }
    }
}

/// Push the document into the widget. Leaves the widget alone when it already
/// shows this content so the cursor is kept.
pub fn sync_editor<E: EditorWidget + ?Sized>(editor: &mut E, document: &Document) -> bool {
    if editor.value() == document.content {
        return false;
    }
    editor.set_value(&document.content);
    true
}

pub fn activate_comment<E: EditorWidget + ?Sized>(editor: &mut E, comment: &Comment) {
    if let Some((start, end)) = comment.selection() {
        editor.select_lines(start, end);
    }
}
