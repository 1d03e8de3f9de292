/// The shared document text as last observed locally
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub content: String,
}

/// Overwrite the document. Content equal to the local buffer is ignored so the
/// editor's own echo never resets it.
pub fn replace(doc: &mut Document, content: &str) -> bool {
    if doc.content == content {
        return false;
    }
    doc.content = content.to_string();
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echo_is_not_a_change() {
        let mut doc = Document { content: "hello".to_string() };
        assert!(!replace(&mut doc, "hello"));
        assert!(replace(&mut doc, "hello world"));
        assert_eq!(doc.content, "hello world");
    }

    #[test]
    fn remote_content_overwrites_without_merging() {
        let mut doc = Document { content: "local draft".to_string() };
        assert!(replace(&mut doc, ""));
        assert_eq!(doc.content, "");
    }
}
