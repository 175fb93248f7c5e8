use crate::models::Document;

/// Decide whether a caller may edit a document
///
/// Anonymous callers never get the edit right. Otherwise the caller must be
/// the document owner or a member of its collaborator set. Pure function,
/// no I/O — evaluated once per session at attach time.
pub fn can_edit(caller_id: Option<&str>, document: &Document) -> bool {
    let Some(caller) = caller_id else {
        return false;
    };

    if document.owner.as_deref() == Some(caller) {
        return true;
    }

    document.collaborators.iter().any(|c| c == caller)
}
