/// Everything a session learns when it attaches to a document
#[derive(Debug, Clone)]
pub struct Attachment {
    pub document_id: String,
    /// Computed once at attach time and reported to the client; not
    /// re-checked on individual edits
    pub can_edit: bool,
    pub document_name: String,
}

/// Relay session state machine
///
/// A session starts `Connected`, moves to `Attached` on a successful
/// initiate (at most once), and ends `Closed` on disconnect. Signals that
/// arrive in the wrong state are ignored rather than answered.
#[derive(Debug)]
pub enum SessionState {
    Connected,
    Attached(Attachment),
    Closed,
}

/// One live connection's session
#[derive(Debug)]
pub struct Session {
    /// Unique per-connection id, used to suppress broadcast echo
    pub connection_id: String,
    pub state: SessionState,
}

impl Session {
    pub fn new(connection_id: String) -> Self {
        Self {
            connection_id,
            state: SessionState::Connected,
        }
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        match &self.state {
            SessionState::Attached(att) => Some(att),
            _ => None,
        }
    }

    pub fn is_attached(&self) -> bool {
        matches!(self.state, SessionState::Attached(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_session_is_unattached() {
        let session = Session::new("conn-1".to_string());
        assert!(!session.is_attached());
        assert!(session.attachment().is_none());
    }

    #[test]
    fn attached_session_exposes_its_attachment() {
        let mut session = Session::new("conn-1".to_string());
        session.state = SessionState::Attached(Attachment {
            document_id: "doc1".to_string(),
            can_edit: true,
            document_name: "My Doc".to_string(),
        });
        let att = session.attachment().unwrap();
        assert_eq!(att.document_id, "doc1");
        assert!(att.can_edit);
    }
}
