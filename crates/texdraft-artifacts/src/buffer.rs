//! Editable document buffer and the host view contract
//!
//! Every change reaching a buffer is an [`EditTransaction`] tagged with its
//! [`Provenance`]: `Local` for edits the user typed, `Remote` for content
//! pushed from a generation run.

use serde::{Deserialize, Serialize};
use std::fmt;
use texdraft_common::{Result, TexdraftError};

/// Whether a generation run is currently pushing content into the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Streaming,
    Idle,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Streaming => write!(f, "streaming"),
            RunStatus::Idle => write!(f, "idle"),
        }
    }
}

/// Origin of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provenance {
    /// Typed by the user in the view
    Local,
    /// Pushed programmatically from a delta event
    Remote,
}

/// Replace the byte range `from..to` with `insert`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub from: usize,
    pub to: usize,
    pub insert: String,
}

impl Change {
    pub fn replace(from: usize, to: usize, insert: impl Into<String>) -> Self {
        Self {
            from,
            to,
            insert: insert.into(),
        }
    }

    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self::replace(at, at, text)
    }

    pub fn delete(from: usize, to: usize) -> Self {
        Self::replace(from, to, "")
    }

    pub fn is_empty(&self) -> bool {
        self.from == self.to && self.insert.is_empty()
    }
}

/// A unit of change to a buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditTransaction {
    pub provenance: Provenance,
    pub change: Change,
}

impl EditTransaction {
    pub fn local(change: Change) -> Self {
        Self {
            provenance: Provenance::Local,
            change,
        }
    }

    pub fn remote(change: Change) -> Self {
        Self {
            provenance: Provenance::Remote,
            change,
        }
    }
}

/// What update listeners see after each transaction
#[derive(Debug, Clone)]
pub struct ViewUpdate {
    pub doc_changed: bool,
    pub provenance: Provenance,
    /// Buffer version after the transaction
    pub version: u64,
    /// Full document text after the transaction
    pub text: String,
}

pub type UpdateListener = Box<dyn FnMut(&ViewUpdate)>;

/// A mountable text-editing surface supplied by the host
pub trait EditableView {
    /// Create the surface holding `initial` as its document
    fn create(initial: &str) -> Self
    where
        Self: Sized;

    fn text(&self) -> &str;

    /// Apply a transaction and notify every update listener
    fn dispatch(&mut self, transaction: EditTransaction) -> Result<()>;

    fn add_update_listener(&mut self, listener: UpdateListener);

    /// Release the document and all listeners. Later dispatches fail.
    fn destroy(&mut self);

    fn is_destroyed(&self) -> bool;
}

/// In-memory buffer implementing the view contract, for headless hosts
pub struct DocumentBuffer {
    text: String,
    version: u64,
    transactions: u64,
    listeners: Vec<UpdateListener>,
    destroyed: bool,
}

impl DocumentBuffer {
    pub fn new(initial: &str) -> Self {
        Self {
            text: initial.to_string(),
            version: 0,
            transactions: 0,
            listeners: Vec::new(),
            destroyed: false,
        }
    }

    /// Advances on every transaction that changed the document
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of transactions dispatched so far
    pub fn transaction_count(&self) -> u64 {
        self.transactions
    }

    fn check_range(&self, change: &Change) -> Result<()> {
        let Change { from, to, .. } = *change;
        if from > to || to > self.text.len() {
            return Err(TexdraftError::Edit(format!(
                "range {}..{} outside document of {} bytes",
                from,
                to,
                self.text.len()
            )));
        }
        if !self.text.is_char_boundary(from) || !self.text.is_char_boundary(to) {
            return Err(TexdraftError::Edit(format!(
                "range {}..{} splits a character",
                from, to
            )));
        }
        Ok(())
    }
}

impl EditableView for DocumentBuffer {
    fn create(initial: &str) -> Self {
        Self::new(initial)
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn dispatch(&mut self, transaction: EditTransaction) -> Result<()> {
        if self.destroyed {
            return Err(TexdraftError::Edit("buffer has been destroyed".to_string()));
        }
        self.check_range(&transaction.change)?;

        let EditTransaction { provenance, change } = transaction;
        let doc_changed = !change.is_empty();
        if doc_changed {
            self.text.replace_range(change.from..change.to, &change.insert);
            self.version += 1;
        }
        self.transactions += 1;

        let update = ViewUpdate {
            doc_changed,
            provenance,
            version: self.version,
            text: self.text.clone(),
        };
        for listener in self.listeners.iter_mut() {
            listener(&update);
        }
        Ok(())
    }

    fn add_update_listener(&mut self, listener: UpdateListener) {
        self.listeners.push(listener);
    }

    fn destroy(&mut self) {
        self.destroyed = true;
        self.listeners.clear();
        self.text.clear();
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_dispatch_applies_change_and_notifies() {
        let mut buffer = DocumentBuffer::new("hello world");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_by_listener = seen.clone();
        buffer.add_update_listener(Box::new(move |update: &ViewUpdate| {
            seen_by_listener
                .borrow_mut()
                .push((update.provenance, update.text.clone()));
        }));

        buffer
            .dispatch(EditTransaction::local(Change::replace(6, 11, "there")))
            .unwrap();
        buffer
            .dispatch(EditTransaction::remote(Change::insert(0, ">> ")))
            .unwrap();

        assert_eq!(buffer.text(), ">> hello there");
        assert_eq!(buffer.version(), 2);
        assert_eq!(
            *seen.borrow(),
            vec![
                (Provenance::Local, "hello there".to_string()),
                (Provenance::Remote, ">> hello there".to_string()),
            ]
        );
    }

    #[test]
    fn test_empty_change_does_not_advance_version() {
        let mut buffer = DocumentBuffer::new("abc");
        buffer
            .dispatch(EditTransaction::local(Change::insert(1, "")))
            .unwrap();
        assert_eq!(buffer.version(), 0);
        assert_eq!(buffer.transaction_count(), 1);
    }

    #[test]
    fn test_invalid_ranges_rejected() {
        let mut buffer = DocumentBuffer::new("é");
        assert!(matches!(
            buffer.dispatch(EditTransaction::local(Change::delete(0, 5))),
            Err(TexdraftError::Edit(_))
        ));
        assert!(buffer
            .dispatch(EditTransaction::local(Change::delete(1, 2)))
            .is_err());
        assert!(buffer
            .dispatch(EditTransaction::local(Change::delete(2, 1)))
            .is_err());
        assert_eq!(buffer.transaction_count(), 0);
    }

    #[test]
    fn test_destroyed_buffer_is_inert() {
        let mut buffer = DocumentBuffer::new("abc");
        buffer.destroy();
        assert!(buffer.is_destroyed());
        assert!(buffer
            .dispatch(EditTransaction::remote(Change::insert(0, "x")))
            .is_err());
        assert_eq!(buffer.text(), "");
    }
}
