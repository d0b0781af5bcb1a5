//! Reconciles streamed snapshots with a live editable buffer
//!
//! A [`Reconciler`] binds to one view at a time. Content pushed by a
//! generation run enters the buffer as `Remote` transactions; anything the
//! user types arrives as `Local` transactions. Only local transactions are
//! reported to the save callback, so remote writes never loop back to the
//! document store as if the user had made them.
//!
//! The update listener is subscribed once per mount. Replacing the save
//! callback swaps it in place without touching the view's listeners.

use crate::buffer::{Change, EditTransaction, EditableView, Provenance, RunStatus, ViewUpdate};
use crate::delta::{DeltaEvent, DeltaKind};
use futures_util::{Stream, StreamExt};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use texdraft_common::{ReconcilerConfig, Result};
use tracing::debug;

/// Called with the full document and a debounce request after local edits
pub type SaveCallback = Box<dyn FnMut(&str, bool)>;

/// State shared between the reconciler and the listener it installs
struct ListenerState {
    on_save: RefCell<Option<SaveCallback>>,
    status: Cell<RunStatus>,
    config: ReconcilerConfig,
}

impl ListenerState {
    fn handle_update(&self, update: &ViewUpdate) {
        if !update.doc_changed || update.provenance == Provenance::Remote {
            return;
        }
        if self.status.get() == RunStatus::Streaming && !self.config.persist_during_streaming {
            debug!("Local edit during streaming not persisted");
            return;
        }
        if let Some(on_save) = self.on_save.borrow_mut().as_mut() {
            on_save(&update.text, self.config.debounce_saves);
        }
    }
}

enum Binding<V> {
    Uninitialized,
    Bound(V),
    Unbound,
}

pub struct Reconciler<V: EditableView> {
    kind: DeltaKind,
    binding: Binding<V>,
    shared: Rc<ListenerState>,
}

impl<V: EditableView> Reconciler<V> {
    /// Create an unmounted reconciler for deltas of `kind`
    pub fn new(kind: DeltaKind, config: ReconcilerConfig) -> Self {
        Self {
            kind,
            binding: Binding::Uninitialized,
            shared: Rc::new(ListenerState {
                on_save: RefCell::new(None),
                status: Cell::new(RunStatus::Idle),
                config,
            }),
        }
    }

    /// Create the view from `initial` and bind to it.
    ///
    /// A previously bound view is torn down first.
    pub fn mount(&mut self, initial: &str) {
        if self.is_mounted() {
            self.unmount();
        }

        let mut view = V::create(initial);
        let shared = Rc::clone(&self.shared);
        view.add_update_listener(Box::new(move |update: &ViewUpdate| {
            shared.handle_update(update)
        }));

        self.shared.status.set(RunStatus::Idle);
        self.binding = Binding::Bound(view);
        debug!("Mounted {} view ({} bytes)", self.kind, initial.len());
    }

    /// Release the view, its buffer and its listener
    pub fn unmount(&mut self) {
        if let Binding::Bound(mut view) = std::mem::replace(&mut self.binding, Binding::Unbound) {
            view.destroy();
            debug!("Unmounted {} view", self.kind);
        }
        self.shared.status.set(RunStatus::Idle);
    }

    /// Replace the save callback without re-subscribing the listener
    pub fn set_on_save<F>(&mut self, on_save: F)
    where
        F: FnMut(&str, bool) + 'static,
    {
        *self.shared.on_save.borrow_mut() = Some(Box::new(on_save));
    }

    pub fn is_mounted(&self) -> bool {
        matches!(self.binding, Binding::Bound(_))
    }

    pub fn status(&self) -> RunStatus {
        self.shared.status.get()
    }

    /// Set the run status; the caller signals the end of a run this way
    pub fn set_status(&mut self, status: RunStatus) {
        if self.shared.status.replace(status) != status {
            debug!("{} reconciler now {}", self.kind, status);
        }
    }

    /// Mark the current generation run as finished
    pub fn finish_run(&mut self) {
        self.set_status(RunStatus::Idle);
    }

    pub fn view(&self) -> Option<&V> {
        match &self.binding {
            Binding::Bound(view) => Some(view),
            _ => None,
        }
    }

    /// Mutable access for the host to dispatch local edits
    pub fn view_mut(&mut self) -> Option<&mut V> {
        match &mut self.binding {
            Binding::Bound(view) => Some(view),
            _ => None,
        }
    }

    /// Current document text, if mounted
    pub fn text(&self) -> Option<&str> {
        self.view().map(|view| view.text())
    }

    /// Apply one delta event from the stream.
    ///
    /// The first event of a run switches the reconciler to streaming.
    /// Returns whether the buffer was written.
    pub fn on_stream_part(&mut self, event: &DeltaEvent) -> Result<bool> {
        if event.kind != self.kind {
            return Ok(false);
        }
        if !self.is_mounted() {
            debug!("No bound view, dropping {} delta", event.kind);
            return Ok(false);
        }
        self.set_status(RunStatus::Streaming);
        self.apply_remote(&event.content)
    }

    /// Replace the whole buffer with `content` as a remote transaction.
    ///
    /// While streaming every call writes, even if the content is unchanged.
    /// While idle, content equal to the buffer is a no-op. Empty content is
    /// never applied. Returns whether the buffer was written.
    pub fn apply_remote(&mut self, content: &str) -> Result<bool> {
        let streaming = self.status() == RunStatus::Streaming;
        let Binding::Bound(view) = &mut self.binding else {
            debug!("No bound view, dropping remote content");
            return Ok(false);
        };
        if content.is_empty() {
            return Ok(false);
        }

        let current = view.text();
        if !streaming && current == content {
            return Ok(false);
        }

        let change = Change::replace(0, current.len(), content);
        view.dispatch(EditTransaction::remote(change))?;
        Ok(true)
    }

    /// Apply events in order until the stream ends. Returns how many were written.
    pub async fn apply_stream<S>(&mut self, stream: S) -> Result<usize>
    where
        S: Stream<Item = DeltaEvent>,
    {
        futures_util::pin_mut!(stream);
        let mut applied = 0;
        while let Some(event) = stream.next().await {
            if self.on_stream_part(&event)? {
                applied += 1;
            }
        }
        Ok(applied)
    }
}

impl<V: EditableView> Drop for Reconciler<V> {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{DocumentBuffer, UpdateListener};
    use futures::stream;

    type Saves = Rc<RefCell<Vec<(String, bool)>>>;

    fn mounted(initial: &str) -> (Reconciler<DocumentBuffer>, Saves) {
        mounted_with(initial, ReconcilerConfig::default())
    }

    fn mounted_with(
        initial: &str,
        config: ReconcilerConfig,
    ) -> (Reconciler<DocumentBuffer>, Saves) {
        let mut reconciler = Reconciler::new(DeltaKind::Latex, config);
        reconciler.mount(initial);
        let saves: Saves = Rc::new(RefCell::new(Vec::new()));
        let recorded = saves.clone();
        reconciler.set_on_save(move |content, debounce| {
            recorded.borrow_mut().push((content.to_string(), debounce));
        });
        (reconciler, saves)
    }

    fn type_text(reconciler: &mut Reconciler<DocumentBuffer>, at: usize, text: &str) {
        reconciler
            .view_mut()
            .unwrap()
            .dispatch(EditTransaction::local(Change::insert(at, text)))
            .unwrap();
    }

    fn transactions(reconciler: &Reconciler<DocumentBuffer>) -> u64 {
        reconciler.view().unwrap().transaction_count()
    }

    #[test]
    fn test_buffer_tracks_latest_event() {
        let (mut reconciler, _) = mounted("");
        let events: Vec<DeltaEvent> = ["\\doc", "\\document", "\\document", "\\documentclass{article}"]
            .into_iter()
            .map(DeltaEvent::latex)
            .collect();

        for event in &events {
            assert!(reconciler.on_stream_part(event).unwrap());
            assert_eq!(reconciler.text(), Some(event.content.as_str()));
        }
        assert_eq!(reconciler.status(), RunStatus::Streaming);
        // Streaming writes even the repeated snapshot.
        assert_eq!(transactions(&reconciler), 4);

        reconciler.finish_run();
        assert_eq!(reconciler.status(), RunStatus::Idle);
    }

    #[test]
    fn test_idle_apply_of_same_content_is_noop() {
        let (mut reconciler, _) = mounted("\\section{A}");
        assert!(!reconciler.apply_remote("\\section{A}").unwrap());
        assert_eq!(transactions(&reconciler), 0);
    }

    #[test]
    fn test_identical_idle_deltas_mutate_once() {
        let (mut reconciler, _) = mounted("");
        let event = DeltaEvent::latex("\\section{B}");
        assert!(reconciler.apply_remote(&event.content).unwrap());
        assert!(!reconciler.apply_remote(&event.content).unwrap());
        assert_eq!(transactions(&reconciler), 1);
        assert_eq!(reconciler.view().unwrap().version(), 1);
    }

    #[test]
    fn test_empty_content_ignored() {
        let (mut reconciler, _) = mounted("keep");
        assert!(!reconciler.on_stream_part(&DeltaEvent::latex("")).unwrap());
        assert_eq!(reconciler.text(), Some("keep"));
    }

    #[test]
    fn test_other_kinds_ignored() {
        let (mut reconciler, _) = mounted("keep");
        let event = DeltaEvent::new(DeltaKind::Other("code".to_string()), "print(1)");
        assert!(!reconciler.on_stream_part(&event).unwrap());
        assert_eq!(reconciler.status(), RunStatus::Idle);
        assert_eq!(reconciler.text(), Some("keep"));
    }

    #[test]
    fn test_remote_writes_never_saved() {
        let (mut reconciler, saves) = mounted("");
        reconciler.on_stream_part(&DeltaEvent::latex("a")).unwrap();
        reconciler.finish_run();
        reconciler.apply_remote("ab").unwrap();
        assert!(saves.borrow().is_empty());
    }

    #[test]
    fn test_local_edits_always_saved_with_debounce() {
        let (mut reconciler, saves) = mounted("ac");
        type_text(&mut reconciler, 1, "b");

        reconciler.on_stream_part(&DeltaEvent::latex("abc!")).unwrap();
        type_text(&mut reconciler, 4, "?");

        assert_eq!(
            *saves.borrow(),
            vec![("abc".to_string(), true), ("abc!?".to_string(), true)]
        );
    }

    #[test]
    fn test_streaming_save_policy() {
        let config = ReconcilerConfig {
            persist_during_streaming: false,
            debounce_saves: false,
        };
        let (mut reconciler, saves) = mounted_with("", config);
        reconciler.on_stream_part(&DeltaEvent::latex("x")).unwrap();
        type_text(&mut reconciler, 1, "y");
        assert!(saves.borrow().is_empty());

        reconciler.finish_run();
        type_text(&mut reconciler, 2, "z");
        assert_eq!(*saves.borrow(), vec![("xyz".to_string(), false)]);
    }

    #[test]
    fn test_callback_replaced_in_place() {
        let (mut reconciler, first) = mounted("");
        let second: Saves = Rc::new(RefCell::new(Vec::new()));
        let recorded = second.clone();
        reconciler.set_on_save(move |content, debounce| {
            recorded.borrow_mut().push((content.to_string(), debounce));
        });

        type_text(&mut reconciler, 0, "x");
        assert!(first.borrow().is_empty());
        assert_eq!(second.borrow().len(), 1);
    }

    /// Wraps a buffer and counts how many listeners and writes it saw
    struct CountingView {
        inner: DocumentBuffer,
        listeners: Rc<Cell<usize>>,
        writes: Rc<Cell<usize>>,
    }

    thread_local! {
        static COUNTERS: RefCell<Option<(Rc<Cell<usize>>, Rc<Cell<usize>>)>> = const { RefCell::new(None) };
    }

    impl EditableView for CountingView {
        fn create(initial: &str) -> Self {
            let (listeners, writes) = COUNTERS.with(|c| c.borrow().clone().unwrap());
            Self {
                inner: DocumentBuffer::new(initial),
                listeners,
                writes,
            }
        }
        fn text(&self) -> &str {
            self.inner.text()
        }
        fn dispatch(&mut self, transaction: EditTransaction) -> Result<()> {
            self.writes.set(self.writes.get() + 1);
            self.inner.dispatch(transaction)
        }
        fn add_update_listener(&mut self, listener: UpdateListener) {
            self.listeners.set(self.listeners.get() + 1);
            self.inner.add_update_listener(listener)
        }
        fn destroy(&mut self) {
            self.inner.destroy()
        }
        fn is_destroyed(&self) -> bool {
            self.inner.is_destroyed()
        }
    }

    #[test]
    fn test_unmount_makes_applies_inert() {
        let listeners = Rc::new(Cell::new(0));
        let writes = Rc::new(Cell::new(0));
        COUNTERS.with(|c| *c.borrow_mut() = Some((listeners.clone(), writes.clone())));

        let mut reconciler: Reconciler<CountingView> =
            Reconciler::new(DeltaKind::Latex, ReconcilerConfig::default());
        assert!(!reconciler.apply_remote("early").unwrap());

        reconciler.mount("start");
        reconciler.on_stream_part(&DeltaEvent::latex("one")).unwrap();
        assert_eq!(writes.get(), 1);

        reconciler.unmount();
        assert!(!reconciler.is_mounted());
        assert_eq!(reconciler.status(), RunStatus::Idle);
        assert!(!reconciler.on_stream_part(&DeltaEvent::latex("two")).unwrap());
        assert!(!reconciler.apply_remote("three").unwrap());
        assert_eq!(writes.get(), 1);
        assert!(reconciler.text().is_none());
    }

    #[test]
    fn test_listener_subscribed_once_per_mount() {
        let listeners = Rc::new(Cell::new(0));
        let writes = Rc::new(Cell::new(0));
        COUNTERS.with(|c| *c.borrow_mut() = Some((listeners.clone(), writes.clone())));

        let mut reconciler: Reconciler<CountingView> =
            Reconciler::new(DeltaKind::Latex, ReconcilerConfig::default());
        reconciler.mount("a");
        for _ in 0..3 {
            reconciler.set_on_save(|_, _| {});
        }
        assert_eq!(listeners.get(), 1);

        // Rebinding tears down the old view before the new listener is added.
        reconciler.mount("b");
        assert_eq!(listeners.get(), 2);
        assert_eq!(reconciler.text(), Some("b"));
    }

    #[tokio::test]
    async fn test_apply_stream_in_order() {
        let (mut reconciler, saves) = mounted("");
        let events = vec![
            DeltaEvent::latex("\\a"),
            DeltaEvent::latex("\\ab"),
            DeltaEvent::latex("\\abc"),
        ];

        let applied = reconciler
            .apply_stream(stream::iter(events))
            .await
            .unwrap();
        assert_eq!(applied, 3);
        assert_eq!(reconciler.text(), Some("\\abc"));
        assert_eq!(transactions(&reconciler), 3);
        assert!(saves.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_generator_run_over_channel() {
        use crate::delta::DeltaSink;
        use crate::generator::{GenerationInput, Generator};
        use std::sync::Arc;
        use texdraft_llm::ModelRoleTable;
        use tokio::sync::mpsc;
        use tokio_stream::wrappers::UnboundedReceiverStream;

        let generator = Generator::new(Arc::new(ModelRoleTable::test()));
        let (tx, rx) = mpsc::unbounded_channel();
        let run = tokio::spawn(async move {
            let mut sink = tx;
            let deltas = generator
                .generate(GenerationInput::Create {
                    title: "Quadratic formula".to_string(),
                })
                .await?;
            deltas.forward_to(&mut sink as &mut dyn DeltaSink).await
        });

        let (mut reconciler, saves) = mounted("");
        let applied = reconciler
            .apply_stream(UnboundedReceiverStream::new(rx))
            .await
            .unwrap();
        let final_content = run.await.unwrap().unwrap();
        reconciler.finish_run();

        assert!(applied > 1);
        assert_eq!(reconciler.text(), Some(final_content.as_str()));
        assert_eq!(reconciler.status(), RunStatus::Idle);
        assert!(saves.borrow().is_empty());
    }
}
