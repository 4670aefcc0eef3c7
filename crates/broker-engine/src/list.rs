//! The transaction list: admission, commit, serialized execution,
//! finished-grace retention and change notification.
//!
//! All list state is owned by a single runtime task; handles talk to it
//! over a command channel, so no external locking is needed. At most one
//! transaction is running at any moment; committed transactions start in
//! submission order as their predecessors finish.

use std::sync::{Arc, Mutex, Weak};

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, warn};

use pakbroker_core::Role;

use crate::api::{EngineEvent, ListConfig, ListEvent};
use crate::backend::BackendEngine;
use crate::plugin::PluginCatalog;
use crate::transaction::Transaction;

// Process-local slot holding the current list instance; cleared on
// teardown so a dead list is never revived.
static ACTIVE: Mutex<Weak<ListShared>> = Mutex::new(Weak::new());

struct ListShared {
    cmd_tx: mpsc::UnboundedSender<ListCommand>,
    changed_tx: broadcast::Sender<ListEvent>,
}

/// Handle to the process-wide transaction list. Cheap to clone; clones
/// address the same list.
#[derive(Clone)]
pub struct TransactionList {
    shared: Arc<ListShared>,
}

enum ListCommand {
    Create {
        tid: String,
        reply: oneshot::Sender<bool>,
    },
    Commit {
        tid: String,
        reply: oneshot::Sender<bool>,
    },
    Remove {
        tid: String,
        reply: oneshot::Sender<bool>,
    },
    Get {
        tid: String,
        reply: oneshot::Sender<Option<Arc<Transaction>>>,
    },
    RolePresent {
        role: Role,
        reply: oneshot::Sender<bool>,
    },
    GetArray {
        reply: oneshot::Sender<Vec<String>>,
    },
    GetSize {
        reply: oneshot::Sender<usize>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

enum ListInternal {
    Finished { tid: String },
    GraceExpired { tid: String },
}

impl TransactionList {
    /// Start a new transaction list and record it as the process-wide
    /// current instance. Must be called from within the tokio runtime.
    pub fn spawn(catalog: Arc<PluginCatalog>, config: ListConfig) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let (changed_tx, _) = broadcast::channel(256);

        let shared = Arc::new(ListShared {
            cmd_tx,
            changed_tx: changed_tx.clone(),
        });
        *ACTIVE.lock().unwrap() = Arc::downgrade(&shared);

        let runtime = ListRuntime {
            catalog,
            config,
            items: Vec::new(),
            cmd_rx,
            internal_tx,
            internal_rx,
            changed_tx,
            shared_weak: Arc::downgrade(&shared),
        };
        tokio::spawn(runtime.run());

        Self { shared }
    }

    /// The current process-wide instance, if one is alive.
    pub fn current() -> Option<Self> {
        ACTIVE
            .lock()
            .unwrap()
            .upgrade()
            .map(|shared| Self { shared })
    }

    /// Subscribe to `Changed` notifications.
    pub fn subscribe_changed(&self) -> broadcast::Receiver<ListEvent> {
        self.shared.changed_tx.subscribe()
    }

    /// Add a new transaction under `tid`, binding a fresh backend engine.
    /// Fails if the TID already exists or the plugin cannot be loaded.
    pub async fn create(&self, tid: &str) -> bool {
        self.request_bool(|reply| ListCommand::Create {
            tid: tid.to_string(),
            reply,
        })
        .await
    }

    /// Mark `tid` committed; if nothing is running it starts immediately.
    pub async fn commit(&self, tid: &str) -> bool {
        self.request_bool(|reply| ListCommand::Commit {
            tid: tid.to_string(),
            reply,
        })
        .await
    }

    /// Remove a transaction that has not finished yet. Finished
    /// transactions stay until their grace timer fires.
    pub async fn remove(&self, tid: &str) -> bool {
        self.request_bool(|reply| ListCommand::Remove {
            tid: tid.to_string(),
            reply,
        })
        .await
    }

    /// Look up a transaction by TID, including finished ones still inside
    /// their grace window.
    pub async fn get(&self, tid: &str) -> Option<Arc<Transaction>> {
        let (reply, rx) = oneshot::channel();
        self.shared
            .cmd_tx
            .send(ListCommand::Get {
                tid: tid.to_string(),
                reply,
            })
            .ok()?;
        rx.await.ok().flatten()
    }

    /// Whether some committed, unfinished transaction has the given role.
    /// Useful to refuse a second concurrent system update.
    pub async fn role_present(&self, role: Role) -> bool {
        self.request_bool(|reply| ListCommand::RolePresent { role, reply })
            .await
    }

    /// TIDs of committed, unfinished transactions in submission order.
    pub async fn get_array(&self) -> Vec<String> {
        let (reply, rx) = oneshot::channel();
        if self
            .shared
            .cmd_tx
            .send(ListCommand::GetArray { reply })
            .is_err()
        {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }

    /// Length of the underlying sequence, including uncommitted and
    /// finished-in-grace entries.
    pub async fn get_size(&self) -> usize {
        let (reply, rx) = oneshot::channel();
        if self
            .shared
            .cmd_tx
            .send(ListCommand::GetSize { reply })
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }

    /// Stop the list. Pending transactions are dropped; the process-wide
    /// slot is cleared.
    pub async fn shutdown(&self) {
        let (reply, rx) = oneshot::channel();
        if self
            .shared
            .cmd_tx
            .send(ListCommand::Shutdown { reply })
            .is_ok()
        {
            let _ = rx.await;
        }
    }

    async fn request_bool(&self, make: impl FnOnce(oneshot::Sender<bool>) -> ListCommand) -> bool {
        let (reply, rx) = oneshot::channel();
        if self.shared.cmd_tx.send(make(reply)).is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }
}

struct TransactionItem {
    tid: String,
    committed: bool,
    running: bool,
    finished: bool,
    transaction: Arc<Transaction>,
}

struct ListRuntime {
    catalog: Arc<PluginCatalog>,
    config: ListConfig,
    items: Vec<TransactionItem>,
    cmd_rx: mpsc::UnboundedReceiver<ListCommand>,
    internal_tx: mpsc::UnboundedSender<ListInternal>,
    internal_rx: mpsc::UnboundedReceiver<ListInternal>,
    changed_tx: broadcast::Sender<ListEvent>,
    shared_weak: Weak<ListShared>,
}

impl ListRuntime {
    async fn run(mut self) {
        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(ListCommand::Shutdown { reply }) => {
                        // Clear state before acknowledging so a caller never
                        // observes a live-looking list after shutdown.
                        self.teardown();
                        let _ = reply.send(());
                        break;
                    }
                    Some(cmd) => self.handle_command(cmd),
                    // All handles dropped.
                    None => break,
                },
                Some(msg) = self.internal_rx.recv() => self.handle_internal(msg),
            }
        }
        self.teardown();
    }

    fn teardown(&mut self) {
        self.items.clear();
        let mut slot = ACTIVE.lock().unwrap();
        if slot.ptr_eq(&self.shared_weak) {
            *slot = Weak::new();
        }
    }

    fn emit_changed(&self) {
        debug!("emitting changed");
        let _ = self.changed_tx.send(ListEvent::Changed);
    }

    fn number_running(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.committed && item.running && !item.finished)
            .count()
    }

    fn find(&self, tid: &str) -> Option<&TransactionItem> {
        self.items.iter().find(|item| item.tid == tid)
    }

    fn handle_command(&mut self, cmd: ListCommand) {
        match cmd {
            ListCommand::Create { tid, reply } => {
                let _ = reply.send(self.create(tid));
            }
            ListCommand::Commit { tid, reply } => {
                let _ = reply.send(self.commit(&tid));
            }
            ListCommand::Remove { tid, reply } => {
                let _ = reply.send(self.remove(&tid));
            }
            ListCommand::Get { tid, reply } => {
                let _ = reply.send(self.find(&tid).map(|item| item.transaction.clone()));
            }
            ListCommand::RolePresent { role, reply } => {
                let present = self.items.iter().any(|item| {
                    item.committed
                        && !item.finished
                        && item.transaction.role() == Some(role)
                });
                let _ = reply.send(present);
            }
            ListCommand::GetArray { reply } => {
                let tids = self
                    .items
                    .iter()
                    .filter(|item| item.committed && !item.finished)
                    .map(|item| item.tid.clone())
                    .collect();
                let _ = reply.send(tids);
            }
            ListCommand::GetSize { reply } => {
                let _ = reply.send(self.items.len());
            }
            ListCommand::Shutdown { .. } => unreachable!("handled in the select loop"),
        }
    }

    fn create(&mut self, tid: String) -> bool {
        if self.find(&tid).is_some() {
            warn!("already added {tid} to list");
            return false;
        }

        let engine = match BackendEngine::load(
            &self.catalog,
            &self.config.backend,
            self.config.engine.clone(),
        ) {
            Ok(engine) => engine,
            Err(err) => {
                warn!("cannot create {tid}: {err}");
                return false;
            }
        };

        // Forward this transaction's Finished event into the runtime so it
        // can retire the item and dispatch the next one.
        let mut events = engine.subscribe();
        let internal_tx = self.internal_tx.clone();
        let watch_tid = tid.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(EngineEvent::Finished { .. }) => {
                        let _ = internal_tx.send(ListInternal::Finished { tid: watch_tid });
                        break;
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        debug!("adding transaction {tid}");
        self.items.push(TransactionItem {
            transaction: Arc::new(Transaction::new(tid.clone(), engine)),
            tid,
            committed: false,
            running: false,
            finished: false,
        });
        true
    }

    fn commit(&mut self, tid: &str) -> bool {
        let running = self.number_running();
        let Some(index) = self.items.iter().position(|item| item.tid == tid) else {
            warn!("could not get transaction: {tid}");
            return false;
        };

        debug!("marking transaction {tid} as committed");
        self.items[index].committed = true;
        self.emit_changed();

        // Start it now unless something else is already in progress.
        if running == 0 {
            debug!("running {tid}");
            self.items[index].running = true;
            if !self.items[index].transaction.run() {
                warn!("unable to start first job");
                return false;
            }
        }
        true
    }

    fn remove(&mut self, tid: &str) -> bool {
        let Some(index) = self.items.iter().position(|item| item.tid == tid) else {
            warn!("could not get transaction: {tid}");
            return false;
        };
        if self.items[index].finished {
            warn!("{tid} already finished, so waiting to timeout");
            return false;
        }
        debug!("remove transaction {tid}");
        self.items.remove(index);
        true
    }

    fn handle_internal(&mut self, msg: ListInternal) {
        match msg {
            ListInternal::Finished { tid } => self.transaction_finished(&tid),
            ListInternal::GraceExpired { tid } => {
                debug!("transaction {tid} completed, removing");
                self.items.retain(|item| item.tid != tid);
            }
        }
    }

    fn transaction_finished(&mut self, tid: &str) {
        let Some(item) = self.items.iter_mut().find(|item| item.tid == tid) else {
            warn!("no transaction list item found for {tid}");
            return;
        };
        if item.finished {
            warn!("transaction {tid} finished twice");
            return;
        }
        debug!("transaction {tid} completed, marking finished");
        item.finished = true;
        self.emit_changed();

        // Give clients a grace window to still query the finished item.
        let internal_tx = self.internal_tx.clone();
        let keep = self.config.keep_finished;
        let expired_tid = tid.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(keep).await;
            let _ = internal_tx.send(ListInternal::GraceExpired { tid: expired_tid });
        });

        // Dispatch the next queued transaction, in submission order.
        for item in self.items.iter_mut() {
            if item.committed && !item.running && !item.finished {
                debug!("running {}", item.tid);
                item.running = true;
                if item.transaction.run() {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::api::EngineConfig;
    use crate::plugin::PluginDescriptor;

    static BARE: PluginDescriptor = PluginDescriptor::empty("Bare", "tests");

    fn spawn_bare_list() -> TransactionList {
        let mut catalog = PluginCatalog::new();
        catalog.register("bare", &BARE);
        let config = ListConfig {
            backend: "bare".to_string(),
            engine: EngineConfig {
                helper_root: std::env::temp_dir(),
                finished_delay: Duration::from_millis(10),
            },
            keep_finished: Duration::from_millis(100),
        };
        TransactionList::spawn(Arc::new(catalog), config)
    }

    #[tokio::test]
    async fn duplicate_tid_is_refused() {
        let list = spawn_bare_list();
        assert!(list.create("/1_aaaaaaaa").await);
        assert!(!list.create("/1_aaaaaaaa").await);
        assert_eq!(list.get_size().await, 1);
    }

    #[tokio::test]
    async fn unknown_plugin_fails_create() {
        let catalog = PluginCatalog::new();
        let config = ListConfig::new("ghost", EngineConfig::default());
        let list = TransactionList::spawn(Arc::new(catalog), config);
        assert!(!list.create("/1_bbbbbbbb").await);
        assert_eq!(list.get_size().await, 0);
    }

    #[tokio::test]
    async fn remove_works_before_commit() {
        let list = spawn_bare_list();
        assert!(list.create("/2_cccccccc").await);
        assert!(list.remove("/2_cccccccc").await);
        assert_eq!(list.get_size().await, 0);
        // Removing again fails.
        assert!(!list.remove("/2_cccccccc").await);
    }

    #[tokio::test]
    async fn uncommitted_items_are_not_in_the_array() {
        let list = spawn_bare_list();
        assert!(list.create("/3_dddddddd").await);
        assert!(list.get_array().await.is_empty());
        assert_eq!(list.get_size().await, 1);
    }

    #[tokio::test]
    async fn get_unknown_tid_is_none() {
        let list = spawn_bare_list();
        assert!(list.get("/9_ffffffff").await.is_none());
    }

    #[tokio::test]
    async fn operations_fail_after_shutdown() {
        let list = spawn_bare_list();
        list.shutdown().await;
        assert!(!list.create("/4_eeeeeeee").await);
        assert_eq!(list.get_size().await, 0);
    }
}
