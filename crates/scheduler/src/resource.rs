use std::sync::{Arc, Condvar, Mutex, RwLock, Weak};
use std::time::Duration;

use simdex_core::types::ResourceType;

use crate::table::TaskTable;

/// Directed-edge weight between two resources (relative bandwidth).
/// Absolute units are irrelevant; only the ratios matter to routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    speed: u64,
}

impl Connection {
    pub fn new(speed: u64) -> Self {
        Self { speed }
    }

    pub fn speed(&self) -> u64 {
        self.speed
    }
}

/// Wakes a resource's local executor when a task reaches its terminal hop.
pub struct ExecutorSignal {
    state: Mutex<SignalState>,
    cv: Condvar,
}

struct SignalState {
    delivered: u64,
    consumed: u64,
}

impl ExecutorSignal {
    fn new() -> Self {
        Self {
            state: Mutex::new(SignalState {
                delivered: 0,
                consumed: 0,
            }),
            cv: Condvar::new(),
        }
    }

    pub fn notify(&self) {
        let mut state = self.state.lock().unwrap();
        state.delivered += 1;
        self.cv.notify_all();
    }

    /// Total wakeups delivered since creation.
    pub fn wakeups(&self) -> u64 {
        self.state.lock().unwrap().delivered
    }

    /// Block until a wakeup is pending, or the timeout passes. Consumes one
    /// pending wakeup; a notify that landed before the call still counts.
    /// Returns whether a wakeup was consumed.
    pub fn wait_for_wakeup(&self, timeout: Duration) -> bool {
        let state = self.state.lock().unwrap();
        let (mut state, _) = self
            .cv
            .wait_timeout_while(state, timeout, |s| s.consumed >= s.delivered)
            .unwrap();
        if state.consumed < state.delivered {
            state.consumed += 1;
            true
        } else {
            false
        }
    }
}

/// A named compute or storage endpoint of the graph.
///
/// Identity is immutable after registration. Neighbour edges hold weak
/// back-references only; the `ResourceManager` arena owns every resource, so
/// cycles in the graph never leak.
pub struct Resource {
    name: String,
    kind: ResourceType,
    device_id: u32,
    has_executor: bool,
    table: TaskTable,
    signal: ExecutorSignal,
    edges: RwLock<Vec<(Weak<Resource>, Connection)>>,
}

impl Resource {
    pub(crate) fn new(
        name: &str,
        kind: ResourceType,
        device_id: u32,
        has_executor: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            kind,
            device_id,
            has_executor,
            table: TaskTable::new(),
            signal: ExecutorSignal::new(),
            edges: RwLock::new(Vec::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ResourceType {
        self.kind
    }

    /// Device ordinal; meaningful for GPU resources.
    pub fn device_id(&self) -> u32 {
        self.device_id
    }

    pub fn has_executor(&self) -> bool {
        self.has_executor
    }

    pub fn task_table(&self) -> &TaskTable {
        &self.table
    }

    pub fn executor_signal(&self) -> &ExecutorSignal {
        &self.signal
    }

    pub fn wakeup_executor(&self) {
        self.signal.notify();
    }

    /// Out-neighbours with their connections, in insertion order.
    /// Edges to resources that have been dropped are skipped.
    pub fn neighbours(&self) -> Vec<(Arc<Resource>, Connection)> {
        self.edges
            .read()
            .unwrap()
            .iter()
            .filter_map(|(node, conn)| node.upgrade().map(|node| (node, *conn)))
            .collect()
    }

    pub(crate) fn add_edge(&self, to: &Arc<Resource>, conn: Connection) {
        self.edges.write().unwrap().push((Arc::downgrade(to), conn));
    }
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("device_id", &self.device_id)
            .field("has_executor", &self.has_executor)
            .finish()
    }
}
