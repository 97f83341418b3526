//! Integration tests for the directory-read coordinator's public API.
//!
//! Exercises the full flow through [`DirReadCoordinator`] against a hand
//! rolled [`ReplicaClient`], rather than unit-testing individual components.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use dirread_coordinator::coordinator::DirReadCoordinator;
use dirread_coordinator::error::{CoordinatorError, ReplicaError};
use dirread_coordinator::heal::{HealDescriptor, HealError, NoopSelfHealTrigger, SelfHealTrigger};
use dirread_coordinator::inode_latch::DashMapInodeLatchStore;
use dirread_coordinator::replica::{ReplicaClient, ReplicaView, SequentialReadChildPolicy};
use dirread_coordinator::{ClientHandle, Config, DirEntry, DirLocation, InodeId, ReplicaHandleToken, ReplicaId};

/// A replica client whose pages are scripted per replica, keyed by the
/// offset the page is served at; an unset offset or unset replica yields
/// end-of-stream. Optionally fails a given replica's first `readdir` call.
struct FakeReplicas {
    pages: Mutex<HashMap<ReplicaId, HashMap<i64, Vec<DirEntry>>>>,
    fail_open: Mutex<Vec<ReplicaId>>,
    fail_read_once: Mutex<Vec<ReplicaId>>,
}

impl FakeReplicas {
    fn new(pages: HashMap<ReplicaId, HashMap<i64, Vec<DirEntry>>>) -> Self {
        Self {
            pages: Mutex::new(pages),
            fail_open: Mutex::new(vec![]),
            fail_read_once: Mutex::new(vec![]),
        }
    }

    fn failing_open(mut self, replica: ReplicaId) -> Self {
        self.fail_open = Mutex::new(vec![replica]);
        self
    }

    fn failing_read_once(mut self, replica: ReplicaId) -> Self {
        self.fail_read_once = Mutex::new(vec![replica]);
        self
    }
}

#[async_trait]
impl ReplicaClient for FakeReplicas {
    async fn open_directory(
        &self,
        replica: ReplicaId,
        _loc: &DirLocation,
    ) -> Result<ReplicaHandleToken, ReplicaError> {
        if self.fail_open.lock().unwrap().contains(&replica) {
            return Err(ReplicaError::disconnected("replica unreachable"));
        }
        Ok(ReplicaHandleToken(u64::from(replica.0)))
    }

    async fn readdir(
        &self,
        replica: ReplicaId,
        _handle: ReplicaHandleToken,
        _chunk_size: u32,
        offset: i64,
        _with_attrs: bool,
    ) -> Result<Vec<DirEntry>, ReplicaError> {
        {
            let mut fail_once = self.fail_read_once.lock().unwrap();
            if let Some(pos) = fail_once.iter().position(|&r| r == replica) {
                fail_once.remove(pos);
                return Err(ReplicaError::disconnected("connection reset mid-read"));
            }
        }
        let pages = self.pages.lock().unwrap();
        Ok(pages
            .get(&replica)
            .and_then(|p| p.get(&offset))
            .cloned()
            .unwrap_or_default())
    }
}

fn view(up: &[bool]) -> ReplicaView {
    ReplicaView::new(up.to_vec())
}

fn coordinator(
    client: FakeReplicas,
    replica_count: usize,
) -> DirReadCoordinator<FakeReplicas, SequentialReadChildPolicy, NoopSelfHealTrigger, DashMapInodeLatchStore> {
    DirReadCoordinator::new(
        client,
        SequentialReadChildPolicy,
        NoopSelfHealTrigger,
        DashMapInodeLatchStore::new(),
        Config::new(InodeId(1)),
        replica_count,
    )
}

fn single_page(entries: Vec<DirEntry>) -> HashMap<i64, Vec<DirEntry>> {
    HashMap::from([(0, entries)])
}

/// A self-heal trigger that counts invocations into a shared counter the
/// test keeps a handle to, since the coordinator owns its collaborators.
struct RecordingHeal(Arc<Mutex<u32>>);

#[async_trait]
impl SelfHealTrigger for RecordingHeal {
    async fn trigger_self_heal(
        &self,
        _inode: InodeId,
        _descriptor: HealDescriptor,
        _reason: &str,
    ) -> Result<(), HealError> {
        *self.0.lock().unwrap() += 1;
        Ok(())
    }
}

/// A self-heal trigger that records the `(descriptor, reason)` of every
/// invocation into a shared log.
struct RecordingHealWithReason(Arc<Mutex<Vec<(HealDescriptor, String)>>>);

#[async_trait]
impl SelfHealTrigger for RecordingHealWithReason {
    async fn trigger_self_heal(
        &self,
        _inode: InodeId,
        descriptor: HealDescriptor,
        reason: &str,
    ) -> Result<(), HealError> {
        self.0.lock().unwrap().push((descriptor, reason.to_string()));
        Ok(())
    }
}

#[tokio::test]
async fn scenario_clean_two_replica_open_does_not_trigger_heal() {
    let mut pages = HashMap::new();
    pages.insert(
        ReplicaId(0),
        single_page(vec![DirEntry::new("foo", 10), DirEntry::new("bar", 20)]),
    );
    pages.insert(
        ReplicaId(1),
        single_page(vec![DirEntry::new("foo", 7), DirEntry::new("bar", 14)]),
    );

    let triggered = Arc::new(Mutex::new(0u32));
    let heal = RecordingHeal(Arc::clone(&triggered));

    let client = FakeReplicas::new(pages);
    let coordinator = DirReadCoordinator::new(
        client,
        SequentialReadChildPolicy,
        heal,
        DashMapInodeLatchStore::new(),
        Config::new(InodeId(1)),
        2,
    );
    let v = view(&[true, true]);

    coordinator
        .opendir(&DirLocation::new("/d"), InodeId(42), &v)
        .await
        .expect("at least one replica opened");

    assert_eq!(*triggered.lock().unwrap(), 0);
}

#[tokio::test]
async fn scenario_divergent_directories_trigger_heal() {
    let mut pages = HashMap::new();
    pages.insert(ReplicaId(0), single_page(vec![DirEntry::new("foo", 1), DirEntry::new("bar", 2)]));
    pages.insert(ReplicaId(1), single_page(vec![DirEntry::new("foo", 1), DirEntry::new("baz", 2)]));

    let triggered = Arc::new(Mutex::new(Vec::new()));
    let heal = RecordingHealWithReason(Arc::clone(&triggered));

    let client = FakeReplicas::new(pages);
    let coordinator = DirReadCoordinator::new(
        client,
        SequentialReadChildPolicy,
        heal,
        DashMapInodeLatchStore::new(),
        Config::new(InodeId(1)),
        2,
    );
    let v = view(&[true, true]);

    coordinator
        .opendir(&DirLocation::new("/d"), InodeId(42), &v)
        .await
        .unwrap();

    let triggered = triggered.lock().unwrap();
    assert_eq!(triggered.len(), 1);
    let (descriptor, reason) = &triggered[0];
    assert!(descriptor.entry && descriptor.forced_merge);
    assert_eq!(reason, "checksums of directory differ");
}

#[tokio::test]
async fn scenario_failover_mid_read_suppresses_duplicates() {
    let mut pages = HashMap::new();
    pages.insert(
        ReplicaId(1),
        single_page(vec![DirEntry::new("a", 9), DirEntry::new("b", 10), DirEntry::new("c", 11)]),
    );
    pages.insert(ReplicaId(0), single_page(vec![DirEntry::new("a", 1), DirEntry::new("b", 2)]));

    let client = FakeReplicas::new(pages);
    let coordinator = coordinator(client, 2);
    let v = view(&[true, true]);

    let handle = coordinator
        .opendir(&DirLocation::new("/d"), InodeId(42), &v)
        .await
        .unwrap();

    // First read succeeds on replica 0, remembering {a, b}.
    let first = coordinator.readdir(handle, &v, 131_072, 0).await.unwrap();
    assert_eq!(first.iter().map(|e| e.name.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);

    // Replica 0 goes down; subsequent read fails over to replica 1.
    let v_failover = view(&[false, true]);
    let second = coordinator.readdir(handle, &v_failover, 131_072, 2).await.unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].name, "c");
}

#[tokio::test]
async fn scenario_all_duplicate_page_after_failover_reissues() {
    let mut pages = HashMap::new();
    pages.insert(ReplicaId(0), single_page(vec![DirEntry::new("a", 1), DirEntry::new("b", 2)]));
    let mut replica_1_pages = HashMap::new();
    replica_1_pages.insert(0, vec![DirEntry::new("a", 9), DirEntry::new("b", 10)]);
    replica_1_pages.insert(10, vec![DirEntry::new("c", 11)]);
    pages.insert(ReplicaId(1), replica_1_pages);

    let client = FakeReplicas::new(pages);
    let coordinator = coordinator(client, 2);
    let v = view(&[true, true]);

    let handle = coordinator
        .opendir(&DirLocation::new("/d"), InodeId(42), &v)
        .await
        .unwrap();
    coordinator.readdir(handle, &v, 131_072, 0).await.unwrap();

    let v_failover = view(&[false, true]);
    let result = coordinator.readdir(handle, &v_failover, 131_072, 2).await.unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].name, "c");
}

#[tokio::test]
async fn scenario_root_trash_filter_hides_entry_at_root_only() {
    let mut pages = HashMap::new();
    pages.insert(
        ReplicaId(0),
        single_page(vec![
            DirEntry::new("file1", 1),
            DirEntry::new(".landfill", 2),
            DirEntry::new("file2", 3),
        ]),
    );

    let client = FakeReplicas::new(pages);
    let coordinator = coordinator(client, 1);
    let v = view(&[true]);

    let root_handle = coordinator
        .opendir(&DirLocation::new("/"), InodeId(1), &v)
        .await
        .unwrap();
    let root_entries = coordinator.readdir(root_handle, &v, 131_072, 0).await.unwrap();
    let names: Vec<_> = root_entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["file1", "file2"]);
}

#[tokio::test]
async fn scenario_non_root_directory_keeps_trash_named_entry() {
    let mut pages = HashMap::new();
    pages.insert(
        ReplicaId(0),
        single_page(vec![DirEntry::new("file1", 1), DirEntry::new(".landfill", 2)]),
    );

    let client = FakeReplicas::new(pages);
    let coordinator = coordinator(client, 1);
    let v = view(&[true]);

    // Root inode is 1 (Config::new(InodeId(1))); open a different inode.
    let handle = coordinator
        .opendir(&DirLocation::new("/sub"), InodeId(2), &v)
        .await
        .unwrap();
    let entries = coordinator.readdir(handle, &v, 131_072, 0).await.unwrap();
    let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["file1", ".landfill"]);
}

#[tokio::test]
async fn scenario_opendir_with_one_replica_down_ignores_its_checksum() {
    // N=3, replica 1 down; only replicas 0 and 2 contribute, and their
    // matching contents must not be reported as divergent.
    let mut pages = HashMap::new();
    pages.insert(ReplicaId(0), single_page(vec![DirEntry::new("foo", 1)]));
    pages.insert(ReplicaId(2), single_page(vec![DirEntry::new("foo", 1)]));

    let triggered = Arc::new(Mutex::new(0u32));
    let heal = RecordingHeal(Arc::clone(&triggered));

    let client = FakeReplicas::new(pages);
    let coordinator = DirReadCoordinator::new(
        client,
        SequentialReadChildPolicy,
        heal,
        DashMapInodeLatchStore::new(),
        Config::new(InodeId(1)),
        3,
    );
    let v = view(&[true, false, true]);

    coordinator
        .opendir(&DirLocation::new("/d"), InodeId(42), &v)
        .await
        .unwrap();

    assert_eq!(*triggered.lock().unwrap(), 0);
}

#[tokio::test]
async fn opendir_succeeds_when_only_one_of_two_replicas_opens() {
    let client = FakeReplicas::new(HashMap::new()).failing_open(ReplicaId(1));
    let coordinator = coordinator(client, 2);
    let v = view(&[true, true]);

    let handle = coordinator
        .opendir(&DirLocation::new("/d"), InodeId(42), &v)
        .await
        .unwrap();
    let entries = coordinator.readdir(handle, &v, 131_072, 0).await.unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn opendir_fails_when_every_replica_open_fails() {
    let client = FakeReplicas::new(HashMap::new())
        .failing_open(ReplicaId(0))
        .failing_open(ReplicaId(1));
    // Both failing_open calls replace the vec, so fail both explicitly.
    let client = FakeReplicas {
        pages: Mutex::new(HashMap::new()),
        fail_open: Mutex::new(vec![ReplicaId(0), ReplicaId(1)]),
        fail_read_once: Mutex::new(vec![]),
    };
    let coordinator = coordinator(client, 2);
    let v = view(&[true, true]);

    let result = coordinator.opendir(&DirLocation::new("/d"), InodeId(42), &v).await;
    assert!(matches!(result, Err(CoordinatorError::NoReplicaUp)));
}

#[tokio::test]
async fn releasedir_then_readdir_reports_context_missing() {
    let client = FakeReplicas::new(HashMap::new());
    let coordinator = coordinator(client, 1);
    let v = view(&[true]);

    let handle = coordinator
        .opendir(&DirLocation::new("/d"), InodeId(42), &v)
        .await
        .unwrap();
    coordinator.releasedir(handle);
    // Releasing twice must behave as one (R2).
    coordinator.releasedir(handle);

    let result = coordinator.readdir(handle, &v, 131_072, 0).await;
    assert!(matches!(result, Err(CoordinatorError::ContextMissing { .. })));
}

#[tokio::test]
async fn unrelated_handle_is_unaffected_by_releasing_another() {
    let mut pages = HashMap::new();
    pages.insert(ReplicaId(0), single_page(vec![DirEntry::new("foo", 1)]));
    let client = FakeReplicas::new(pages);
    let coordinator = coordinator(client, 1);
    let v = view(&[true]);

    let handle_a = coordinator
        .opendir(&DirLocation::new("/a"), InodeId(2), &v)
        .await
        .unwrap();
    let handle_b = coordinator
        .opendir(&DirLocation::new("/b"), InodeId(3), &v)
        .await
        .unwrap();

    coordinator.releasedir(handle_a);
    let entries = coordinator.readdir(handle_b, &v, 131_072, 0).await.unwrap();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn readdir_failure_surfaces_disconnected_error_when_failover_exhausted() {
    let client = FakeReplicas::new(HashMap::new()).failing_read_once(ReplicaId(0));
    let coordinator = coordinator(client, 1);
    let v = view(&[true]);

    let handle = coordinator
        .opendir(&DirLocation::new("/d"), InodeId(42), &v)
        .await
        .unwrap();

    let result = coordinator.readdir(handle, &v, 131_072, 0).await;
    assert!(matches!(result, Err(CoordinatorError::FailoverExhausted)));
}
