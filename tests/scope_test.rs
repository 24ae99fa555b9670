//! Scope lifetime tests
//! Run with: cargo test --test scope_test

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use pretty_assertions::assert_eq;

use common::ensure_init;
use mediator::{
    Behavior, CancellationToken, Command, CommandHandler, DispatchResult, HandlerResult, Mediator,
    MediatorError, Next, Notification, NotificationHandler, Query, QueryHandler, Request, Response,
    Scope, ScopeFactory, Sender,
};

/// Counts scopes opened and closed through it
#[derive(Clone, Default)]
struct CountingScopes {
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl CountingScopes {
    fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

impl ScopeFactory for CountingScopes {
    fn create_scope(&self) -> Scope {
        self.opened.fetch_add(1, Ordering::SeqCst);
        let scope = Scope::new();
        let closed = self.closed.clone();
        scope.on_close(move || {
            closed.fetch_add(1, Ordering::SeqCst);
        });
        scope
    }
}

/// Per-dispatch counter shared by everything resolved in one scope
#[derive(Default)]
struct Touches(AtomicUsize);

struct Archive {
    fail: bool,
}

impl Command for Archive {}

struct ArchiveHandler {
    fail: bool,
}

#[async_trait]
impl CommandHandler<Archive> for ArchiveHandler {
    async fn handle(&self, command: &Archive, _cancel: &CancellationToken) -> HandlerResult<()> {
        if self.fail || command.fail {
            return Err("archive failed".into());
        }
        Ok(())
    }
}

struct CountTouches;

impl Query for CountTouches {
    type Response = usize;
}

struct CountTouchesHandler {
    touches: Arc<Touches>,
}

#[async_trait]
impl QueryHandler<CountTouches> for CountTouchesHandler {
    async fn handle(&self, _query: &CountTouches, _cancel: &CancellationToken) -> HandlerResult<usize> {
        tokio::task::yield_now().await;
        Ok(self.touches.0.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

struct TouchingBehavior {
    touches: Arc<Touches>,
}

#[async_trait]
impl Behavior<Response> for TouchingBehavior {
    async fn handle(
        &self,
        _request: &Request<'_>,
        next: Next<'_, Response>,
        _cancel: &CancellationToken,
    ) -> DispatchResult<Response> {
        self.touches.0.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        next.run().await
    }
}

struct Pinged;

impl Notification for Pinged {}

struct PingedListener;

#[async_trait]
impl NotificationHandler<Pinged> for PingedListener {
    async fn handle(&self, _notification: &Pinged, _cancel: &CancellationToken) -> HandlerResult<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_scope_closed_after_success_and_fault() {
    ensure_init();
    let scopes = CountingScopes::default();
    let mediator = Mediator::builder()
        .scope_factory(scopes.clone())
        .command_handler::<Archive, _>(|_| ArchiveHandler { fail: false })
        .build();
    let cancel = CancellationToken::new();

    mediator.send(Archive { fail: false }, &cancel).await.unwrap();
    assert_eq!((scopes.opened(), scopes.closed()), (1, 1));

    let err = mediator.send(Archive { fail: true }, &cancel).await.unwrap_err();
    assert_eq!(err.to_string(), "archive failed");
    assert_eq!((scopes.opened(), scopes.closed()), (2, 2));
}

#[tokio::test]
async fn test_scope_closed_after_resolution_failure() {
    ensure_init();
    let scopes = CountingScopes::default();
    let mediator = Mediator::builder().scope_factory(scopes.clone()).build();

    let err = mediator
        .send(Archive { fail: false }, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, MediatorError::HandlerNotFound { .. }));
    assert_eq!((scopes.opened(), scopes.closed()), (1, 1));
}

#[tokio::test]
async fn test_publish_opens_one_scope() {
    ensure_init();
    let scopes = CountingScopes::default();
    let mediator = Mediator::builder()
        .scope_factory(scopes.clone())
        .notification_handler::<Pinged, _>(|_| PingedListener)
        .notification_handler::<Pinged, _>(|_| PingedListener)
        .build();

    mediator.publish(Pinged, &CancellationToken::new()).await.unwrap();

    assert_eq!((scopes.opened(), scopes.closed()), (1, 1));
}

#[tokio::test]
async fn test_handler_and_behavior_share_scope_resources() {
    ensure_init();
    let mediator = Mediator::builder()
        .query_handler::<CountTouches, _>(|scope| CountTouchesHandler {
            touches: scope.get_or_insert_with(Touches::default),
        })
        .pipeline_behavior(|scope| TouchingBehavior {
            touches: scope.get_or_insert_with(Touches::default),
        })
        .build();
    let cancel = CancellationToken::new();

    // behavior then handler, starting from a fresh counter each time
    assert_eq!(mediator.query(CountTouches, &cancel).await.unwrap(), 2);
    assert_eq!(mediator.query(CountTouches, &cancel).await.unwrap(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_dispatches_use_separate_scopes() {
    ensure_init();
    let scopes = CountingScopes::default();
    let mediator = Mediator::builder()
        .scope_factory(scopes.clone())
        .query_handler::<CountTouches, _>(|scope| CountTouchesHandler {
            touches: scope.get_or_insert_with(Touches::default),
        })
        .pipeline_behavior(|scope| TouchingBehavior {
            touches: scope.get_or_insert_with(Touches::default),
        })
        .build();

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let mediator = mediator.clone();
            tokio::spawn(async move { mediator.query(CountTouches, &CancellationToken::new()).await })
        })
        .collect();

    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap(), 2);
    }
    assert_eq!((scopes.opened(), scopes.closed()), (16, 16));
}

struct Deposit;
impl Command for Deposit {}

struct Withdraw;
impl Command for Withdraw {}

/// Scope-local ledger entries for one dispatch
#[derive(Default)]
struct Ledger(std::sync::Mutex<Vec<&'static str>>);

impl Ledger {
    fn record(&self, entry: &'static str) -> Vec<&'static str> {
        let mut entries = self.0.lock().unwrap();
        entries.push(entry);
        entries.clone()
    }
}

/// Handler that checks the scope's ledger holds only its own dispatch
struct LedgerHandler {
    name: &'static str,
    ledger: Arc<Ledger>,
    observed: Arc<std::sync::Mutex<Vec<Vec<&'static str>>>>,
}

impl LedgerHandler {
    async fn run(&self) -> HandlerResult<()> {
        tokio::task::yield_now().await;
        let entries = self.ledger.record(self.name);
        self.observed.lock().unwrap().push(entries);
        Ok(())
    }
}

#[async_trait]
impl CommandHandler<Deposit> for LedgerHandler {
    async fn handle(&self, _command: &Deposit, _cancel: &CancellationToken) -> HandlerResult<()> {
        self.run().await
    }
}

#[async_trait]
impl CommandHandler<Withdraw> for LedgerHandler {
    async fn handle(&self, _command: &Withdraw, _cancel: &CancellationToken) -> HandlerResult<()> {
        self.run().await
    }
}

/// Opens the ledger with the message name before the handler runs
struct LedgerBehavior {
    ledger: Arc<Ledger>,
}

#[async_trait]
impl Behavior<()> for LedgerBehavior {
    async fn handle(
        &self,
        request: &Request<'_>,
        next: Next<'_, ()>,
        _cancel: &CancellationToken,
    ) -> DispatchResult<()> {
        let opened = if request.is::<Deposit>() { "open-deposit" } else { "open-withdraw" };
        self.ledger.record(opened);
        tokio::task::yield_now().await;
        next.run().await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sends_of_different_commands_keep_scopes_apart() {
    ensure_init();
    let observed = Arc::new(std::sync::Mutex::new(Vec::new()));
    let (deposits, withdrawals) = (observed.clone(), observed.clone());
    let mediator = Mediator::builder()
        .command_handler::<Deposit, _>(move |scope| LedgerHandler {
            name: "deposit",
            ledger: scope.get_or_insert_with(Ledger::default),
            observed: deposits.clone(),
        })
        .command_handler::<Withdraw, _>(move |scope| LedgerHandler {
            name: "withdraw",
            ledger: scope.get_or_insert_with(Ledger::default),
            observed: withdrawals.clone(),
        })
        .command_behavior(|scope| LedgerBehavior {
            ledger: scope.get_or_insert_with(Ledger::default),
        })
        .build();

    for _ in 0..8 {
        let cancel = CancellationToken::new();
        let (deposit, withdraw) = tokio::join!(
            mediator.send(Deposit, &cancel),
            mediator.send(Withdraw, &cancel)
        );
        deposit.unwrap();
        withdraw.unwrap();
    }

    let observed = observed.lock().unwrap();
    assert_eq!(observed.len(), 16);
    for entries in observed.iter() {
        assert!(
            *entries == vec!["open-deposit", "deposit"] || *entries == vec!["open-withdraw", "withdraw"],
            "scope state leaked between dispatches: {:?}",
            entries
        );
    }
}
