use parking_lot::Mutex;
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use vacuna::api::*;
use vacuna::errors::error_codes;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ================================================================================================
// A SMALL APPLICATION WIRING
// ================================================================================================

#[derive(Debug)]
struct Settings {
    dsn: String,
    pool_size: usize,
}

#[derive(Debug)]
struct Pool {
    dsn: String,
    size: usize,
}

#[derive(Debug)]
struct Transaction {
    id: usize,
    pool: Arc<Pool>,
}

#[derive(Debug)]
struct UserRepository {
    tx: Arc<Transaction>,
}

struct Events(Mutex<Vec<String>>);

impl Events {
    fn push(&self, event: impl Into<String>) {
        self.0.lock().push(event.into());
    }

    fn snapshot(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

fn application(events: &Arc<Events>) -> Container {
    let container = Container::new();
    let tx_ids = Arc::new(AtomicUsize::new(0));

    container
        .register(
            "settings",
            Vec::<String>::new(),
            Provider::singleton(|_| {
                Ok(Settings {
                    dsn: "postgres://localhost/app".to_string(),
                    pool_size: 4,
                })
            }),
        )
        .unwrap();

    let pool_events = Arc::clone(events);
    let pool_closed = Arc::clone(events);
    container
        .register(
            "pool",
            ["settings"],
            Provider::singleton(move |args| {
                let settings = args.get::<Settings>(0)?;
                pool_events.push("open pool");
                Ok(Pool {
                    dsn: settings.dsn.clone(),
                    size: settings.pool_size,
                })
            })
            .with_teardown(move |_: &Pool| {
                pool_closed.push("close pool");
                Ok(())
            }),
        )
        .unwrap();

    let tx_events = Arc::clone(events);
    let tx_closed = Arc::clone(events);
    container
        .register(
            "tx",
            ["pool"],
            Provider::resource(move |args| {
                let id = tx_ids.fetch_add(1, Ordering::SeqCst);
                tx_events.push(format!("begin tx{}", id));
                Ok(Transaction {
                    id,
                    pool: args.get::<Pool>(0)?,
                })
            })
            .with_teardown(move |tx: &Transaction| {
                tx_closed.push(format!("commit tx{}", tx.id));
                Ok(())
            }),
        )
        .unwrap();

    container
        .register(
            "users",
            ["tx"],
            Provider::transient(|args| Ok(UserRepository { tx: args.get_by_name::<Transaction>("tx")? }))
                .with_task(|repo: &UserRepository| Ok(format!("users via tx{}", repo.tx.id))),
        )
        .unwrap();

    container
}

#[test]
fn test_application_wiring_end_to_end() {
    init_logging();
    let events = Arc::new(Events(Mutex::new(Vec::new())));
    let container = application(&events);
    container.validate().unwrap();

    // **STEP 1**: A unit of work inside an explicit scope
    {
        let mut scope = container.enter_scope();
        let first = scope.get_as::<UserRepository>("users").unwrap();
        let second = scope.get_as::<UserRepository>("users").unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first.tx, &second.tx));
        assert_eq!(first.tx.pool.dsn, "postgres://localhost/app");
        assert_eq!(first.tx.pool.size, 4);
        scope.close().unwrap();
    }

    // **STEP 2**: `run` opens its own scope
    let summary = container.run_as::<String>("users").unwrap();
    assert_eq!(summary.as_str(), "users via tx1");

    // **STEP 3**: Shutdown closes the singleton pool last
    container.shutdown().unwrap();

    assert_eq!(
        events.snapshot(),
        vec!["open pool", "begin tx0", "commit tx0", "begin tx1", "commit tx1", "close pool"]
    );
}

#[test]
fn test_resource_outside_scope_is_rejected_before_construction() {
    init_logging();
    let events = Arc::new(Events(Mutex::new(Vec::new())));
    let container = application(&events);

    let err = container.get("users").unwrap_err();
    assert_eq!(err.code(), error_codes::SCOPE_REQUIRED);
    assert!(events.snapshot().is_empty());
    assert_eq!(container.singleton_count(), 0);
}

// ================================================================================================
// RESOURCE TEARDOWN GUARANTEES
// ================================================================================================

#[test]
fn test_each_resource_torn_down_once_despite_failures() {
    init_logging();
    let closes: Arc<Mutex<HashMap<String, usize>>> = Arc::new(Mutex::new(HashMap::new()));
    let container = Container::new();

    for name in ["cache_conn", "db_conn", "queue_conn"] {
        let closes = Arc::clone(&closes);
        let fail = name == "db_conn";
        container
            .register(
                name,
                Vec::<String>::new(),
                Provider::resource(move |_| Ok(name.to_string())).with_teardown(move |conn: &String| {
                    *closes.lock().entry(conn.clone()).or_insert(0) += 1;
                    if fail {
                        Err(format!("{} refused to close", conn).into())
                    } else {
                        Ok(())
                    }
                }),
            )
            .unwrap();
    }
    container
        .register(
            "worker",
            ["cache_conn", "db_conn", "queue_conn"],
            Provider::transient(|_| -> Result<(), BoxError> { Err("worker crashed".into()) }),
        )
        .unwrap();

    let mut scope = container.enter_scope();
    let err = scope.get("worker").unwrap_err();
    assert!(matches!(err, ContainerError::ProviderConstruction { .. }));
    assert_eq!(scope.len(), 3);

    match scope.close() {
        Err(ContainerError::AggregateTeardown { failures }) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].name, "db_conn");
        }
        other => panic!("Expected AggregateTeardown, got {:?}", other),
    }

    let closes = closes.lock();
    assert_eq!(closes.len(), 3);
    assert!(closes.values().all(|&count| count == 1));
}

#[test]
fn test_dropped_scope_still_tears_down() {
    init_logging();
    let closed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&closed);
    let container = Container::new();
    container
        .register(
            "file",
            Vec::<String>::new(),
            Provider::resource(|_| Ok(())).with_teardown(move |_: &()| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        )
        .unwrap();

    {
        let mut scope = container.enter_scope();
        scope.get("file").unwrap();
    }
    assert_eq!(closed.load(Ordering::SeqCst), 1);
}

// ================================================================================================
// CONCURRENCY
// ================================================================================================

#[test]
fn test_singleton_constructed_once_across_threads() {
    init_logging();
    const THREADS: usize = 8;
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let container = Container::new();
    container
        .register(
            "expensive",
            Vec::<String>::new(),
            Provider::singleton(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(20));
                Ok(String::from("ready"))
            }),
        )
        .unwrap();

    let barrier = Barrier::new(THREADS);
    let instances: Vec<Instance> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    container.get("expensive").unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(instances.iter().all(|i| Arc::ptr_eq(i, &instances[0])));
}

#[test]
fn test_parallel_resolution_with_rayon() {
    init_logging();
    let singleton_calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&singleton_calls);

    let container = Container::new();
    container
        .register(
            "config",
            Vec::<String>::new(),
            Provider::singleton(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(10usize)
            }),
        )
        .unwrap();
    container
        .register(
            "request",
            ["config"],
            Provider::transient(|args| Ok(*args.get::<usize>(0)? * 2)),
        )
        .unwrap();

    let total: usize = (0..1_000)
        .into_par_iter()
        .map(|_| *container.get_as::<usize>("request").unwrap())
        .sum();

    assert_eq!(total, 20_000);
    assert_eq!(singleton_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_scopes_are_independent_across_threads() {
    init_logging();
    let opened = Arc::new(AtomicUsize::new(0));
    let closed = Arc::new(AtomicUsize::new(0));
    let (on_open, on_close) = (Arc::clone(&opened), Arc::clone(&closed));

    let container = Container::new();
    container
        .register(
            "session",
            Vec::<String>::new(),
            Provider::resource(move |_| Ok(on_open.fetch_add(1, Ordering::SeqCst)))
                .with_teardown(move |_: &usize| {
                    on_close.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
        )
        .unwrap();

    (0..64).into_par_iter().for_each(|_| {
        let mut scope = container.enter_scope();
        let a = scope.get("session").unwrap();
        let b = scope.get("session").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        scope.close().unwrap();
    });

    assert_eq!(opened.load(Ordering::SeqCst), 64);
    assert_eq!(closed.load(Ordering::SeqCst), 64);
}

// ================================================================================================
// MANIFESTS
// ================================================================================================

#[test]
fn test_manifest_driven_container() {
    init_logging();
    let manifest = Manifest::from_json_str(
        r#"{
            "settings": { "max_name_length": 32 },
            "dependencies": [
                { "name": "greeting", "lifetime": "singleton", "factory": "text::greeting" },
                { "name": "audience", "lifetime": "transient", "factory": "text::audience" },
                { "name": "message", "depends_on": ["greeting", "audience"], "lifetime": "transient", "factory": "text::join" }
            ]
        }"#,
    )
    .unwrap();

    let catalog = FactoryCatalog::new()
        .with("text::greeting", Factory::new(|_| Ok(String::from("hello"))))
        .with("text::audience", Factory::new(|_| Ok(String::from("world"))))
        .with(
            "text::join",
            Factory::new(|args| {
                let parts: Result<Vec<Arc<String>>, ArgumentError> =
                    (0..args.len()).map(|i| args.get::<String>(i)).collect();
                Ok(parts?.iter().map(|p| p.as_str()).collect::<Vec<_>>().join(", "))
            }),
        );

    let container = Container::from_manifest(&manifest, &catalog).unwrap();
    assert_eq!(container.config().max_name_length, 32);
    assert_eq!(container.graph("message").unwrap().order(), &["greeting", "audience", "message"]);
    assert_eq!(container.get_as::<String>("message").unwrap().as_str(), "hello, world");
}

#[test]
fn test_manifest_cycle_rejected_eagerly() {
    init_logging();
    let manifest = Manifest::from_json_str(
        r#"{"dependencies": [
            { "name": "a", "depends_on": ["b"], "lifetime": "transient", "factory": "unit" },
            { "name": "b", "depends_on": ["a"], "lifetime": "transient", "factory": "unit" }
        ]}"#,
    )
    .unwrap();
    let catalog = FactoryCatalog::new().with("unit", Factory::new(|_| Ok(())));

    match Container::from_manifest(&manifest, &catalog) {
        Err(ContainerError::CyclicDependency { path }) => assert_eq!(path, vec!["a", "b", "a"]),
        other => panic!("Expected CyclicDependency, got {:?}", other.map(|_| ())),
    }
}
