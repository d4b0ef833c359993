use std::sync::{Arc, Barrier, Mutex, OnceLock, Weak};
use std::thread;

use compono_container::prelude::*;

trait Database: Send + Sync {
    fn url(&self) -> &str;
}

trait Plugin: Send + Sync {
    fn name(&self) -> &'static str;
}

struct Postgres;
impl Database for Postgres {
    fn url(&self) -> &str {
        "postgres://localhost"
    }
}

struct Sqlite;
impl Database for Sqlite {
    fn url(&self) -> &str {
        "sqlite::memory:"
    }
}

struct Audit;
impl Plugin for Audit {
    fn name(&self) -> &'static str {
        "audit"
    }
}

struct Tracing;
impl Plugin for Tracing {
    fn name(&self) -> &'static str {
        "tracing"
    }
}

fn isolated(repository: Arc<Repository>) -> Container {
    Container::builder()
        .repository(repository)
        .registry(Arc::new(LifetimeRegistry::new()))
        .build()
}

fn postgres() -> Arc<ComponentDescriptor> {
    ComponentDescriptor::builder::<Postgres>()
        .provides::<dyn Database>(|db| db)
        .constructor(Signature::new(), |_| Ok(Postgres))
        .build()
}

fn sqlite() -> Arc<ComponentDescriptor> {
    ComponentDescriptor::builder::<Sqlite>()
        .provides::<dyn Database>(|db| db)
        .constructor(Signature::new(), |_| Ok(Sqlite))
        .build()
}

#[test]
fn single_match_resolves() {
    let container = isolated(Repository::builder().register(postgres()).build());

    let db = container.resolve_one::<dyn Database>().unwrap();
    assert_eq!(db.url(), "postgres://localhost");
    assert!(container.can_resolve::<dyn Database>());
}

#[test]
fn two_candidates_are_ambiguous() {
    let container = isolated(Repository::builder().register(postgres()).register(sqlite()).build());

    match container.resolve_one::<dyn Database>().map(|_| ()) {
        Err(CompositionError::Ambiguous(err)) => {
            assert_eq!(err.candidates, vec!["Postgres", "Sqlite"]);
            assert!(err.to_string().starts_with("2 components provide dyn Database:"));
        }
        other => panic!("Expected Ambiguous, got: {other:?}"),
    }

    // try_resolve_one only forgives absence, not ambiguity.
    assert!(matches!(
        container.try_resolve_one::<dyn Database>().map(|_| ()),
        Err(CompositionError::Ambiguous(_))
    ));
}

#[test]
fn resolve_all_returns_every_candidate_in_order() {
    let container = isolated(Repository::builder().register(postgres()).register(sqlite()).build());

    let urls: Vec<String> = container
        .resolve_all::<dyn Database>()
        .unwrap()
        .iter()
        .map(|db| db.url().to_string())
        .collect();
    assert_eq!(urls, vec!["postgres://localhost", "sqlite::memory:"]);
}

#[test]
fn externals_come_first_and_count_as_candidates() {
    let repository = Repository::builder().register(postgres()).build();
    let external = ExternalInstance::of(Arc::new(Sqlite)).provides::<dyn Database>(|db| db);
    let container = Container::builder()
        .repository(repository)
        .registry(Arc::new(LifetimeRegistry::new()))
        .external(external)
        .build();

    let all = container.resolve_all::<dyn Database>().unwrap();
    assert_eq!(all[0].url(), "sqlite::memory:");
    assert_eq!(all[1].url(), "postgres://localhost");

    match container.resolve_one::<dyn Database>().map(|_| ()) {
        Err(CompositionError::Ambiguous(err)) => assert_eq!(err.candidates, vec!["Sqlite", "Postgres"]),
        other => panic!("Expected Ambiguous, got: {other:?}"),
    }
}

#[test]
fn external_alone_resolves_without_repository() {
    let shared = Arc::new(Postgres);
    let container = Container::new(
        Repository::empty(),
        vec![ExternalInstance::of(Arc::clone(&shared)).provides::<dyn Database>(|db| db).build()],
    );

    let db = container.resolve_one::<dyn Database>().unwrap();
    assert!(std::ptr::addr_eq(Arc::as_ptr(&db), Arc::as_ptr(&shared)));
    assert_eq!(container.instance_count(), 0);
}

#[test]
fn not_found_suggests_registered_interfaces() {
    trait Databse: Send + Sync {}

    let container = isolated(Repository::builder().register(postgres()).build());
    match container.resolve_one::<dyn Databse>().map(|_| ()) {
        Err(CompositionError::NotFound(err)) => {
            assert_eq!(err.suggestions, vec!["dyn Database"]);
        }
        other => panic!("Expected NotFound, got: {other:?}"),
    }
    assert!(container.try_resolve_one::<dyn Databse>().unwrap().is_none());
}

#[test]
fn missing_dependency_reports_dependent() {
    struct Reports;

    // A declared interface nobody implements only fails at resolution time.
    let repository = Repository::builder()
        .register(
            ComponentDescriptor::builder::<Reports>()
                .provides_self()
                .constructor(Signature::new().component::<dyn Database>(), |args| {
                    args.component::<dyn Database>()?;
                    Ok(Reports)
                })
                .build(),
        )
        .build();

    match isolated(repository).resolve_one::<Reports>().map(|_| ()) {
        Err(CompositionError::NoViableConstructor(err)) => {
            assert_eq!(err.component, "Reports");
            assert_eq!(err.diagnostics[0].failures[0].reason, "not a registered component interface");
        }
        other => panic!("Expected NoViableConstructor, got: {other:?}"),
    }
}

// ── Cycles ──

trait Left: Send + Sync {}
trait Right: Send + Sync {}

struct A;
impl Left for A {}

struct B;
impl Right for B {}

fn mutual(scope: Scope) -> Arc<Repository> {
    Repository::builder()
        .register(
            ComponentDescriptor::builder::<A>()
                .scope(scope)
                .provides::<dyn Left>(|a| a)
                .constructor(Signature::new().component::<dyn Right>(), |args| {
                    args.component::<dyn Right>()?;
                    Ok(A)
                })
                .build(),
        )
        .register(
            ComponentDescriptor::builder::<B>()
                .provides::<dyn Right>(|b| b)
                .constructor(Signature::new().component::<dyn Left>(), |args| {
                    args.component::<dyn Left>()?;
                    Ok(B)
                })
                .build(),
        )
        .build()
}

#[test]
fn mutual_requirement_is_circular() {
    let container = isolated(mutual(Scope::Simple));

    match container.resolve_one::<dyn Left>().map(|_| ()) {
        Err(CompositionError::CircularDependency(err)) => {
            assert_eq!(err.chain, vec!["A", "B", "A"]);
            assert!(err.to_string().contains("A → B → A"));
        }
        other => panic!("Expected CircularDependency, got: {other:?}"),
    }

    // Planning walks the same graph and finds the same cycle.
    assert!(matches!(
        container.plan_one::<dyn Left>(),
        Err(CompositionError::CircularDependency(_))
    ));
}

#[test]
fn shared_cycle_leaves_nothing_published() {
    let registry = Arc::new(LifetimeRegistry::new());
    let container = Container::builder()
        .repository(mutual(Scope::Shared))
        .registry(Arc::clone(&registry))
        .build();

    for _ in 0..2 {
        match container.resolve_one::<dyn Left>().map(|_| ()) {
            Err(CompositionError::CircularDependency(err)) => assert_eq!(err.chain, vec!["A", "B", "A"]),
            other => panic!("Expected CircularDependency, got: {other:?}"),
        }
        assert_eq!(registry.shared_len(), 0);
    }

    assert_eq!(container.instance_count(), 0);
    container.dispose().unwrap();
}

struct Relay;
impl Plugin for Relay {
    fn name(&self) -> &'static str {
        "relay"
    }
}

#[test]
fn array_over_own_interface_is_circular() {
    let repository = Repository::builder()
        .register(
            ComponentDescriptor::builder::<Relay>()
                .provides::<dyn Plugin>(|p| p)
                .constructor(Signature::new().components::<dyn Plugin>(), |args| {
                    args.components::<dyn Plugin>()?;
                    Ok(Relay)
                })
                .build(),
        )
        .build();
    let container = isolated(repository);

    match container.resolve_all::<dyn Plugin>().map(|_| ()) {
        Err(CompositionError::CircularDependency(err)) => {
            assert_eq!(err.chain, vec!["Relay", "Relay"]);
        }
        other => panic!("Expected CircularDependency, got: {other:?}"),
    }
    assert!(matches!(
        container.resolve_one::<dyn Plugin>(),
        Err(CompositionError::CircularDependency(_))
    ));
}

// ── Constructor parameters ──

struct Host {
    plugins: Vec<&'static str>,
}

#[test]
fn array_over_unimplemented_interface_is_empty() {
    let repository = Repository::builder()
        .register(
            ComponentDescriptor::builder::<Host>()
                .provides_self()
                .constructor(Signature::new().components::<dyn Plugin>(), |args| {
                    let plugins = args.components::<dyn Plugin>()?;
                    Ok(Host {
                        plugins: plugins.iter().map(|p| p.name()).collect(),
                    })
                })
                .build(),
        )
        .build();

    let host = isolated(repository).resolve_one::<Host>().unwrap();
    assert!(host.plugins.is_empty());
}

#[test]
fn array_collects_every_plugin() {
    let repository = Repository::builder()
        .register(
            ComponentDescriptor::builder::<Audit>()
                .provides::<dyn Plugin>(|p| p)
                .constructor(Signature::new(), |_| Ok(Audit))
                .build(),
        )
        .register(
            ComponentDescriptor::builder::<Tracing>()
                .provides::<dyn Plugin>(|p| p)
                .constructor(Signature::new(), |_| Ok(Tracing))
                .build(),
        )
        .register(
            ComponentDescriptor::builder::<Host>()
                .provides_self()
                .constructor(Signature::new().components::<dyn Plugin>(), |args| {
                    let plugins = args.components::<dyn Plugin>()?;
                    Ok(Host {
                        plugins: plugins.iter().map(|p| p.name()).collect(),
                    })
                })
                .build(),
        )
        .build();

    let host = isolated(repository).resolve_one::<Host>().unwrap();
    assert_eq!(host.plugins, vec!["audit", "tracing"]);
}

#[test]
fn feasible_constructor_beats_longer_infeasible_one() {
    struct Service {
        database: bool,
    }

    let repository = Repository::builder()
        .register(
            ComponentDescriptor::builder::<Service>()
                .provides_self()
                .constructor(
                    Signature::new().component::<dyn Database>().component::<dyn Plugin>(),
                    |_| Ok(Service { database: false }),
                )
                .constructor(Signature::new().component::<dyn Database>(), |args| {
                    args.component::<dyn Database>()?;
                    Ok(Service { database: true })
                })
                .build(),
        )
        .register(postgres())
        .interface::<dyn Plugin>()
        .build();

    let service = isolated(repository).resolve_one::<Service>().unwrap();
    assert!(service.database);
}

#[test]
fn constructor_errors_are_wrapped() {
    struct Flaky;

    let repository = Repository::builder()
        .register(
            ComponentDescriptor::builder::<Flaky>()
                .provides_self()
                .constructor(Signature::new(), |_| {
                    Err(CompositionError::construction_failed("Flaky", "connection refused"))
                })
                .build(),
        )
        .build();
    let container = isolated(repository);

    match container.resolve_one::<Flaky>().map(|_| ()) {
        Err(CompositionError::ConstructionFailed { component, source }) => {
            assert_eq!(component, "Flaky");
            assert_eq!(source.to_string(), "connection refused");
        }
        other => panic!("Expected ConstructionFailed, got: {other:?}"),
    }
    assert_eq!(container.instance_count(), 0);
}

#[test]
fn container_parameter_receives_weak_handle() {
    struct Locator {
        handle: ContainerHandle,
    }

    let repository = Repository::builder()
        .register(postgres())
        .register(
            ComponentDescriptor::builder::<Locator>()
                .provides_self()
                .constructor(Signature::new().container(), |args| {
                    Ok(Locator {
                        handle: args.container()?,
                    })
                })
                .build(),
        )
        .build();
    let container = isolated(repository);

    let locator = container.resolve_one::<Locator>().unwrap();
    let db = locator.handle.resolve_one::<dyn Database>().unwrap();
    assert_eq!(db.url(), "postgres://localhost");

    drop(container);
    assert!(matches!(
        locator.handle.resolve_one::<dyn Database>().map(|_| ()),
        Err(CompositionError::AlreadyDisposed)
    ));
}

// ── Progress ──

struct Pool;
struct Store;
struct Api;

fn layered() -> Arc<Repository> {
    Repository::builder()
        .register(
            ComponentDescriptor::builder::<Pool>()
                .provides_self()
                .constructor(Signature::new(), |_| Ok(Pool))
                .build(),
        )
        .register(
            ComponentDescriptor::builder::<Store>()
                .provides_self()
                .constructor(Signature::new().component::<Pool>(), |args| {
                    args.component::<Pool>()?;
                    Ok(Store)
                })
                .build(),
        )
        .register(
            ComponentDescriptor::builder::<Api>()
                .provides_self()
                .constructor(Signature::new().component::<Store>().component::<Pool>(), |args| {
                    args.component::<Store>()?;
                    args.component::<Pool>()?;
                    Ok(Api)
                })
                .build(),
        )
        .build()
}

#[test]
fn progress_reports_each_construction_dependencies_first() {
    let container = isolated(layered());

    let plan = container.plan_one::<Api>().unwrap();
    assert_eq!(plan.names(), vec!["Pool", "Store", "Api"]);

    let mut seen = Vec::new();
    container
        .resolve_one_with_progress::<Api>(|total, current, name| {
            seen.push((total, current, name.to_string()));
        })
        .unwrap();
    assert_eq!(
        seen,
        vec![
            (3, 0, "Pool".to_string()),
            (3, 1, "Store".to_string()),
            (3, 2, "Api".to_string()),
        ]
    );
    assert_eq!(container.instance_count(), 3);

    // Everything is built now; a second resolution constructs nothing.
    let mut calls = 0;
    container
        .resolve_one_with_progress::<Api>(|_, _, _| calls += 1)
        .unwrap();
    assert_eq!(calls, 0);
    assert!(container.plan_one::<Api>().unwrap().is_empty());
}

#[test]
fn progress_for_resolve_all_counts_only_unbuilt() {
    let container = isolated(layered());
    container.resolve_one::<Pool>().unwrap();

    let mut names = Vec::new();
    let stores = container
        .resolve_all_with_progress::<Store>(|total, _, name| {
            assert_eq!(total, 1);
            names.push(name.to_string());
        })
        .unwrap();
    assert_eq!(stores.len(), 1);
    assert_eq!(names, vec!["Store"]);
}

#[test]
fn try_resolve_with_progress_tolerates_absence() {
    let container = isolated(Repository::empty());
    let found = container
        .try_resolve_one_with_progress::<dyn Database>(|_, _, _| panic!("nothing to build"))
        .unwrap();
    assert!(found.is_none());
}

// ── Back references ──

trait Parent: Send + Sync {
    fn child_name(&self) -> Option<&'static str>;
}

trait Child: Send + Sync {
    fn name(&self) -> &'static str;
    fn parent(&self) -> Option<Arc<dyn Parent>>;

    fn has_parent(&self) -> bool {
        self.parent().is_some()
    }
}

#[derive(Default)]
struct Window {
    child: OnceLock<Arc<dyn Child>>,
}

impl Parent for Window {
    fn child_name(&self) -> Option<&'static str> {
        self.child.get().map(|child| child.name())
    }
}

#[derive(Default)]
struct Button {
    parent: Mutex<Option<Weak<dyn Parent>>>,
}

impl Child for Button {
    fn name(&self) -> &'static str {
        "button"
    }

    fn parent(&self) -> Option<Arc<dyn Parent>> {
        self.parent.lock().unwrap().as_ref().and_then(Weak::upgrade)
    }
}

fn window(scope: Scope, construct: impl Fn() + Send + Sync + 'static) -> Arc<ComponentDescriptor> {
    ComponentDescriptor::builder::<Window>()
        .scope(scope)
        .provides::<dyn Parent>(|w| w)
        .constructor(Signature::new(), move |_| {
            construct();
            Ok(Window::default())
        })
        .back_reference::<dyn Child>(|window, child| {
            let _ = window.child.set(child);
        })
        .build()
}

fn button() -> Arc<ComponentDescriptor> {
    ComponentDescriptor::builder::<Button>()
        .provides::<dyn Child>(|b| b)
        .constructor(Signature::new(), |_| Ok(Button::default()))
        .back_reference::<dyn Parent>(|button, parent| {
            *button.parent.lock().unwrap() = Some(Arc::downgrade(&parent));
        })
        .build()
}

fn window_and_button() -> Arc<Repository> {
    Repository::builder()
        .register(window(Scope::Simple, || {}))
        .register(button())
        .build()
}

#[test]
fn back_references_fill_both_directions() {
    let container = isolated(window_and_button());

    let window = container.resolve_one::<dyn Parent>().unwrap();
    assert_eq!(window.child_name(), None);

    let button = container.resolve_one::<dyn Child>().unwrap();
    assert_eq!(window.child_name(), Some("button"));
    assert!(button.has_parent());
}

#[test]
fn back_references_stay_within_one_container() {
    let repository = window_and_button();
    let first = isolated(Arc::clone(&repository));
    let second = isolated(repository);

    let window = first.resolve_one::<dyn Parent>().unwrap();
    let button = second.resolve_one::<dyn Child>().unwrap();

    assert_eq!(window.child_name(), None);
    assert!(!button.has_parent());
}

#[test]
fn back_references_follow_the_published_shared_object() {
    // Both constructors run before either object is published.
    let barrier = Arc::new(Barrier::new(2));
    let repository = Repository::builder()
        .register(window(Scope::Shared, move || {
            barrier.wait();
        }))
        .register(button())
        .build();
    let registry = Arc::new(LifetimeRegistry::new());
    let containers: Vec<Container> = (0..2)
        .map(|_| {
            Container::builder()
                .repository(Arc::clone(&repository) as Arc<dyn ComponentRepository>)
                .registry(Arc::clone(&registry))
                .build()
        })
        .collect();
    let buttons: Vec<Arc<dyn Child>> = containers
        .iter()
        .map(|container| container.resolve_one::<dyn Child>().unwrap())
        .collect();

    let windows: Vec<Arc<dyn Parent>> = thread::scope(|scope| {
        let handles: Vec<_> = containers
            .iter()
            .map(|container| scope.spawn(move || container.resolve_one::<dyn Parent>().unwrap()))
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    assert!(std::ptr::addr_eq(Arc::as_ptr(&windows[0]), Arc::as_ptr(&windows[1])));
    for (button, window) in buttons.iter().zip(&windows) {
        let parent = button.parent().expect("button wired to the shared window");
        assert!(std::ptr::addr_eq(Arc::as_ptr(&parent), Arc::as_ptr(window)));
    }
    assert_eq!(windows[0].child_name(), Some("button"));
}

// ── Configuration and disposal ──

#[test]
fn resolution_after_dispose_fails() {
    let container = isolated(Repository::builder().register(postgres()).build());
    container.dispose().unwrap();

    assert!(matches!(
        container.resolve_one::<dyn Database>().map(|_| ()),
        Err(CompositionError::AlreadyDisposed)
    ));
    assert!(matches!(
        container.resolve_all::<dyn Database>().map(|_| ()),
        Err(CompositionError::AlreadyDisposed)
    ));
    assert!(matches!(container.dispose(), Err(CompositionError::AlreadyDisposed)));
}
