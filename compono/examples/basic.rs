//! Basic example of the Compono component container.
//!
//! Run with `RUST_LOG=compono_container=debug cargo run --example basic`.

use std::sync::Arc;

use compono::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

// === Define your interfaces and components ===

trait Logger: Send + Sync {
    fn log(&self, msg: &str);
}

struct ConsoleLogger;

impl Logger for ConsoleLogger {
    fn log(&self, msg: &str) {
        println!("[LOG] {msg}");
    }
}

struct Settings {
    database_url: String,
}

trait Database: Send + Sync {
    fn query(&self, sql: &str) -> String;
}

struct Postgres {
    url: String,
    logger: Arc<dyn Logger>,
}

impl Database for Postgres {
    fn query(&self, sql: &str) -> String {
        self.logger.log(&format!("Executing: {sql}"));
        format!("Results from {}", self.url)
    }
}

impl Disposable for Postgres {
    fn dispose(&self) {
        self.logger.log("Closing database connection");
    }
}

trait Plugin: Send + Sync {
    fn name(&self) -> &'static str;
}

struct AuditPlugin;
impl Plugin for AuditPlugin {
    fn name(&self) -> &'static str {
        "audit"
    }
}

struct UserService {
    db: Arc<dyn Database>,
    logger: Arc<dyn Logger>,
    plugins: Vec<Arc<dyn Plugin>>,
}

impl UserService {
    fn get_user(&self, id: u64) -> String {
        self.logger.log(&format!("Getting user {id}"));
        for plugin in &self.plugins {
            self.logger.log(&format!("  plugin {} notified", plugin.name()));
        }
        self.db.query(&format!("SELECT * FROM users WHERE id = {id}"))
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("compono_container=debug")),
        )
        .init();

    // Register components
    let repository = Repository::builder()
        .register(
            ComponentDescriptor::builder::<ConsoleLogger>()
                .scope(Scope::Singleton)
                .provides::<dyn Logger>(|logger| logger)
                .constructor(Signature::new(), |_| Ok(ConsoleLogger))
                .build(),
        )
        .register(
            ComponentDescriptor::builder::<Postgres>()
                .scope(Scope::Shared)
                .provides::<dyn Database>(|db| db)
                .disposable()
                .config(Settings {
                    database_url: "postgres://localhost/myapp".to_string(),
                })
                .constructor(
                    Signature::new().config::<Settings>().component::<dyn Logger>(),
                    |args| {
                        let settings = args.config::<Settings>()?;
                        Ok(Postgres {
                            url: settings.database_url.clone(),
                            logger: args.component::<dyn Logger>()?,
                        })
                    },
                )
                .build(),
        )
        .register(
            ComponentDescriptor::builder::<AuditPlugin>()
                .provides::<dyn Plugin>(|plugin| plugin)
                .constructor(Signature::new(), |_| Ok(AuditPlugin))
                .build(),
        )
        .register(
            ComponentDescriptor::builder::<UserService>()
                .provides_self()
                // Picked only when no Database is available.
                .constructor(Signature::new().component::<dyn Logger>(), |_| {
                    Err(CompositionError::construction_failed("UserService", "no database configured"))
                })
                .constructor(
                    Signature::new()
                        .component::<dyn Database>()
                        .component::<dyn Logger>()
                        .components::<dyn Plugin>(),
                    |args| {
                        Ok(UserService {
                            db: args.component::<dyn Database>()?,
                            logger: args.component::<dyn Logger>()?,
                            plugins: args.components::<dyn Plugin>()?,
                        })
                    },
                )
                .build(),
        )
        .build();

    let container = Container::builder()
        .repository(Arc::clone(&repository) as Arc<dyn ComponentRepository>)
        .build();

    let plan = container.plan_one::<UserService>()?;
    info!(steps = plan.len(), order = ?plan.names(), "Planned construction");

    let service = container.resolve_one_with_progress::<UserService>(|total, current, name| {
        println!("[{}/{total}] building {name}", current + 1);
    })?;
    println!("{}", service.get_user(42));

    // A second container shares the database and the logger.
    let other = Container::builder().repository(repository).build();
    let db = other.resolve_one::<dyn Database>()?;
    println!("{}", db.query("SELECT 1"));

    other.dispose()?;
    container.dispose()?;
    Ok(())
}
