//! # Compono - component container for Rust
//!
//! Declare components with explicit constructor signatures, collect them in
//! a repository and let a container wire, share and dispose them.
//!
//! ```rust
//! use compono::prelude::*;
//! use std::sync::Arc;
//!
//! trait Greeter: Send + Sync {
//!     fn greet(&self) -> String;
//! }
//!
//! struct English;
//! impl Greeter for English {
//!     fn greet(&self) -> String { "hello".into() }
//! }
//!
//! let repository = Repository::builder()
//!     .register(
//!         ComponentDescriptor::builder::<English>()
//!             .provides::<dyn Greeter>(|g| g)
//!             .constructor(Signature::new(), |_| Ok(English))
//!             .build(),
//!     )
//!     .build();
//!
//! let container = Container::builder().repository(repository).build();
//! let greeter = container.resolve_one::<dyn Greeter>().unwrap();
//! assert_eq!(greeter.greet(), "hello");
//! ```

pub use compono_container::*;
pub use compono_support as support;
