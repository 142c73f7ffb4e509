//! Migration engine: drives a destination board through its rendered UI.
//!
//! Everything the engine does to the destination goes through the
//! [`Surface`] trait. Waiting goes through [`SettleWaiter`].

pub mod injector;
pub mod interaction;
pub mod locator;
pub mod observer;
pub mod orchestrator;
pub mod report;
pub mod retry;
pub mod settle;
pub mod simulated;
pub mod surface;

pub use injector::{ContentInjector, InjectionOutcome, InjectionTier};
pub use interaction::{Interaction, Key};
pub use locator::{ColumnHandle, ElementLocator, LocatorTier, ResolvedColumn};
pub use observer::{ActionObserver, ActionRecord, ObservedSurface};
pub use orchestrator::{CardOutcome, Migrator, ProgressEvent};
pub use report::{ItemError, MigrationReport};
pub use retry::RetryPolicy;
pub use settle::SettleWaiter;
pub use simulated::{SimBehavior, SimCard, SimColumn, SimulatedBoard};
pub use surface::{EditCommand, NodeRef, Query, Rect, Surface, SyntheticEvent, Target};
