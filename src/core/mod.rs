//! Dashboard store, persistence, widget creation, bindings and rotation

mod auto_rotate;
mod binding;
mod binding_manager;
mod error;
mod persistence;
mod store;
mod widget_builder;

pub use auto_rotate::AutoRotateController;
pub use binding::{BindingOptions, BindingState, DataBinding};
pub use binding_manager::BindingManager;
pub use error::DashboardError;
pub use persistence::{parse_state, JsonFileStore, MemoryStore, StateStore, STATE_KEY};
pub use store::{AutoRotateUpdate, DashboardStore, DashboardUpdate, SharedStore};
pub use widget_builder::create_widget;
