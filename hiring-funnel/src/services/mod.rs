//! Service layer.

mod container;

pub use container::ServiceContainer;
