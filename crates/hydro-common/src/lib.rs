//! Common types shared across the hydrometeor classification workspace.

pub mod error;
pub mod grid;
pub mod hydrometeor;
pub mod observable;

pub use error::{HydroError, HydroResult};
pub use grid::{BinShape, Field, FieldSet};
pub use hydrometeor::{HydrometeorClass, HydrometeorRegistry};
pub use observable::{standard_bindings, ObservableBinding, ObservableKind};
