// SPDX-License-Identifier: Apache-2.0

//! # Flowgraph Bridge
//!
//! Glue between editor declarations and an external flowgraph engine:
//! converters to the engine's executable form, the engine contract and a
//! [`RuntimeBridge`] that mirrors engine events into immutable snapshots.

mod bridge;
pub mod contract;
pub mod convert;
mod error;
#[cfg(feature = "inproc")]
pub mod inproc;
mod snapshot;

pub use bridge::RuntimeBridge;
pub use contract::{
    Dialect, EngineError, EngineEvent, EngineState, EngineStatus, EventHandler,
    ExecutableFlowgraph, FlowgraphEngine, Subscription,
};
pub use convert::{
    ConvertOptions, DeclarationConverter, ExecutionFlowConverter, FunctionConverter,
};
pub use error::{BridgeError, ConvertError};
pub use snapshot::RuntimeSnapshot;
