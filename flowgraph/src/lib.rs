//! # Flowgraph
//!
//! Compose flowgraph declarations through an immutable builder, search a
//! function catalog and mirror an engine's run into immutable snapshots.
//!
//! ## Features
//!
//! - `bridge` (default): executable conversion and the runtime bridge
//! - `inproc` (default): scripted in-process engine for the bridge
//! - `logger` (default): tracing setup and session summaries
//! - `cli`: the `flowgraph-cli` binary
//!
//! ## Quick Start
//!
//! ```rust
//! use flowgraph::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let builder = DeclarationBuilder::new("Counter", "Counts to three")
//!         .append_step(Step::declare("counter", 0.0))?
//!         .set_field(DeclarationField::ReturnIdentifier, "counter");
//!
//!     let declaration = builder.build();
//!     assert_eq!(declaration.step_count(), 1);
//!     println!("{}", declaration.to_json_pretty()?);
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub use flowgraph_catalog as catalog;
pub use flowgraph_context as context;
pub use flowgraph_core::*;

#[cfg(feature = "bridge")]
#[cfg_attr(docsrs, doc(cfg(feature = "bridge")))]
pub use flowgraph_bridge as bridge;

#[cfg(feature = "logger")]
#[cfg_attr(docsrs, doc(cfg(feature = "logger")))]
pub use flowgraph_logger as logger;

/// Prelude module for easy imports
pub mod prelude {
    pub use flowgraph_catalog::prelude::*;
    pub use flowgraph_context::{EditSession, SessionError, SharedSession};
    pub use flowgraph_core::prelude::*;

    #[cfg(feature = "bridge")]
    #[cfg_attr(docsrs, doc(cfg(feature = "bridge")))]
    pub use flowgraph_bridge::{
        ConvertOptions, DeclarationConverter, Dialect, EngineStatus,
        ExecutableFlowgraph, ExecutionFlowConverter, FlowgraphEngine,
        FunctionConverter, RuntimeBridge, RuntimeSnapshot,
    };

    #[cfg(feature = "inproc")]
    #[cfg_attr(docsrs, doc(cfg(feature = "inproc")))]
    pub use flowgraph_bridge::inproc::ScriptedEngine;

    #[cfg(feature = "logger")]
    #[cfg_attr(docsrs, doc(cfg(feature = "logger")))]
    pub use flowgraph_logger::Logger;
}
