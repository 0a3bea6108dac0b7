//! The data model shared by every extractor: common record shapes, the
//! call graph, the data-flow graph, the RLS artifact, and the root
//! `Artifact` that wraps them all.

pub mod artifact;
pub mod callgraph;
pub mod dataflow;
pub mod records;
pub mod rls;

pub use artifact::{Artifact, CodebaseInfo, CompatRange, SchemaVersion};
pub use callgraph::{CallEdge, CallGraph, CallGraphNode, CallerRef, NodeId};
pub use dataflow::{DataFlowGraph, Flow, Sink, SinkType, Source, SourceType, Transform, TransformType};
pub use rls::{MultiTenantTable, PolicyOperation, PolicyType, Query, QueryOperation, RlsArtifact, RlsPolicy};
