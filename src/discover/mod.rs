//! Partition discovery, file-set resolution, and framework detection — the
//! layer between a target root and the set of `(file, tree)` pairs the
//! extractors consume.

pub mod fileset;
pub mod framework;
pub mod partition;

pub use fileset::{resolve_file_set, FileRoute, ResolvedFile};
pub use framework::{detect_frameworks, FrameworkDetection, FrameworkSignal};
pub use partition::{discover_partitions, Partition, PartitionKind};
