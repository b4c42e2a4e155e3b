//! Pod placement analysis library
//!
//! This crate reconstructs, per owning controller, the chains in which pods
//! were deleted and replaced:
//! - Record store for pod lifecycle observations and snapshots
//! - Displacement chain reconstruction (dedup, matching, chain assembly)
//! - Ingestion adapter for Kubernetes pod objects
//! - Reports, scheduled recomputation, health checks and observability

pub mod analyzer;
pub mod displacement;
pub mod error;
pub mod health;
pub mod ingest;
pub mod models;
pub mod observability;
pub mod report;
pub mod scheduler;
pub mod store;

pub use analyzer::{PlacementAnalyzer, RecomputeSummary};
pub use displacement::{Chain, Displacements, Edge, OwnerDisplacements};
pub use error::{AnalyzerError, Result};
pub use health::{ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse};
pub use models::*;
pub use observability::{AnalyzerMetrics, StructuredLogger};
pub use report::{ChainReport, DisplacementReport, OwnerReport, PodHop, ReportFilter};
