//! Step planning, execution and archive export for elastic contact-mechanics
//! analyses of surface topographies.
pub mod aggregator;
pub mod config;
pub mod datatypes;
pub mod error;
pub mod planner;
pub mod post_processor;
pub mod provenance;
pub mod runner;
pub mod solver;
pub mod storage;
pub mod topography;
pub mod validator;
pub mod workflow;

pub use config::ContactParams;
pub use datatypes::{Alert, AnalysisResult, Severity, StepPlan, StepResult, Subject, Substrate};
pub use error::{AsperityError, StoreError};
pub use post_processor::{export_zip, Archive, ExportItem};
pub use workflow::{lookup, run_analysis, BoundaryElementMethod, Workflow};
