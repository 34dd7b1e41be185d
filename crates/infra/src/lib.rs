//! Infrastructure layer: persistence, configuration, and flow orchestration.

pub mod audit_log;
pub mod config;
pub mod engine;
pub mod flow_store;


pub use engine::{
    CreatedFlow, EngineError, EngineSettings, FLOW_AGGREGATE_TYPE, FlowEngine, FlowTransition,
    SignRequest, TransitionEnvelope,
};
