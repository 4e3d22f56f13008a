//! Parameter bank types and registry
//!
//! This module provides the fixed-schema parameter bank, the compile-time
//! registry that addresses its fields, and the error taxonomy. Concurrency
//! and persistence live in the firmware crate.

pub mod bank;
pub mod error;
pub mod registry;

pub use bank::{
    BehaviouralParams, ControllerParams, DebugParams, EstimatorParams, ModelParams,
    ParameterBank, TestParams, FORCE_DEFAULT_PARAMETERS,
};
pub use error::ParameterError;
pub use registry::{
    lookup, param_id, FieldDescriptor, FieldInfo, ParamGroup, ParamType,
    ParamValue, BANK_LENGTH, FIELD_COUNT, IMAGE_HEADER_LEN, MAX_VALUE_LEN, OFFSETS, REGISTRY,
};
