//! Platecheck Sim - contamination experiment simulator
//!
//! Generates synthetic well readings over a timed schedule and reads each
//! well out twice: a statistical classifier verdict and an LLM verdict, kept
//! side by side so an operator can see when the two disagree.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod classifier;
pub mod error;
pub mod simulator;
pub mod vision;

pub use classifier::{
    ClassLabel, ClassifierVerdict, ThresholdClassifier, WellClassifier, WellMeasurement,
};
pub use error::{Error, Result};
pub use simulator::{
    Experiment, ExperimentSimulator, ExperimentStore, Scenario, SimulationConfig, Timepoint,
    WellSnapshot, WELLS,
};
pub use vision::{JudgeLabel, JudgeVerdict, WellJudge};
