//! Experiment simulator
//!
//! Produces a timed series of synthetic well readings under a contamination
//! scenario, reads each well out through both the statistical classifier and
//! the LLM judge, and stores the finished experiment in memory. The two
//! verdicts stay side by side in every snapshot; disagreement is data.

use crate::classifier::{ClassLabel, ClassifierVerdict, WellClassifier, WellMeasurement};
use crate::error::{Error, Result};
use crate::vision::{JudgeVerdict, WellJudge};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// Well positions used by every experiment.
pub const WELLS: [&str; 3] = ["A1", "A2", "A3"];

const DEFAULT_NUM_TIMEPOINTS: usize = 6;
const DEFAULT_INTERVAL_SECONDS: u64 = 10;
const MAX_NUM_TIMEPOINTS: usize = 100;

/// Contamination schedule for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    /// A1 turns at timepoint 3, A2 at 5, A3 stays clean
    #[default]
    Gradual,
    /// A2 turns at timepoint 2, the rest stay clean
    Sudden,
    /// No contamination anywhere
    Clean,
    /// Independent random onset per well (possibly never)
    Random,
}

/// Simulation parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    /// Contamination scenario
    #[serde(default)]
    pub scenario: Scenario,
    /// Number of observation timepoints
    #[serde(default = "default_num_timepoints")]
    pub num_timepoints: usize,
    /// Seconds between timepoints (logical time on the readout)
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
    /// Noise seed; omit for a fresh run each time
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_num_timepoints() -> usize {
    DEFAULT_NUM_TIMEPOINTS
}

fn default_interval_seconds() -> u64 {
    DEFAULT_INTERVAL_SECONDS
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            scenario: Scenario::default(),
            num_timepoints: DEFAULT_NUM_TIMEPOINTS,
            interval_seconds: DEFAULT_INTERVAL_SECONDS,
            seed: None,
        }
    }
}

/// One well at one timepoint, with both readouts.
#[derive(Debug, Clone, Serialize)]
pub struct WellSnapshot {
    /// Well position
    pub well_id: String,
    /// The synthetic reading
    pub measurement: WellMeasurement,
    /// Statistical classifier verdict
    pub statistical: ClassifierVerdict,
    /// LLM judge verdict
    pub llm: JudgeVerdict,
}

/// One observation round over all wells.
#[derive(Debug, Clone, Serialize)]
pub struct Timepoint {
    /// Timepoint index, starting at 0
    pub index: usize,
    /// Logical seconds since experiment start
    pub time_seconds: u64,
    /// Per-well snapshots, in `WELLS` order
    pub wells: Vec<WellSnapshot>,
}

/// A finished simulated experiment.
#[derive(Debug, Clone, Serialize)]
pub struct Experiment {
    /// Experiment id
    pub id: Uuid,
    /// Scenario the run used
    pub scenario: Scenario,
    /// When the run was generated
    pub created_at: DateTime<Utc>,
    /// Seconds between timepoints
    pub interval_seconds: u64,
    /// Ordered observation rounds
    pub timepoints: Vec<Timepoint>,
}

/// Simulator over a classifier and an LLM judge.
pub struct ExperimentSimulator {
    classifier: Arc<dyn WellClassifier>,
    judge: WellJudge,
}

impl ExperimentSimulator {
    /// Create a simulator from its two readout backends.
    pub fn new(classifier: Arc<dyn WellClassifier>, judge: WellJudge) -> Self {
        Self { classifier, judge }
    }

    /// Run one experiment.
    ///
    /// Once a well's reported statistical label is contaminated it stays
    /// contaminated for the rest of the run; classifier jitter back toward
    /// clean is clamped, with confidence floored at the decision threshold.
    pub async fn run(&self, config: SimulationConfig) -> Result<Experiment> {
        if config.num_timepoints == 0 || config.num_timepoints > MAX_NUM_TIMEPOINTS {
            return Err(Error::InvalidConfig(format!(
                "num_timepoints must be within 1..={}, got {}",
                MAX_NUM_TIMEPOINTS, config.num_timepoints
            )));
        }
        if config.interval_seconds == 0 {
            return Err(Error::InvalidConfig(
                "interval_seconds must be positive".to_string(),
            ));
        }

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let onsets = onset_schedule(config.scenario, config.num_timepoints, &mut rng);
        let id = Uuid::new_v4();
        info!(experiment_id = %id, scenario = ?config.scenario,
              timepoints = config.num_timepoints, "simulating experiment");

        let mut reported: HashMap<&str, bool> = WELLS.iter().map(|w| (*w, false)).collect();
        let mut timepoints = Vec::with_capacity(config.num_timepoints);

        for index in 0..config.num_timepoints {
            let mut wells = Vec::with_capacity(WELLS.len());
            for well_id in WELLS {
                let onset = onsets.get(well_id).copied().flatten();
                let truly_contaminated = onset.map(|at| index >= at).unwrap_or(false);
                let measurement =
                    synthesize(well_id, index, onset, truly_contaminated, &mut rng);

                let mut statistical = self.classifier.classify(&measurement);
                let already = reported
                    .get_mut(well_id)
                    .map(|flag| {
                        let was = *flag;
                        *flag = was || statistical.label == ClassLabel::Contaminated;
                        was
                    })
                    .unwrap_or(false);
                if already && statistical.label == ClassLabel::Clean {
                    debug!(well = well_id, index, "clamping classifier jitter");
                    statistical = ClassifierVerdict {
                        label: ClassLabel::Contaminated,
                        confidence: (1.0 - statistical.confidence).max(0.5),
                    };
                }

                let llm = self.judge.judge(&measurement).await;
                wells.push(WellSnapshot {
                    well_id: well_id.to_string(),
                    measurement,
                    statistical,
                    llm,
                });
            }
            timepoints.push(Timepoint {
                index,
                time_seconds: index as u64 * config.interval_seconds,
                wells,
            });
        }

        Ok(Experiment {
            id,
            scenario: config.scenario,
            created_at: Utc::now(),
            interval_seconds: config.interval_seconds,
            timepoints,
        })
    }
}

/// Per-well contamination onset index; `None` means the well stays clean.
fn onset_schedule(
    scenario: Scenario,
    num_timepoints: usize,
    rng: &mut StdRng,
) -> HashMap<&'static str, Option<usize>> {
    WELLS
        .iter()
        .map(|well| {
            let onset = match scenario {
                Scenario::Gradual => match *well {
                    "A1" => Some(3),
                    "A2" => Some(5),
                    _ => None,
                },
                Scenario::Sudden => match *well {
                    "A2" => Some(2),
                    _ => None,
                },
                Scenario::Clean => None,
                Scenario::Random => {
                    // num_timepoints as onset means never turning
                    let at = rng.gen_range(0..=num_timepoints);
                    (at < num_timepoints).then_some(at)
                }
            };
            (*well, onset)
        })
        .collect()
}

/// Synthesize a reading. Contaminated wells drift further from the clean
/// baseline the longer they have been contaminated.
fn synthesize(
    well_id: &str,
    index: usize,
    onset: Option<usize>,
    contaminated: bool,
    rng: &mut StdRng,
) -> WellMeasurement {
    if contaminated {
        let progress = onset.map(|at| (index - at) as f32).unwrap_or(0.0);
        WellMeasurement {
            well_id: well_id.to_string(),
            turbidity: (0.55 + 0.08 * progress + rng.gen_range(0.0f32..0.05)).min(1.0),
            texture_variance: (0.45 + 0.06 * progress + rng.gen_range(0.0f32..0.05)).min(1.0),
        }
    } else {
        WellMeasurement {
            well_id: well_id.to_string(),
            turbidity: 0.08 + rng.gen_range(0.0f32..0.08),
            texture_variance: 0.04 + rng.gen_range(0.0f32..0.06),
        }
    }
}

/// In-memory experiment store.
pub struct ExperimentStore {
    experiments: RwLock<HashMap<Uuid, Experiment>>,
}

impl ExperimentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            experiments: RwLock::new(HashMap::new()),
        }
    }

    /// Store an experiment.
    pub async fn insert(&self, experiment: Experiment) {
        self.experiments
            .write()
            .await
            .insert(experiment.id, experiment);
    }

    /// Fetch an experiment by id.
    pub async fn get(&self, id: Uuid) -> Result<Experiment> {
        self.experiments
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("experiment {} not found", id)))
    }
}

impl Default for ExperimentStore {
    fn default() -> Self {
        Self::new()
    }
}
