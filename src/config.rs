use serde::{Serialize, Deserialize};

use crate::background::ModelOpts;
use crate::detect::DetectOpts;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum CpuLoad {
    OneThread,
    HalfCPUs,
    AllCPUs,
    CustomCPUs(usize),
}

impl CpuLoad {
    pub fn to_threads_count(&self) -> usize {
        match self {
            CpuLoad::OneThread     => 1,
            CpuLoad::HalfCPUs      => (num_cpus::get()/2).max(1),
            CpuLoad::AllCPUs       => num_cpus::get(),
            CpuLoad::CustomCPUs(v) => *v,
        }
    }
}

/// Full option surface of the depollution pipeline. Mirrors the parameters
/// of the consuming command-line tool (`--scale`, `--z-score`,
/// `--detection`); argument parsing itself is the tool's business.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DepolluteOpts {
    pub detection: DetectOpts,
    pub model:     ModelOpts,
    pub cpu_load:  CpuLoad,
}

impl Default for DepolluteOpts {
    fn default() -> Self {
        Self {
            detection: DetectOpts::default(),
            model:     ModelOpts::default(),
            cpu_load:  CpuLoad::HalfCPUs,
        }
    }
}
