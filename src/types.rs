use rustfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::code::CodeId;
use crate::error::AcquisitionError;

#[derive(Default, Clone, Debug, Serialize, Deserialize)]
pub struct DetectionResult {
    pub prn: CodeId,
    pub detected: bool,
    pub code_phase_idx: usize,
    pub code_phase_sec: f64,
    pub doppler_hz: f64,
    pub snr_doppler: f64,
    pub snr_phase: f64,
    pub score: f64,
}

impl DetectionResult {
    pub fn code_phase_usec(&self) -> f64 {
        self.code_phase_sec * 1e6
    }
}

/// One output line per searched code: the detection, or why it failed.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum SearchRecord {
    Detection(DetectionResult),
    Failure { prn: CodeId, error: String },
}

impl SearchRecord {
    pub fn new(prn: CodeId, res: &Result<DetectionResult, AcquisitionError>) -> Self {
        match res {
            Ok(res) => SearchRecord::Detection(res.clone()),
            Err(e) => SearchRecord::Failure {
                prn,
                error: e.to_string(),
            },
        }
    }

    pub fn prn(&self) -> CodeId {
        match self {
            SearchRecord::Detection(res) => res.prn,
            SearchRecord::Failure { prn, .. } => *prn,
        }
    }
}

impl fmt::Display for SearchRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SearchRecord::Detection(res) => write!(
                f,
                "prn {:2}: {} doppler {:+.0} Hz code phase {:.2} usec score {:.1}",
                res.prn,
                if res.detected { "detected" } else { "not detected" },
                res.doppler_hz,
                res.code_phase_usec(),
                res.score
            ),
            SearchRecord::Failure { prn, error } => write!(f, "prn {:2}: failed: {}", prn, error),
        }
    }
}

#[derive(Default, Clone, Debug)]
pub struct IQSample {
    pub iq_vec: Vec<Complex64>,
    pub ts_sec: f64,
    pub sample_rate: f64,
}

impl IQSample {
    pub fn new(iq_vec: Vec<Complex64>, sample_rate: f64) -> Self {
        Self {
            iq_vec,
            ts_sec: 0.0,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.iq_vec.len()
    }

    pub fn is_empty(&self) -> bool {
        self.iq_vec.is_empty()
    }

    pub fn duration_sec(&self) -> f64 {
        self.iq_vec.len() as f64 / self.sample_rate
    }
}
