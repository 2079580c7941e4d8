use std::collections::BTreeMap;

use crate::constants::L1CA_CHIP_RATE_HZ;
use crate::constants::NUM_GPS_SATS;
use crate::constants::PRN_CODE_LEN;
use crate::error::AcquisitionError;

pub type CodeId = u8;

// G2 output delay per PRN, 1..=210 (GPS, then SBAS/QZSS range)
const G2_DELAY: [usize; 210] = [
    5, 6, 7, 8, 17, 18, 139, 140, 141, 251, 252, 254, 255, 256, 257, 258, 469, 470, 471, 472,
    473, 474, 509, 512, 513, 514, 515, 516, 859, 860, 861, 862, 863, 950, 947, 948, 950, 67, 103,
    91, 19, 679, 225, 625, 946, 638, 161, 1001, 554, 280, 710, 709, 775, 864, 558, 220, 397, 55,
    898, 759, 367, 299, 1018, 729, 695, 780, 801, 788, 732, 34, 320, 327, 389, 407, 525, 405, 221,
    761, 260, 326, 955, 653, 699, 422, 188, 438, 959, 539, 879, 677, 586, 153, 792, 814, 446, 264,
    1015, 278, 536, 819, 156, 957, 159, 712, 885, 461, 248, 713, 126, 807, 279, 122, 197, 693, 632,
    771, 467, 647, 203, 145, 175, 52, 21, 237, 235, 886, 657, 634, 762, 355, 1012, 176, 603, 130,
    359, 595, 68, 386, 797, 456, 499, 883, 307, 127, 211, 121, 118, 163, 628, 853, 484, 289, 811,
    202, 1021, 463, 568, 904, 670, 230, 911, 684, 309, 644, 932, 12, 314, 891, 212, 185, 675, 503,
    150, 395, 345, 846, 798, 992, 357, 995, 877, 112, 144, 476, 193, 109, 445, 291, 87, 399, 292,
    901, 339, 208, 711, 189, 263, 537, 663, 942, 173, 900, 30, 500, 935, 556, 373, 85, 652, 310,
];

/// L1 C/A Gold code for `prn` as +1/-1 chips.
pub fn gen_l1ca_code(prn: CodeId) -> Result<Vec<i8>, AcquisitionError> {
    if prn == 0 || prn as usize > G2_DELAY.len() {
        return Err(AcquisitionError::UnknownCode(prn));
    }
    let mut g1 = [0i8; PRN_CODE_LEN];
    let mut g2 = [0i8; PRN_CODE_LEN];
    let mut r1 = [-1i8; 10];
    let mut r2 = [-1i8; 10];

    for i in 0..PRN_CODE_LEN {
        g1[i] = r1[9];
        g2[i] = r2[9];
        let c1 = r1[2] * r1[9];
        let c2 = r2[1] * r2[2] * r2[5] * r2[7] * r2[8] * r2[9];
        r1.rotate_right(1);
        r2.rotate_right(1);
        r1[0] = c1;
        r2[0] = c2;
    }

    let delay = G2_DELAY[prn as usize - 1];
    let code = (0..PRN_CODE_LEN)
        .map(|i| -g1[i] * g2[(PRN_CODE_LEN - delay + i) % PRN_CODE_LEN])
        .collect();
    Ok(code)
}

/// Resample a chip sequence at `sample_rate`; sample `i` takes the chip
/// active at time `i / sample_rate`.
pub fn sample_code(chips: &[i8], chip_rate: f64, sample_rate: f64, num_samples: usize) -> Vec<f64> {
    (0..num_samples)
        .map(|i| {
            let chip = (i as f64 * chip_rate / sample_rate).floor() as usize % chips.len();
            chips[chip] as f64
        })
        .collect()
}

/// Reference codes keyed by identifier, all sampled to one period length.
#[derive(Debug, Clone)]
pub struct CodeTable {
    samples_per_code: usize,
    codes: BTreeMap<CodeId, Vec<f64>>,
}

impl CodeTable {
    pub fn new(samples_per_code: usize) -> Self {
        Self {
            samples_per_code,
            codes: BTreeMap::new(),
        }
    }

    /// All GPS L1 C/A codes sampled at `sample_rate` over one `code_period_sec`.
    pub fn l1ca(sample_rate: f64, code_period_sec: f64) -> Result<Self, AcquisitionError> {
        let samples_per_code = (sample_rate * code_period_sec).round() as usize;
        let mut table = Self::new(samples_per_code);

        for prn in 1..=NUM_GPS_SATS as CodeId {
            let chips = gen_l1ca_code(prn)?;
            let samples = sample_code(&chips, L1CA_CHIP_RATE_HZ, sample_rate, samples_per_code);
            table.insert(prn, samples)?;
        }
        log::debug!(
            "code table: {} L1CA codes, {} samples per code",
            table.len(),
            samples_per_code
        );
        Ok(table)
    }

    pub fn insert(&mut self, prn: CodeId, samples: Vec<f64>) -> Result<(), AcquisitionError> {
        if samples.is_empty() {
            return Err(AcquisitionError::InvalidCode {
                prn,
                reason: "empty sequence".to_string(),
            });
        }
        if samples.len() != self.samples_per_code {
            return Err(AcquisitionError::CodeLength {
                prn,
                expected: self.samples_per_code,
                got: samples.len(),
            });
        }
        if samples.iter().any(|x| !x.is_finite()) {
            return Err(AcquisitionError::InvalidCode {
                prn,
                reason: "non-finite sample".to_string(),
            });
        }
        self.codes.insert(prn, samples);
        Ok(())
    }

    /// Restrict the table to `prns`, failing on an unknown identifier.
    pub fn select(&self, prns: &[CodeId]) -> Result<Self, AcquisitionError> {
        let mut table = Self::new(self.samples_per_code);
        for &prn in prns {
            let code = self.codes.get(&prn).ok_or(AcquisitionError::UnknownCode(prn))?;
            table.codes.insert(prn, code.clone());
        }
        Ok(table)
    }

    pub fn get(&self, prn: CodeId) -> Option<&[f64]> {
        self.codes.get(&prn).map(|v| v.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (CodeId, &[f64])> + '_ {
        self.codes.iter().map(|(&prn, v)| (prn, v.as_slice()))
    }

    pub fn ids(&self) -> Vec<CodeId> {
        self.codes.keys().copied().collect()
    }

    pub fn samples_per_code(&self) -> usize {
        self.samples_per_code
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}
