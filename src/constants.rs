pub const PRN_CODE_LEN: usize = 1023;
pub const NUM_GPS_SATS: usize = 32;

pub const L1CA_HZ: f64 = 1575.42e6;
pub const L1CA_CHIP_RATE_HZ: f64 = 1.023e6;
pub const L1CA_CODE_SEC: f64 = 1e-3;

pub const DEFAULT_SAMPLE_RATE: f64 = 4e6;
pub const DEFAULT_NUM_PERIODS: usize = 2;
pub const MAX_COHERENT_PERIODS: usize = 10; // coherent integration depth cap
pub const DOPPLER_SPREAD_HZ: f64 = 30_000.0; // +-5kHz sat motion plus LO error
pub const DOPPLER_STEP_HZ: f64 = 250.0;
pub const SNR_THRESHOLD: f64 = 10.0;
