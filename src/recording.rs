use colored::Colorize;
use rustfft::num_complex::Complex64;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;

use crate::error::AcquisitionError;
use crate::types::IQSample;

const BUFFER_SIZE: usize = 128 * 1024;

/// Anything that can hand out a window of baseband samples.
pub trait SampleSource {
    fn sample_rate(&self) -> f64;
    fn read_samples(&mut self, offset: usize, count: usize) -> Result<IQSample, AcquisitionError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IQFileType {
    TypePairFloat32,
    TypePairInt16,
    TypePairInt8,
    TypeOneInt8,
}

impl FromStr for IQFileType {
    type Err = String;
    fn from_str(input: &str) -> Result<IQFileType, Self::Err> {
        match input {
            "2xf32" => Ok(IQFileType::TypePairFloat32),
            "2xi16" => Ok(IQFileType::TypePairInt16),
            "2xi8" => Ok(IQFileType::TypePairInt8),
            "i8" => Ok(IQFileType::TypeOneInt8),
            _ => Err(format!("Failed to parse {}", input)),
        }
    }
}

impl fmt::Display for IQFileType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            IQFileType::TypePairFloat32 => write!(f, "2xf32"),
            IQFileType::TypePairInt16 => write!(f, "2xi16"),
            IQFileType::TypePairInt8 => write!(f, "2xi8"),
            IQFileType::TypeOneInt8 => write!(f, "i8"),
        }
    }
}

impl IQFileType {
    pub fn bytes_per_sample(&self) -> usize {
        match *self {
            IQFileType::TypePairFloat32 => 8,
            IQFileType::TypePairInt16 => 4,
            IQFileType::TypePairInt8 => 2,
            IQFileType::TypeOneInt8 => 1,
        }
    }
}

/// 2-bit quantizer: `floor(v / divisor)` clipped to -2..=1, then centered.
pub fn quantize_2bit(v: f64, divisor: f64) -> f64 {
    (v / divisor).floor().clamp(-2.0, 1.0) + 0.5
}

pub struct IQRecording {
    pub file_path: PathBuf,
    pub sample_rate: f64,
    pub file_type: IQFileType,
    /// divisor of the 2-bit quantizer applied to raw integer samples
    pub quantize: Option<f64>,
}

impl IQRecording {
    pub fn new(file_path: PathBuf, sample_rate: f64, file_type: IQFileType) -> Self {
        Self {
            file_path,
            sample_rate,
            file_type,
            quantize: None,
        }
    }

    pub fn with_quantize(mut self, divisor: f64) -> Self {
        self.quantize = Some(divisor);
        self
    }

    /// Integer sample to float, either normalized to full scale or quantized.
    fn scale(&self, raw: f64, full_scale: f64) -> f64 {
        match self.quantize {
            Some(divisor) => quantize_2bit(raw, divisor),
            None => raw / full_scale,
        }
    }

    fn decode(&self, buf: &[u8], iq_vec: &mut Vec<Complex64>) {
        match self.file_type {
            IQFileType::TypePairInt8 => {
                for b in buf.chunks_exact(2) {
                    iq_vec.push(Complex64 {
                        re: self.scale(b[0] as i8 as f64, i8::MAX as f64),
                        im: self.scale(b[1] as i8 as f64, i8::MAX as f64),
                    });
                }
            }
            IQFileType::TypeOneInt8 => {
                for &b in buf {
                    iq_vec.push(Complex64 {
                        re: self.scale(b as i8 as f64, i8::MAX as f64),
                        im: 0.0,
                    });
                }
            }
            IQFileType::TypePairInt16 => {
                for b in buf.chunks_exact(4) {
                    let i = i16::from_le_bytes([b[0], b[1]]);
                    let q = i16::from_le_bytes([b[2], b[3]]);
                    iq_vec.push(Complex64 {
                        re: self.scale(i as f64, i16::MAX as f64),
                        im: self.scale(q as f64, i16::MAX as f64),
                    });
                }
            }
            IQFileType::TypePairFloat32 => {
                for b in buf.chunks_exact(8) {
                    let i = f32::from_le_bytes([b[0], b[1], b[2], b[3]]);
                    let q = f32::from_le_bytes([b[4], b[5], b[6], b[7]]);
                    iq_vec.push(Complex64 {
                        re: i as f64,
                        im: q as f64,
                    });
                }
            }
        }
    }
}

impl SampleSource for IQRecording {
    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn read_samples(&mut self, offset: usize, count: usize) -> Result<IQSample, AcquisitionError> {
        let ts = Instant::now();
        let bps = self.file_type.bytes_per_sample();
        let mut file = File::open(&self.file_path)?;
        file.seek(SeekFrom::Start((offset * bps) as u64))?;

        let mut reader = BufReader::with_capacity(BUFFER_SIZE, file).take((count * bps) as u64);
        let mut raw = Vec::with_capacity(count * bps);
        reader.read_to_end(&mut raw)?;

        let mut iq_vec = Vec::with_capacity(count);
        self.decode(&raw, &mut iq_vec);
        if iq_vec.len() != count {
            return Err(AcquisitionError::ShortRead {
                expected: count,
                got: iq_vec.len(),
            });
        }

        log::info!(
            "{}: type={} num_samples: {} -- {:.1} msec at offset {} -- read in {} msec",
            self.file_path.display(),
            self.file_type,
            format!("{}", iq_vec.len()).yellow(),
            iq_vec.len() as f64 * 1000.0 / self.sample_rate,
            offset,
            ts.elapsed().as_millis(),
        );

        Ok(IQSample {
            iq_vec,
            ts_sec: offset as f64 / self.sample_rate,
            sample_rate: self.sample_rate,
        })
    }
}
