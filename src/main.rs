use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use structopt::StructOpt;

use gnss_acq::acquisition::Acquisition;
use gnss_acq::code::CodeId;
use gnss_acq::code::CodeTable;
use gnss_acq::config::AcquisitionConfig;
use gnss_acq::config::default_chip_window;
use gnss_acq::constants::DEFAULT_NUM_PERIODS;
use gnss_acq::recording::IQFileType;
use gnss_acq::recording::IQRecording;
use gnss_acq::recording::SampleSource;
use gnss_acq::types::SearchRecord;

#[derive(StructOpt, Debug)]
#[structopt(name = "gnss-acq", about = "GPS L1 C/A signal acquisition")]
struct Options {
    #[structopt(long, default_value = "2013_04_04_GNSS_SIGNAL_at_CTTC_SPAIN.dat")]
    file: PathBuf,
    #[structopt(short = "t", long, default_value = "2xi16")]
    iq_file_type: IQFileType,
    #[structopt(short = "s", long, default_value = "4000000")]
    sample_rate: f64,
    #[structopt(long, default_value = "1575420000")]
    center_freq: f64,
    /// first sample of the window
    #[structopt(long, default_value = "0")]
    offset: usize,
    /// code periods in the window
    #[structopt(short = "n", long)]
    num_periods: Option<usize>,
    /// code periods tiled in the template, defaults to min(10, n/2)
    #[structopt(short = "w", long)]
    chip_window: Option<usize>,
    #[structopt(long, default_value = "30000")]
    doppler_offset: f64,
    #[structopt(long, default_value = "250")]
    doppler_step: f64,
    #[structopt(long, default_value = "10")]
    threshold: f64,
    /// 2-bit quantizer divisor for integer samples, e.g. 150
    #[structopt(short = "q", long)]
    quantize: Option<f64>,
    /// PRNs to search, all 32 when empty
    #[structopt(short = "p", long)]
    prn: Vec<CodeId>,
    /// search PRNs concurrently and print once all are done
    #[structopt(long)]
    parallel: bool,
    /// one JSON record per PRN on stdout
    #[structopt(long)]
    json: bool,
}

impl Options {
    fn config(&self) -> AcquisitionConfig {
        let num_periods = self.num_periods.unwrap_or(DEFAULT_NUM_PERIODS);
        AcquisitionConfig {
            sample_rate: self.sample_rate,
            center_freq: self.center_freq,
            num_periods,
            chip_window: self.chip_window.unwrap_or(default_chip_window(num_periods)),
            doppler_offset_hz: self.doppler_offset,
            doppler_step_hz: self.doppler_step,
            threshold: self.threshold,
            ..Default::default()
        }
    }
}

fn print_record(rec: &SearchRecord, json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string(rec)?);
    } else {
        match rec {
            SearchRecord::Detection(res) if res.detected => println!("{}", format!("{}", rec).green()),
            _ => println!("{}", rec),
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opt = Options::from_args();
    let cfg = opt.config();

    log::info!(
        "gnss-acq: file: {} type={} fs={} fc={}",
        opt.file.display(),
        opt.iq_file_type,
        cfg.sample_rate,
        cfg.center_freq
    );

    let needs_stop = Arc::new(AtomicBool::new(false));
    let needs_stop_clone = needs_stop.clone();
    ctrlc::set_handler(move || {
        log::warn!("ctrl-c: stopping after the current PRN");
        needs_stop_clone.store(true, Ordering::SeqCst);
    })?;

    let acq = Acquisition::new(cfg.clone())?;

    let mut recording = IQRecording::new(opt.file.clone(), cfg.sample_rate, opt.iq_file_type);
    if let Some(divisor) = opt.quantize {
        recording = recording.with_quantize(divisor);
    }
    let sample = recording.read_samples(opt.offset, cfg.fft_len())?;

    let mut table = CodeTable::l1ca(recording.sample_rate(), cfg.code_period_sec)?;
    if !opt.prn.is_empty() {
        table = table.select(&opt.prn)?;
    }

    let ts = Instant::now();
    let mut results = Vec::with_capacity(table.len());
    if opt.parallel {
        let all = acq.search_all(&sample, &table)?;
        for (prn, res) in table.ids().into_iter().zip(all) {
            print_record(&SearchRecord::new(prn, &res), opt.json)?;
            results.push(res);
        }
    } else {
        let signal_fft = acq.signal_spectrum(&sample)?;
        for ((prn, _), res) in table.iter().zip(acq.search(&signal_fft, &table)) {
            print_record(&SearchRecord::new(prn, &res), opt.json)?;
            results.push(res);
            if needs_stop.load(Ordering::SeqCst) {
                break;
            }
        }
    }

    let num_detected = results
        .iter()
        .filter(|r| matches!(r, Ok(res) if res.detected))
        .count();
    let num_failed = results.iter().filter(|r| r.is_err()).count();

    log::info!(
        "acq. took {} msec: {} prn searched, {} detected, {} failed",
        ts.elapsed().as_millis(),
        results.len(),
        format!("{}", num_detected).green(),
        num_failed
    );

    Ok(())
}
