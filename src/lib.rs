pub mod acquisition;
pub mod code;
pub mod config;
pub mod constants;
pub mod correlation;
pub mod detection;
pub mod doppler;
pub mod error;
pub mod recording;
pub mod template;
pub mod types;
pub mod util;
