//! # fadc_eventer_cli
//!
//! Command-line front end for the fadc_eventer library.
//!
//! Reads a file of length-prefixed raw time-frame buffers, decodes and
//! identifies events per the YAML configuration, and writes the identified
//! frames to a wire-format output file.
//!
//! ```bash
//! # make a template configuration
//! fadc_eventer_cli new -p config.yml
//! # process a run
//! fadc_eventer_cli -p config.yml -i run_0001.frames -o run_0001.events
//! ```
use clap::{Arg, Command};
use indicatif::{MultiProgress, ProgressBar};
use indicatif_log_bridge::LogWrapper;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use libfadc_eventer::config::Config;
use libfadc_eventer::frame::TimeFrameSet;
use libfadc_eventer::process::FrameProcessor;
use libfadc_eventer::wire::WireCodec;

fn make_template_config(path: &Path) {
    let config = Config::default();
    let yaml_str = serde_yaml::to_string(&config).unwrap();
    let mut file = File::create(path).expect("Could create template config file!");
    file.write_all(yaml_str.as_bytes())
        .expect("Failed to write yaml data to file!");
}

/// Split a run file into raw frame buffers. Each frame is prefixed with its
/// byte length as a u32 in the configured byte order.
fn split_frames<'a>(data: &'a [u8], config: &Config) -> Result<Vec<&'a [u8]>, String> {
    let mut frames = Vec::new();
    let mut offset = 0;
    while offset < data.len() {
        if data.len() - offset < 4 {
            return Err(format!(
                "Dangling {} bytes at end of input file",
                data.len() - offset
            ));
        }
        let len = config.byte_order.read_u32(&data[offset..offset + 4]) as usize;
        offset += 4;
        if data.len() - offset < len {
            return Err(format!(
                "Frame declares {len} bytes but only {} remain",
                data.len() - offset
            ));
        }
        frames.push(&data[offset..offset + len]);
        offset += len;
    }
    Ok(frames)
}

fn main() {
    // Create a cli
    let matches = Command::new("fadc_eventer_cli")
        .arg_required_else_help(true)
        .subcommand(Command::new("new").about("Make a template configuration yaml file"))
        .arg(
            Arg::new("path")
                .short('p')
                .long("path")
                .help("Path to the configuration file"),
        )
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .help("Path to a file of length-prefixed raw time-frame buffers"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .help("Path to write identified events in wire format"),
        )
        .get_matches();

    // Initialize feedback
    let logger = simplelog::TermLogger::new(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );

    let pb_manager = MultiProgress::new();

    LogWrapper::new(pb_manager.clone(), logger)
        .try_init()
        .expect("Could not create logging/progress!");

    // Parse the cli
    let config_path = PathBuf::from(matches.get_one::<String>("path").expect("We require args"));

    match matches.subcommand() {
        Some(("new", _)) => {
            log::info!(
                "Making a template config at {}...",
                config_path.to_string_lossy()
            );

            make_template_config(&config_path);
            log::info!("Done.");
            return;
        }
        _ => (),
    }

    // Load our config
    log::info!("Loading config from {}...", config_path.to_string_lossy());
    let config = match Config::read_config_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };
    log::info!("Config successfully loaded.");
    log::info!(
        "Window: {} ns wide, {} ns step, multiplicity {} ({:?})",
        config.window_width_ns,
        config.step_ns,
        config.min_hits_in_window,
        config.multiplicity_mode
    );

    let input_path = PathBuf::from(matches.get_one::<String>("input").expect("We require args"));
    let output_path = PathBuf::from(
        matches
            .get_one::<String>("output")
            .expect("We require args"),
    );

    let processor = match FrameProcessor::new(&config) {
        Ok(p) => p,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };

    let data = match std::fs::read(&input_path) {
        Ok(d) => d,
        Err(e) => {
            log::error!("Could not read input file: {e}");
            return;
        }
    };
    log::info!(
        "Processing {} of raw frames from {}...",
        human_bytes::human_bytes(data.len() as f64),
        input_path.to_string_lossy()
    );

    let frames = match split_frames(&data, &config) {
        Ok(f) => f,
        Err(e) => {
            log::error!("Input file is malformed: {e}");
            return;
        }
    };

    // Setup the progress bar
    let pb = pb_manager.add(ProgressBar::new(frames.len() as u64));
    let mut identified = TimeFrameSet::new();
    let mut bad_frames = 0u64;
    let mut control_frames = 0u64;
    for raw in &frames {
        match processor.process_buffer(raw) {
            Ok(outcome) => {
                if outcome.control {
                    control_frames += 1;
                }
                if let Some(frame) = outcome.identified {
                    identified.add_frame(frame);
                }
            }
            Err(e) => {
                // a structural error aborts this frame only
                log::warn!("Skipping malformed frame: {e}");
                bad_frames += 1;
            }
        }
        pb.inc(1);
    }
    pb.finish();

    let codec = WireCodec::new(config.wire_layout);
    let bytes = match codec.encode(&identified) {
        Ok(b) => b,
        Err(e) => {
            log::error!("Failed to encode events: {e}");
            return;
        }
    };
    if let Err(e) = std::fs::write(&output_path, &bytes) {
        log::error!("Could not write output file: {e}");
        return;
    }

    let stats = processor.stats();
    let total_hits: usize = identified.frames.iter().map(|f| f.hit_count()).sum();
    log::info!("{}", stats.summary());
    log::info!(
        "Read {} frames ({control_frames} control, {bad_frames} malformed); wrote {total_hits} hits ({}) to {}",
        frames.len(),
        human_bytes::human_bytes(bytes.len() as f64),
        output_path.to_string_lossy()
    );
    log::info!("Done.");
}
