//! LCR meter CLI: impedance measurement on a stimulus/acquisition board.
//!
//! This is the main entry point for the LCR measurement tool.

mod config;
mod orchestrator;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use lib_board::{AutoConfirm, FileProgress, LogProgress, PhaseGate, SimulatedBoard};
use lib_types::signal::{WaveformShape, WaveformSpec};
use lib_types::sweep::CalibPhase;
use lib_types::units::{Hertz, Volts};
use std::io::{self, BufRead};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "lcr")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an impedance measurement
    Measure {
        /// Path to the measurement configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Output directory for results
        #[arg(short, long, default_value = "lcr_data")]
        output: PathBuf,

        /// File to overwrite with the completion percentage during the run
        #[arg(long)]
        progress_file: Option<PathBuf>,
    },

    /// Show the sweep a configuration would run, without touching the board
    Plan {
        /// Path to the measurement configuration file
        config: PathBuf,
    },

    /// Synthesize a stimulus buffer and print its generator parameters
    Synth {
        /// Waveform shape
        #[arg(short, long, default_value = "sine")]
        shape: Shape,

        /// Peak amplitude (V)
        #[arg(short, long, default_value = "0.5")]
        amplitude: f64,

        /// Frequency (Hz)
        #[arg(long, default_value = "1000")]
        frequency: f64,

        /// Chirp end frequency (Hz), sweep shape only
        #[arg(long)]
        sweep_end: Option<f64>,

        /// Output file path for the sample codes
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum Shape {
    #[default]
    Sine,
    Square,
    Triangle,
    Sweep,
    Constant,
}

impl From<Shape> for WaveformShape {
    fn from(shape: Shape) -> Self {
        match shape {
            Shape::Sine => WaveformShape::Sine,
            Shape::Square => WaveformShape::Square,
            Shape::Triangle => WaveformShape::Triangle,
            Shape::Sweep => WaveformShape::Sweep,
            Shape::Constant => WaveformShape::Constant,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match cli.command {
        Commands::Measure {
            config,
            output,
            progress_file,
        } => {
            run_measurement(&config, &output, cli.format, progress_file)?;
        }
        Commands::Plan { config } => {
            plan_sweep(&config)?;
        }
        Commands::Synth {
            shape,
            amplitude,
            frequency,
            sweep_end,
            output,
        } => {
            synthesize_waveform(shape, amplitude, frequency, sweep_end, output)?;
        }
    }

    Ok(())
}

fn run_measurement(
    config_path: &PathBuf,
    output_dir: &PathBuf,
    format: OutputFormat,
    progress_file: Option<PathBuf>,
) -> Result<()> {
    tracing::info!("Loading configuration from {:?}", config_path);

    let config = config::load_config(config_path)?;

    // The software front end stands in for the hardware; a real backend
    // implements the same Board trait.
    let mut board =
        SimulatedBoard::new(config.dut.into(), config.shunt()).with_dc_bias(config.dc_bias());

    // The wait flag is consumed here: the orchestrator only sees the gate.
    let mut gate: Box<dyn PhaseGate> = if config.wait_between_phases {
        Box::new(ConsoleGate::new())
    } else {
        Box::new(AutoConfirm)
    };

    let results = match progress_file {
        Some(path) => {
            let mut progress = FileProgress::new(path);
            orchestrator::Orchestrator::new(config, &mut board, &mut progress, &mut gate)?.run()?
        }
        None => {
            let mut progress = LogProgress;
            orchestrator::Orchestrator::new(config, &mut board, &mut progress, &mut gate)?.run()?
        }
    };

    // Create output directory
    std::fs::create_dir_all(output_dir)?;

    output::write_results(&results, output_dir, format)?;
    output::print_results(&results);

    tracing::info!("Measurement complete. Results written to {:?}", output_dir);
    Ok(())
}

/// Holds the run on the console while the operator changes fixtures.
/// Reaching end of input counts as confirmation, so piped and headless
/// runs proceed unattended.
struct ConsoleGate<R> {
    reader: R,
}

impl ConsoleGate<io::StdinLock<'static>> {
    fn new() -> Self {
        ConsoleGate::with_reader(io::stdin().lock())
    }
}

impl<R: BufRead> ConsoleGate<R> {
    fn with_reader(reader: R) -> Self {
        ConsoleGate { reader }
    }
}

impl<R: BufRead> PhaseGate for ConsoleGate<R> {
    fn confirm(&mut self, phase: CalibPhase) -> io::Result<()> {
        println!(
            "Next phase: {}. {} and press Enter to continue.",
            phase.label(),
            phase_instruction(phase)
        );
        let mut line = String::new();
        self.reader.read_line(&mut line)?;
        Ok(())
    }
}

fn phase_instruction(phase: CalibPhase) -> &'static str {
    match phase {
        CalibPhase::Short => "Short the probe leads",
        CalibPhase::Open => "Leave the probe leads open",
        CalibPhase::ReferenceLoad => "Connect the reference load",
        CalibPhase::Measure => "Connect the device under test",
    }
}

fn plan_sweep(config_path: &PathBuf) -> Result<()> {
    let config = config::load_config(config_path)?;
    let plan = config.sweep_plan()?;

    println!("Sweep plan: {}", config.name);
    println!("  Kind:             {:?}", config.sweep.kind);
    println!("  Steps:            {}", plan.steps());
    println!("  Warm-up cycles:   {}", plan.warmup_frequencies().len());
    println!("  Cycles per phase: {}", plan.total_cycles());
    println!("  Phases:           {}", config.calibration.phases().len());
    println!();
    println!("  step    frequency_hz    decimation    samples");
    for (i, step) in plan.measurement_steps()?.iter().enumerate() {
        println!(
            "  {:>4}    {:>12.2}    {:>10}    {:>7}",
            i,
            step.frequency.0,
            step.decimation.factor(),
            step.sample_count
        );
    }

    Ok(())
}

fn synthesize_waveform(
    shape: Shape,
    amplitude: f64,
    frequency: f64,
    sweep_end: Option<f64>,
    output: Option<PathBuf>,
) -> Result<()> {
    use lib_types::device::{MAX_AMPLITUDE, MAX_FREQUENCY};

    if !(0.0..=MAX_AMPLITUDE).contains(&amplitude) {
        anyhow::bail!(
            "Invalid amplitude: {} V. Must be within [0, {}]",
            amplitude,
            MAX_AMPLITUDE
        );
    }
    if !(frequency > 0.0 && frequency <= MAX_FREQUENCY.0) {
        anyhow::bail!(
            "Invalid frequency: {} Hz. Must be within (0, {}]",
            frequency,
            MAX_FREQUENCY.0
        );
    }
    let sweep_end = match (shape, sweep_end) {
        (Shape::Sweep, None) => anyhow::bail!("The sweep shape needs --sweep-end"),
        (Shape::Sweep, Some(end)) => {
            if !(end > 0.0 && end <= MAX_FREQUENCY.0) || end == frequency {
                anyhow::bail!("Invalid chirp range: {} Hz to {} Hz", frequency, end);
            }
            end
        }
        _ => 0.0,
    };

    let spec = WaveformSpec {
        amplitude: Volts(amplitude),
        frequency: Hertz(frequency),
        shape: shape.into(),
        sweep_end: Hertz(sweep_end),
    };
    let (buffer, params) = lib_dsp::synthesis::synthesize(&spec);

    println!("Synthesized {:?} stimulus:", spec.shape);
    println!("  Samples:  {}", buffer.len());
    println!("  Step:     0x{:08x}", params.step);
    println!("  Wrap:     0x{:08x}", params.wrap);
    println!("  Offsgain: 0x{:08x}", params.offsgain);

    if let Some(output_path) = output {
        let mut writer = std::fs::File::create(&output_path)?;
        use std::io::Write;
        writeln!(writer, "sample,code")?;
        for (i, &code) in buffer.codes().iter().enumerate() {
            writeln!(writer, "{},{}", i, code)?;
        }
        println!("  Written to: {:?}", output_path);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_gate_consumes_one_line_per_phase() {
        let input = io::Cursor::new(b"\n\n".to_vec());
        let mut gate = ConsoleGate::with_reader(input);
        assert!(gate.confirm(CalibPhase::Short).is_ok());
        assert!(gate.confirm(CalibPhase::Open).is_ok());
    }

    #[test]
    fn test_console_gate_confirms_at_end_of_input() {
        let mut gate = ConsoleGate::with_reader(io::Cursor::new(Vec::new()));
        for phase in CalibPhase::ALL {
            assert!(gate.confirm(phase).is_ok());
        }
    }
}
