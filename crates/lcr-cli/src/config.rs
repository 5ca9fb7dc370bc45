//! Measurement configuration loading and validation.

use anyhow::{Context, Result};
use lib_board::LoadModel;
use lib_dsp::{DspResult, SweepPlan};
use lib_types::device::{MAX_AMPLITUDE, MAX_FREQUENCY, MIN_FREQUENCY};
use lib_types::signal::Channel;
use lib_types::sweep::{CalibMode, ScaleType, SweepKind};
use lib_types::units::{Hertz, Ohms, Volts};
use lib_types::Complex64;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level measurement configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MeasureConfig {
    /// Run name/description.
    pub name: String,

    /// Generator/acquisition channel pair (1 or 2).
    #[serde(default = "default_channel")]
    pub channel: u8,

    /// Stimulus peak amplitude [V].
    #[serde(default = "default_amplitude")]
    pub amplitude: f64,

    /// Generator DC bias [V].
    #[serde(default)]
    pub dc_bias: f64,

    /// Current-sense shunt resistor [Ohm].
    #[serde(default = "default_shunt")]
    pub shunt: f64,

    /// Captures averaged per sweep step.
    #[serde(default = "default_averaging")]
    pub averaging: u32,

    /// Fixture compensation mode.
    #[serde(default = "default_calibration")]
    pub calibration: CalibMode,

    /// Reference-load impedance for three-point compensation, `[re, im]` [Ohm].
    #[serde(default)]
    pub z_ref: [f64; 2],

    /// Sweep geometry.
    pub sweep: SweepConfig,

    /// Input-chain filter switches.
    #[serde(default)]
    pub filters: FilterConfig,

    /// Device under test presented by the simulated front end.
    #[serde(default)]
    pub dut: DutConfig,

    /// Pause for operator confirmation before each calibration phase, so
    /// fixtures can be swapped.
    #[serde(default)]
    pub wait_between_phases: bool,
}

fn default_channel() -> u8 { 1 }
fn default_amplitude() -> f64 { 0.5 }
fn default_shunt() -> f64 { 100.0 }
fn default_averaging() -> u32 { 1 }
fn default_calibration() -> CalibMode { CalibMode::None }

/// Sweep geometry: what is stepped and over what range.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Sweep kind: repeat one frequency or step through a range.
    pub kind: SweepKind,

    /// Number of recorded steps.
    pub steps: usize,

    /// Start frequency [Hz]; the only frequency for measurement sweeps.
    pub start_frequency: f64,

    /// End frequency [Hz]; frequency sweeps only.
    #[serde(default)]
    pub end_frequency: f64,

    /// Step spacing for frequency sweeps.
    #[serde(default = "default_scale")]
    pub scale: ScaleType,
}

fn default_scale() -> ScaleType { ScaleType::Linear }

/// Analog input filter switches, both off by default.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Frequency-response equalization filter.
    #[serde(default)]
    pub equalization: bool,

    /// Anti-aliasing shaping filter.
    #[serde(default)]
    pub shaping: bool,
}

/// Device-under-test model for simulated runs.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DutConfig {
    /// Ideal resistor [Ohm].
    Resistor { resistance: f64 },
    /// Resistor [Ohm] in series with a capacitor [F].
    SeriesRc { resistance: f64, capacitance: f64 },
    /// Resistor [Ohm] in series with an inductor [H].
    SeriesRl { resistance: f64, inductance: f64 },
    /// Frequency-independent complex impedance [Ohm].
    Fixed { real: f64, imag: f64 },
}

impl Default for DutConfig {
    fn default() -> Self {
        Self::Resistor { resistance: 100.0 }
    }
}

impl From<DutConfig> for LoadModel {
    fn from(dut: DutConfig) -> Self {
        match dut {
            DutConfig::Resistor { resistance } => LoadModel::Resistor(Ohms(resistance)),
            DutConfig::SeriesRc {
                resistance,
                capacitance,
            } => LoadModel::SeriesRc {
                resistance: Ohms(resistance),
                capacitance,
            },
            DutConfig::SeriesRl {
                resistance,
                inductance,
            } => LoadModel::SeriesRl {
                resistance: Ohms(resistance),
                inductance,
            },
            DutConfig::Fixed { real, imag } => LoadModel::Fixed(Complex64::new(real, imag)),
        }
    }
}

/// Load configuration from a file.
pub fn load_config(path: &Path) -> Result<MeasureConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: MeasureConfig = if path.extension().map_or(false, |e| e == "json") {
        serde_json::from_str(&content)?
    } else {
        // Assume TOML
        toml::from_str(&content).with_context(|| "Failed to parse config as TOML")?
    };

    validate_config(&config)?;

    Ok(config)
}

/// Validate configuration.
pub fn validate_config(config: &MeasureConfig) -> Result<()> {
    if !(1..=2).contains(&config.channel) {
        anyhow::bail!("Invalid channel: {}. Must be 1 or 2", config.channel);
    }

    if !(0.0..=MAX_AMPLITUDE).contains(&config.amplitude) {
        anyhow::bail!(
            "Invalid amplitude: {} V. Must be within [0, {}]",
            config.amplitude,
            MAX_AMPLITUDE
        );
    }

    if !(0.0..=1.0).contains(&config.dc_bias) {
        anyhow::bail!("Invalid DC bias: {} V. Must be within [0, 1]", config.dc_bias);
    }

    // The generator clips above 1 V combined; a zero-amplitude zero-bias
    // stimulus measures nothing at all.
    let swing = config.amplitude + config.dc_bias;
    if swing <= 0.0 || swing > 1.0 {
        anyhow::bail!(
            "Invalid amplitude + DC bias: {} V. Must be within (0, 1]",
            swing
        );
    }

    if config.shunt <= 0.0 {
        anyhow::bail!("Invalid shunt resistance: {} Ohm. Must be positive", config.shunt);
    }

    if config.averaging < 1 {
        anyhow::bail!("Invalid averaging count: {}. Must be at least 1", config.averaging);
    }

    if config.z_ref[0] < 0.0 {
        anyhow::bail!(
            "Invalid reference impedance: Re(Z_ref) = {} Ohm must not be negative",
            config.z_ref[0]
        );
    }

    validate_sweep(&config.sweep)?;

    Ok(())
}

fn validate_sweep(sweep: &SweepConfig) -> Result<()> {
    let floor = MIN_FREQUENCY.0;
    let ceiling = MAX_FREQUENCY.0;

    if sweep.steps < 1 {
        anyhow::bail!("Invalid step count: {}. Must be at least 1", sweep.steps);
    }

    if !(floor..=ceiling).contains(&sweep.start_frequency) {
        anyhow::bail!(
            "Invalid start frequency: {} Hz. Must be within [{}, {}]",
            sweep.start_frequency,
            floor,
            ceiling
        );
    }

    if sweep.kind == SweepKind::Frequency {
        if sweep.steps < 2 {
            anyhow::bail!(
                "Invalid step count: {}. Frequency sweeps need at least 2 steps",
                sweep.steps
            );
        }
        if !(floor..=ceiling).contains(&sweep.end_frequency) {
            anyhow::bail!(
                "Invalid end frequency: {} Hz. Must be within [{}, {}]",
                sweep.end_frequency,
                floor,
                ceiling
            );
        }
        if sweep.end_frequency < sweep.start_frequency {
            anyhow::bail!(
                "Invalid frequency range: end ({} Hz) is below start ({} Hz)",
                sweep.end_frequency,
                sweep.start_frequency
            );
        }
    }

    Ok(())
}

impl MeasureConfig {
    /// The configured channel as a typed value. Total after validation.
    pub fn channel(&self) -> Channel {
        match self.channel {
            2 => Channel::Two,
            _ => Channel::One,
        }
    }

    pub fn amplitude(&self) -> Volts {
        Volts(self.amplitude)
    }

    pub fn dc_bias(&self) -> Volts {
        Volts(self.dc_bias)
    }

    pub fn shunt(&self) -> Ohms {
        Ohms(self.shunt)
    }

    pub fn z_ref(&self) -> Complex64 {
        Complex64::new(self.z_ref[0], self.z_ref[1])
    }

    /// Build the sweep plan this configuration describes.
    pub fn sweep_plan(&self) -> DspResult<SweepPlan> {
        SweepPlan::new(
            self.sweep.kind,
            self.sweep.scale,
            Hertz(self.sweep.start_frequency),
            Hertz(self.sweep.end_frequency),
            self.sweep.steps,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_toml() -> &'static str {
        r#"
            name = "bench test"

            [sweep]
            kind = "frequency"
            steps = 10
            start_frequency = 100.0
            end_frequency = 10000.0
            scale = "logarithmic"
        "#
    }

    #[test]
    fn test_parse_toml_with_defaults() {
        let config: MeasureConfig = toml::from_str(base_toml()).unwrap();
        assert_eq!(config.channel, 1);
        assert!((config.amplitude - 0.5).abs() < 1e-12);
        assert!((config.shunt - 100.0).abs() < 1e-12);
        assert_eq!(config.averaging, 1);
        assert_eq!(config.calibration, CalibMode::None);
        assert_eq!(config.sweep.scale, ScaleType::Logarithmic);
        assert!(!config.wait_between_phases);
        validate_config(&config).unwrap();
    }

    #[test]
    fn test_parse_json() {
        let json = r#"{
            "name": "bench test",
            "channel": 2,
            "calibration": "open_short_load",
            "z_ref": [100.0, 0.0],
            "sweep": {
                "kind": "measurement",
                "steps": 5,
                "start_frequency": 1000.0
            },
            "dut": {"kind": "series_rc", "resistance": 100.0, "capacitance": 1e-6}
        }"#;
        let config: MeasureConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.channel(), Channel::Two);
        assert_eq!(config.calibration, CalibMode::OpenShortLoad);
        assert!(matches!(config.dut, DutConfig::SeriesRc { .. }));
        validate_config(&config).unwrap();
    }

    #[test]
    fn test_rejects_out_of_range_scalars() {
        let base: MeasureConfig = toml::from_str(base_toml()).unwrap();

        let mut config = base.clone();
        config.channel = 3;
        assert!(validate_config(&config).is_err());

        let mut config = base.clone();
        config.amplitude = 1.5;
        assert!(validate_config(&config).is_err());

        let mut config = base.clone();
        config.shunt = 0.0;
        assert!(validate_config(&config).is_err());

        let mut config = base;
        config.averaging = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_swing_above_full_scale() {
        let mut config: MeasureConfig = toml::from_str(base_toml()).unwrap();
        config.amplitude = 0.8;
        config.dc_bias = 0.3;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_zero_stimulus() {
        let mut config: MeasureConfig = toml::from_str(base_toml()).unwrap();
        config.amplitude = 0.0;
        config.dc_bias = 0.0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_single_step_frequency_sweep() {
        let mut config: MeasureConfig = toml::from_str(base_toml()).unwrap();
        config.sweep.steps = 1;
        assert!(validate_config(&config).is_err());

        // A single-point measurement sweep is fine.
        config.sweep.kind = SweepKind::Measurement;
        validate_config(&config).unwrap();
    }

    #[test]
    fn test_rejects_inverted_range() {
        let mut config: MeasureConfig = toml::from_str(base_toml()).unwrap();
        config.sweep.end_frequency = 50.0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_out_of_band_frequency() {
        let mut config: MeasureConfig = toml::from_str(base_toml()).unwrap();
        config.sweep.start_frequency = 1.0;
        assert!(validate_config(&config).is_err());

        config.sweep.start_frequency = 100.0;
        config.sweep.end_frequency = 70e6;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_negative_z_ref() {
        let mut config: MeasureConfig = toml::from_str(base_toml()).unwrap();
        config.z_ref = [-1.0, 0.0];
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_sweep_plan_round_trip() {
        let config: MeasureConfig = toml::from_str(base_toml()).unwrap();
        let plan = config.sweep_plan().unwrap();
        assert_eq!(plan.steps(), 10);
        assert_eq!(plan.kind(), SweepKind::Frequency);
    }
}
