//! Tuning simulator
//!
//! Replays a tuning file against a simulated coil and writes a CSV trace,
//! one run per configured regulator. A short summary of each run is logged
//! to stderr.

mod config;
mod error;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use thermocoil_core::config::{Mode, RegulatorKind};
use thermocoil_core::control::OutputCommand;
use thermocoil_core::traits::{Buttons, TickClock};
use thermocoil_drivers::atomizer::{AtomizerDriver, CoilModel, SimButtons, SimClock, SimulatedCoil};
use tracing::{error, info};

use config::SimFile;
use error::SimError;

#[derive(Parser)]
#[command(name = "thermocoil-sim")]
#[command(about = "Replay a tuning file against a simulated atomizer coil", long_about = None)]
struct Cli {
    /// Path to the tuning TOML file (defaults apply when omitted)
    config: Option<PathBuf>,

    /// Output CSV file path (optional, defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Fire in power mode instead of calibrating for temperature regulation
    #[arg(long)]
    power_mode: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), SimError> {
    let mut file = match &cli.config {
        Some(path) => SimFile::load(path)?,
        None => SimFile::default(),
    };
    if cli.power_mode {
        file.run.temperature_mode = false;
    }
    file.validate()?;

    let mut out: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    };
    writeln!(out, "regulator,time_ms,coil_c,estimate_c,power_mw,volts_mv,energized")?;

    for &kind in &file.run.regulators {
        let summary = simulate(&file, kind, &mut out)?;
        info!(
            "{:?}: peak {:.1} C, settled {:.1}..{:.1} C, {} ceiling clamps",
            kind, summary.peak_c, summary.settled_min_c, summary.settled_max_c, summary.clamps
        );
    }
    out.flush()?;
    Ok(())
}

/// Figures of one run
struct Summary {
    peak_c: f32,
    /// Temperature range over the second half of the fire
    settled_min_c: f32,
    settled_max_c: f32,
    /// Ticks where a voltage, power or current ceiling fired
    clamps: u32,
}

/// Simulation state for one regulator
struct Bench<'a, W> {
    driver: AtomizerDriver<SimulatedCoil>,
    buttons: SimButtons,
    clock: SimClock,
    file: &'a SimFile,
    kind: RegulatorKind,
    out: &'a mut W,
    /// Clock time the fire started; rows are written from then on
    fire_start_ms: Option<u32>,
}

impl<W: Write> Bench<'_, W> {
    /// Hold `buttons` for `duration_ms`, calling `sample` after every tick
    fn hold(
        &mut self,
        buttons: Buttons,
        duration_ms: u32,
        mut sample: impl FnMut(&Self, &OutputCommand, u32),
    ) -> Result<(), SimError> {
        let tick = self.file.run.tick_ms;
        let every = self.file.run.sample_every_ms;
        self.buttons.hold(buttons);

        let mut elapsed = 0;
        while elapsed < duration_ms {
            let command = self.driver.poll(&mut self.buttons, &self.clock);
            self.driver.hardware_mut().step(tick);
            self.clock.advance(tick);
            elapsed += tick;

            sample(self, &command, elapsed);
            if let Some(start) = self.fire_start_ms {
                let t = self.clock.now_ms().wrapping_sub(start);
                if t % every < tick {
                    self.write_row(t, &command)?;
                }
            }
        }
        Ok(())
    }

    fn write_row(&mut self, t: u32, command: &OutputCommand) -> Result<(), SimError> {
        let controller = self.driver.controller();
        writeln!(
            self.out,
            "{:?},{},{:.2},{},{},{},{}",
            self.kind,
            t,
            self.driver.hardware().temperature_c(),
            controller.temperature_c(),
            controller.power_mw(),
            command.volts_mv,
            command.energize as u8,
        )?;
        Ok(())
    }
}

fn simulate<W: Write>(file: &SimFile, kind: RegulatorKind, out: &mut W) -> Result<Summary, SimError> {
    let mut config = file.controller;
    config.regulator = kind;
    if !file.run.temperature_mode {
        config.initial_mode = Mode::Power;
    }
    let coil = SimulatedCoil::new(CoilModel::from(&file.coil));

    let mut bench = Bench {
        driver: AtomizerDriver::new(coil, config),
        buttons: SimButtons::new(),
        clock: SimClock::new(),
        file,
        kind,
        out,
        fire_start_ms: None,
    };

    // Calibrate on the cold coil: hold UP+DOWN past the mode switch delay
    if file.run.temperature_mode {
        let hold_ms = config.ui.mode_hold_ms + 10 * file.run.tick_ms;
        bench.hold(Buttons::UP | Buttons::DOWN, hold_ms, |_, _, _| {})?;
        bench.hold(Buttons::NONE, 10 * file.run.tick_ms, |_, _, _| {})?;
        if !bench.driver.controller().is_regulating() {
            return Err(SimError::Calibration);
        }
    }

    let mut summary = Summary {
        peak_c: f32::MIN,
        settled_min_c: f32::MAX,
        settled_max_c: f32::MIN,
        clamps: 0,
    };
    let fire_ms = file.run.fire_ms;

    bench.fire_start_ms = Some(bench.clock.now_ms());
    bench.hold(Buttons::FIRE, fire_ms, |bench, command, elapsed| {
        let temp = bench.driver.hardware().temperature_c();
        summary.peak_c = summary.peak_c.max(temp);
        if elapsed >= fire_ms / 2 {
            summary.settled_min_c = summary.settled_min_c.min(temp);
            summary.settled_max_c = summary.settled_max_c.max(temp);
        }
        if command.limits.any_ceiling() {
            summary.clamps += 1;
        }
    })?;
    bench.hold(Buttons::NONE, file.run.cooldown_ms, |_, _, _| {})?;

    Ok(summary)
}
