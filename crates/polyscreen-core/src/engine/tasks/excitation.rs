use super::optimization::OPTIMIZED_SUFFIX;
use super::{Stage, StageContext, read_field};
use crate::engine::error::StageError;
use crate::engine::executor::Invocation;
use crate::engine::transcript::Field;
use tracing::{info, instrument};

pub const TRANSCRIPT_FILE: &str = "stda-calc.out";
/// Energy window (eV) for the excited-state calculation.
const ENERGY_WINDOW_EV: &str = "8";

const OPTICAL_GAP: Field = Field::after_marker("optical gap", "excitation energies", 13);
const OSCILLATOR_STRENGTH: Field = Field::after_marker("oscillator strength", "excitation energies", 15);

/// Lowest vertical excitation from a single-point wavefunction followed by a
/// simplified Tamm-Dancoff calculation.
pub struct Excitation;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FirstExcitation {
    pub optical_gap: f64,
    pub oscillator_strength: f64,
}

impl Stage for Excitation {
    type Output = FirstExcitation;

    const NAME: &'static str = "excited state";

    #[instrument(skip_all, name = "excited_state", fields(name = ctx.name))]
    fn run(&self, ctx: &StageContext<'_>) -> Result<Self::Output, StageError> {
        let engines = &ctx.config.engines;
        let structure = ctx.artifact(OPTIMIZED_SUFFIX);
        ctx.require(&structure)?;

        ctx.invoke(
            Invocation::new(&engines.xtb)
                .arg(structure)
                .args(ctx.config.solvent_flags()),
        )?;

        let transcript = ctx.invoke(
            Invocation::new(&engines.stda).args(["-xtb", "-e", ENERGY_WINDOW_EV]),
        )?;
        ctx.workdir.write(TRANSCRIPT_FILE, transcript.as_str())?;

        let optical_gap = read_field(&transcript, &engines.stda, &OPTICAL_GAP)?;
        let oscillator_strength = read_field(&transcript, &engines.stda, &OSCILLATOR_STRENGTH)?;
        info!(optical_gap, oscillator_strength, "First excitation computed.");
        Ok(FirstExcitation {
            optical_gap,
            oscillator_strength,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{
        OPTICAL_GAP_EV, OSCILLATOR_STRENGTH as STRENGTH, ScriptedExecutor, fake_engines,
    };
    use super::*;
    use crate::engine::config::SessionConfigBuilder;
    use crate::engine::transcript::Transcript;
    use crate::engine::workdir::WorkDir;

    #[test]
    fn runs_wavefunction_then_stda_and_keeps_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let workdir = WorkDir::acquire(dir.path()).unwrap();
        workdir.write("A-opt.xyz", "").unwrap();
        let config = SessionConfigBuilder::new()
            .name("s")
            .repeat_length(1)
            .repeat_units(2)
            .conformers(1)
            .build()
            .unwrap();
        let executor = fake_engines();
        let ctx = StageContext {
            name: "A",
            workdir: &workdir,
            config: &config,
            executor: &executor,
        };

        let excitation = Excitation.run(&ctx).unwrap();

        assert_eq!(excitation.optical_gap, OPTICAL_GAP_EV);
        assert_eq!(excitation.oscillator_strength, STRENGTH);
        assert_eq!(executor.call_log(), vec!["xtb A-opt.xyz", "stda -xtb -e 8"]);
        assert!(workdir.contains(TRANSCRIPT_FILE));
    }

    #[test]
    fn stda_failure_stops_before_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let workdir = WorkDir::acquire(dir.path()).unwrap();
        workdir.write("A-opt.xyz", "").unwrap();
        let config = SessionConfigBuilder::new()
            .name("s")
            .repeat_length(1)
            .repeat_units(2)
            .conformers(1)
            .build()
            .unwrap();
        let executor = ScriptedExecutor::new()
            .on("xtb", None, |_, _| Ok(Transcript::default()))
            .on("stda", None, |inv, _| {
                Err(StageError::ExitStatus {
                    command: inv.to_string(),
                    status: "exit status: 1".to_string(),
                    detail: String::new(),
                })
            });
        let ctx = StageContext {
            name: "A",
            workdir: &workdir,
            config: &config,
            executor: &executor,
        };

        let err = Excitation.run(&ctx).unwrap_err();
        assert!(matches!(err, StageError::ExitStatus { .. }));
        assert!(!workdir.contains(TRANSCRIPT_FILE));
    }
}
