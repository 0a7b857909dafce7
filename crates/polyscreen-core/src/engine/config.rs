use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Invalid solvent choice '{given}'. Valid solvents: {valid}")]
    InvalidSolvent { given: String, valid: String },

    #[error(
        "Cannot randomly select {requested} compositions from a space of only {available}"
    )]
    InvalidSampleCount { requested: u64, available: u64 },

    #[error("Composition space of {monomers}^{length} is too large to sample by index")]
    SpaceTooLarge { monomers: usize, length: usize },
}

/// Implicit solvents accepted by the semiempirical engine's GBSA model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum Solvent {
    Acetone,
    Acetonitrile,
    Benzene,
    Dichloromethane,
    Chloroform,
    CarbonDisulfide,
    Dimethylformamide,
    Dimethylsulfoxide,
    Ether,
    Water,
    Methanol,
    Tetrahydrofuran,
    Toluene,
}

impl Solvent {
    pub const ALL: [Solvent; 13] = [
        Solvent::Acetone,
        Solvent::Acetonitrile,
        Solvent::Benzene,
        Solvent::Dichloromethane,
        Solvent::Chloroform,
        Solvent::CarbonDisulfide,
        Solvent::Dimethylformamide,
        Solvent::Dimethylsulfoxide,
        Solvent::Ether,
        Solvent::Water,
        Solvent::Methanol,
        Solvent::Tetrahydrofuran,
        Solvent::Toluene,
    ];

    /// Name passed to the engine's `-gbsa` flag.
    pub fn engine_name(self) -> &'static str {
        match self {
            Solvent::Acetone => "Acetone",
            Solvent::Acetonitrile => "Acetonitrile",
            Solvent::Benzene => "Benzene",
            Solvent::Dichloromethane => "CH2Cl2",
            Solvent::Chloroform => "CHCl3",
            Solvent::CarbonDisulfide => "CS2",
            Solvent::Dimethylformamide => "DMF",
            Solvent::Dimethylsulfoxide => "DMSO",
            Solvent::Ether => "Ether",
            Solvent::Water => "H2O",
            Solvent::Methanol => "Methanol",
            Solvent::Tetrahydrofuran => "THF",
            Solvent::Toluene => "Toluene",
        }
    }

    fn valid_list() -> String {
        Self::ALL
            .iter()
            .map(|s| s.engine_name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Solvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.engine_name())
    }
}

impl FromStr for Solvent {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|solvent| solvent.engine_name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ConfigError::InvalidSolvent {
                given: s.to_string(),
                valid: Self::valid_list(),
            })
    }
}

impl TryFrom<String> for Solvent {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

pub const DEFAULT_TIMEOUT_SECS: u64 = 3600;

/// Executables for each external engine, plus the per-invocation time limit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct EngineCommands {
    /// Structure builder: polymer construction and conformer embedding.
    pub builder: String,
    /// Format converter (MOL to XYZ).
    pub converter: String,
    /// Semiempirical optimiser and potential calculator.
    pub xtb: String,
    /// Excited-state calculator.
    pub stda: String,
    /// `0` disables the limit.
    pub timeout_secs: u64,
}

impl EngineCommands {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Default for EngineCommands {
    fn default() -> Self {
        Self {
            builder: "polybuild".to_string(),
            converter: "obabel".to_string(),
            xtb: "xtb".to_string(),
            stda: "stda".to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Immutable per-session settings, validated once at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub name: String,
    /// Monomers per repeat unit.
    pub repeat_length: usize,
    /// Repeat units in the constructed chain.
    pub repeat_units: usize,
    /// Conformers embedded during the conformer search.
    pub conformers: usize,
    pub solvent: Option<Solvent>,
    pub engines: EngineCommands,
}

impl SessionConfig {
    /// Extra engine arguments activating the implicit solvent model, if any.
    pub fn solvent_flags(&self) -> Vec<String> {
        match self.solvent {
            Some(solvent) => vec!["-gbsa".to_string(), solvent.engine_name().to_string()],
            None => Vec::new(),
        }
    }
}

impl fmt::Display for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Session name: {}", self.name)?;
        writeln!(f, "Length of repeat unit: {}", self.repeat_length)?;
        writeln!(f, "Num. repeat units: {}", self.repeat_units)?;
        writeln!(f, "Num. conformers: {}", self.conformers)?;
        if let Some(solvent) = self.solvent {
            writeln!(f, "Solvent: {}", solvent)?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct SessionConfigBuilder {
    name: Option<String>,
    repeat_length: Option<usize>,
    repeat_units: Option<usize>,
    conformers: Option<usize>,
    solvent: Option<String>,
    engines: Option<EngineCommands>,
}

impl SessionConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
    pub fn repeat_length(mut self, length: usize) -> Self {
        self.repeat_length = Some(length);
        self
    }
    pub fn repeat_units(mut self, units: usize) -> Self {
        self.repeat_units = Some(units);
        self
    }
    pub fn conformers(mut self, n: usize) -> Self {
        self.conformers = Some(n);
        self
    }
    pub fn solvent(mut self, solvent: Option<String>) -> Self {
        self.solvent = solvent;
        self
    }
    pub fn engines(mut self, engines: EngineCommands) -> Self {
        self.engines = Some(engines);
        self
    }

    pub fn build(self) -> Result<SessionConfig, ConfigError> {
        let name = self.name.ok_or(ConfigError::MissingParameter("name"))?;
        if name.trim().is_empty() || name.contains(['/', '\\']) {
            return Err(ConfigError::InvalidParameter {
                name: "name",
                reason: format!("'{}' is not a valid directory name", name),
            });
        }
        let repeat_length = positive(
            "repeat_length",
            self.repeat_length
                .ok_or(ConfigError::MissingParameter("repeat_length"))?,
        )?;
        let repeat_units = positive(
            "repeat_units",
            self.repeat_units
                .ok_or(ConfigError::MissingParameter("repeat_units"))?,
        )?;
        let conformers = positive(
            "conformers",
            self.conformers
                .ok_or(ConfigError::MissingParameter("conformers"))?,
        )?;
        let solvent = self
            .solvent
            .as_deref()
            .map(str::parse::<Solvent>)
            .transpose()?;

        Ok(SessionConfig {
            name,
            repeat_length,
            repeat_units,
            conformers,
            solvent,
            engines: self.engines.unwrap_or_default(),
        })
    }
}

fn positive(name: &'static str, value: usize) -> Result<usize, ConfigError> {
    if value == 0 {
        Err(ConfigError::InvalidParameter {
            name,
            reason: "must be at least 1".to_string(),
        })
    } else {
        Ok(value)
    }
}

/// How the composition space is traversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    /// Every composition, in lexicographic catalog order.
    #[default]
    Exhaustive,
    /// `count` distinct positions drawn uniformly without replacement.
    Random { count: u64, seed: Option<u64> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreeningConfig {
    /// Worker pool size.
    pub threads: usize,
    pub selection: Selection,
    /// Reload the existing work-log instead of starting a fresh one.
    pub resume: bool,
}

impl Default for ScreeningConfig {
    fn default() -> Self {
        Self {
            threads: 1,
            selection: Selection::Exhaustive,
            resume: false,
        }
    }
}
