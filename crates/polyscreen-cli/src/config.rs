use crate::cli::{SelectionArgs, SessionArgs};
use crate::error::{CliError, Result};
use polyscreen::engine::config::{
    EngineCommands, ScreeningConfig, Selection, SessionConfig, SessionConfigBuilder,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

const DEFAULT_CONFORMERS: usize = 10;
const DEFAULT_THREADS: usize = 1;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialSessionConfig {
    name: Option<String>,
    directory: Option<PathBuf>,
    repeat_length: Option<usize>,
    repeat_units: Option<usize>,
    conformers: Option<usize>,
    solvent: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialEngineConfig {
    builder: Option<String>,
    converter: Option<String>,
    xtb: Option<String>,
    stda: Option<String>,
    timeout_secs: Option<u64>,
}

impl PartialEngineConfig {
    fn resolve(self) -> EngineCommands {
        let defaults = EngineCommands::default();
        EngineCommands {
            builder: self.builder.unwrap_or(defaults.builder),
            converter: self.converter.unwrap_or(defaults.converter),
            xtb: self.xtb.unwrap_or(defaults.xtb),
            stda: self.stda.unwrap_or(defaults.stda),
            timeout_secs: self.timeout_secs.unwrap_or(defaults.timeout_secs),
        }
    }
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialScreeningConfig {
    threads: Option<usize>,
    random: Option<u64>,
    seed: Option<u64>,
    resume: Option<bool>,
}

/// Everything a command needs once file, flags and overrides are merged.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub session: SessionConfig,
    /// Directory in which the session directory is created.
    pub directory: PathBuf,
    pub screening: ScreeningConfig,
}

/// Session configuration as read from a TOML file, before CLI flags are applied.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialConfig {
    session: Option<PartialSessionConfig>,
    engines: Option<PartialEngineConfig>,
    screening: Option<PartialScreeningConfig>,
}

impl PartialConfig {
    /// Reads `path` if given, otherwise starts from an empty configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Merges the file values with command-line flags.
    ///
    /// Precedence, highest first: explicit flags, `-S` overrides, file values,
    /// defaults. `fallback_length` stands in for a repeat length that none of
    /// those provide.
    pub fn merge_with_cli(
        mut self,
        args: &SessionArgs,
        selection: Option<&SelectionArgs>,
        threads: Option<usize>,
        fallback_length: Option<usize>,
    ) -> Result<ResolvedConfig> {
        self.apply_set_values(&args.set_values)?;

        let session = self.session.take().unwrap_or_default();
        let engines = self.engines.take().unwrap_or_default();
        let screening = self.screening.take().unwrap_or_default();

        let name = args.name.clone().or(session.name).ok_or_else(|| {
            CliError::Config(
                "A session name is required either in the config file or via --name.".to_string(),
            )
        })?;
        let repeat_length = args
            .repeat_length
            .or(session.repeat_length)
            .or(fallback_length)
            .ok_or_else(|| {
                CliError::Config(
                    "`session.repeat-length` is required either in the config file or via --repeat-length."
                        .to_string(),
                )
            })?;
        let repeat_units = args
            .repeat_units
            .or(session.repeat_units)
            .ok_or_else(|| {
                CliError::Config(
                    "`session.repeat-units` is required either in the config file or via --repeat-units."
                        .to_string(),
                )
            })?;

        let config = SessionConfigBuilder::new()
            .name(name)
            .repeat_length(repeat_length)
            .repeat_units(repeat_units)
            .conformers(
                args.conformers
                    .or(session.conformers)
                    .unwrap_or(DEFAULT_CONFORMERS),
            )
            .solvent(args.solvent.clone().or(session.solvent))
            .engines(engines.resolve())
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?;

        let directory = args
            .directory
            .clone()
            .or(session.directory)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(ResolvedConfig {
            session: config,
            directory,
            screening: Self::merge_screening(screening, selection, threads)?,
        })
    }

    fn merge_screening(
        file: PartialScreeningConfig,
        cli: Option<&SelectionArgs>,
        threads: Option<usize>,
    ) -> Result<ScreeningConfig> {
        let threads = threads.or(file.threads).unwrap_or(DEFAULT_THREADS);
        if threads == 0 {
            return Err(CliError::Config(
                "The number of threads must be at least 1.".to_string(),
            ));
        }

        let random = cli.and_then(|c| c.random).or(file.random);
        let seed = cli.and_then(|c| c.seed).or(file.seed);
        let selection = match random {
            Some(count) => Selection::Random { count, seed },
            None => Selection::Exhaustive,
        };
        let resume = cli.is_some_and(|c| c.resume) || file.resume.unwrap_or(false);

        Ok(ScreeningConfig {
            threads,
            selection,
            resume,
        })
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let (key, value_str) = kv_pair.split_once('=').ok_or_else(|| {
                CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                ))
            })?;

            match key {
                "session.name" => {
                    self.session.get_or_insert_with(Default::default).name = Some(value_str.to_string());
                }
                "session.directory" => {
                    self.session.get_or_insert_with(Default::default).directory =
                        Some(PathBuf::from(value_str));
                }
                "session.repeat-length" => {
                    self.session.get_or_insert_with(Default::default).repeat_length =
                        Some(parse_value(key, value_str)?);
                }
                "session.repeat-units" => {
                    self.session.get_or_insert_with(Default::default).repeat_units =
                        Some(parse_value(key, value_str)?);
                }
                "session.conformers" => {
                    self.session.get_or_insert_with(Default::default).conformers =
                        Some(parse_value(key, value_str)?);
                }
                "session.solvent" => {
                    self.session.get_or_insert_with(Default::default).solvent = Some(value_str.to_string());
                }
                "engines.builder" => {
                    self.engines.get_or_insert_with(Default::default).builder = Some(value_str.to_string());
                }
                "engines.converter" => {
                    self.engines.get_or_insert_with(Default::default).converter =
                        Some(value_str.to_string());
                }
                "engines.xtb" => {
                    self.engines.get_or_insert_with(Default::default).xtb = Some(value_str.to_string());
                }
                "engines.stda" => {
                    self.engines.get_or_insert_with(Default::default).stda = Some(value_str.to_string());
                }
                "engines.timeout-secs" => {
                    self.engines.get_or_insert_with(Default::default).timeout_secs =
                        Some(parse_value(key, value_str)?);
                }
                "screening.threads" => {
                    self.screening.get_or_insert_with(Default::default).threads =
                        Some(parse_value(key, value_str)?);
                }
                "screening.random" => {
                    self.screening.get_or_insert_with(Default::default).random =
                        Some(parse_value(key, value_str)?);
                }
                "screening.seed" => {
                    self.screening.get_or_insert_with(Default::default).seed =
                        Some(parse_value(key, value_str)?);
                }
                "screening.resume" => {
                    self.screening.get_or_insert_with(Default::default).resume =
                        Some(parse_value(key, value_str)?);
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        CliError::Config(format!(
            "Invalid {} value for {}: {}",
            std::any::type_name::<T>(),
            key,
            value
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use once_cell::sync::Lazy;
    use polyscreen::engine::config::Solvent;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    static TEST_DIR: Lazy<TempDir> = Lazy::new(|| tempdir().expect("Failed to create temp dir"));

    fn write_config_file(name: &str, content: &str) -> PathBuf {
        let file_path = TEST_DIR.path().join(name);
        fs::write(&file_path, content).unwrap();
        file_path
    }

    fn screen_args(config_path: &Path, extra: &[&str]) -> (SessionArgs, SelectionArgs, Option<usize>) {
        let mut argv = vec![
            "polyscreen".to_string(),
            "screen".to_string(),
            "-m".to_string(),
            "monomers.txt".to_string(),
            "-c".to_string(),
            config_path.to_str().unwrap().to_string(),
        ];
        argv.extend(extra.iter().map(|s| s.to_string()));
        let cli = Cli::parse_from(argv);
        match cli.command {
            Commands::Screen(args) => (args.session, args.selection, cli.threads),
            _ => panic!("Expected 'screen' subcommand"),
        }
    }

    const BASE_CONFIG: &str = r#"
        [session]
        name = "thiophenes"
        repeat-length = 2
        repeat-units = 6
        solvent = "thf"

        [engines]
        xtb = "/opt/xtb/bin/xtb"
        timeout-secs = 600

        [screening]
        threads = 4
    "#;

    #[test]
    fn test_load_from_file_and_merge_with_defaults() {
        let config_path = write_config_file("config_defaults.toml", BASE_CONFIG);
        let (session, selection, threads) = screen_args(&config_path, &[]);

        let resolved = PartialConfig::from_file(&config_path)
            .unwrap()
            .merge_with_cli(&session, Some(&selection), threads, None)
            .unwrap();

        assert_eq!(resolved.session.name, "thiophenes");
        assert_eq!(resolved.session.repeat_length, 2);
        assert_eq!(resolved.session.repeat_units, 6);
        assert_eq!(resolved.session.conformers, DEFAULT_CONFORMERS);
        assert_eq!(resolved.session.solvent, Some(Solvent::Tetrahydrofuran));
        assert_eq!(resolved.session.engines.xtb, "/opt/xtb/bin/xtb");
        assert_eq!(resolved.session.engines.stda, "stda");
        assert_eq!(resolved.session.engines.timeout_secs, 600);
        assert_eq!(resolved.directory, PathBuf::from("."));
        assert_eq!(resolved.screening.threads, 4);
        assert_eq!(resolved.screening.selection, Selection::Exhaustive);
        assert!(!resolved.screening.resume);
    }

    #[test]
    fn test_cli_args_override_set_values_and_file() {
        let config_path = write_config_file("config_override.toml", BASE_CONFIG);
        let (session, selection, threads) = screen_args(
            &config_path,
            &[
                "-l", "3", "-S", "session.repeat-length=4", "-S", "session.conformers=25", "-j",
                "8", "--random", "12", "--seed", "7", "--resume",
            ],
        );

        let resolved = PartialConfig::from_file(&config_path)
            .unwrap()
            .merge_with_cli(&session, Some(&selection), threads, None)
            .unwrap();

        assert_eq!(resolved.session.repeat_length, 3);
        assert_eq!(resolved.session.conformers, 25);
        assert_eq!(resolved.screening.threads, 8);
        assert_eq!(
            resolved.screening.selection,
            Selection::Random {
                count: 12,
                seed: Some(7)
            }
        );
        assert!(resolved.screening.resume);
    }

    #[test]
    fn test_set_value_overrides_engine_paths() {
        let config_path = write_config_file("config_set.toml", BASE_CONFIG);
        let (session, selection, threads) = screen_args(
            &config_path,
            &["-S", "engines.xtb=xtb6", "-S", "engines.timeout-secs=0"],
        );

        let resolved = PartialConfig::from_file(&config_path)
            .unwrap()
            .merge_with_cli(&session, Some(&selection), threads, None)
            .unwrap();

        assert_eq!(resolved.session.engines.xtb, "xtb6");
        assert_eq!(resolved.session.engines.timeout(), None);
    }

    #[test]
    fn test_missing_name_and_bad_values_return_config_errors() {
        let config_path = write_config_file("config_missing.toml", "[session]\nrepeat-units = 2\n");
        let (session, selection, threads) = screen_args(&config_path, &["-l", "2"]);
        let result = PartialConfig::from_file(&config_path)
            .unwrap()
            .merge_with_cli(&session, Some(&selection), threads, None);
        assert!(matches!(result, Err(CliError::Config(msg)) if msg.contains("name")));

        let (session, selection, threads) =
            screen_args(&config_path, &["-n", "run", "-l", "2", "-s", "seawater"]);
        let result = PartialConfig::from_file(&config_path)
            .unwrap()
            .merge_with_cli(&session, Some(&selection), threads, None);
        assert!(matches!(result, Err(CliError::Config(msg)) if msg.contains("THF")));

        let (session, selection, threads) =
            screen_args(&config_path, &["-n", "run", "-S", "session.repeat-length=two"]);
        let result = PartialConfig::from_file(&config_path)
            .unwrap()
            .merge_with_cli(&session, Some(&selection), threads, None);
        assert!(matches!(result, Err(CliError::Config(_))));

        let (session, selection, threads) =
            screen_args(&config_path, &["-n", "run", "-S", "session.unknown=1"]);
        let result = PartialConfig::from_file(&config_path)
            .unwrap()
            .merge_with_cli(&session, Some(&selection), threads, None);
        assert!(matches!(result, Err(CliError::Config(msg)) if msg.contains("Unsupported")));
    }

    #[test]
    fn test_unknown_file_key_is_a_parse_error() {
        let config_path = write_config_file("config_unknown.toml", "[session]\nlength = 2\n");
        assert!(matches!(
            PartialConfig::from_file(&config_path),
            Err(CliError::FileParsing { .. })
        ));
    }

    #[test]
    fn test_evaluate_falls_back_to_descriptor_count() {
        let cli = Cli::parse_from(["polyscreen", "evaluate", "--label", "x", "-n", "single", "-u", "3", "C", "CC", "CCC"]);
        let Commands::Evaluate(args) = cli.command else {
            panic!("Expected 'evaluate' subcommand");
        };
        let resolved = PartialConfig::load(None)
            .unwrap()
            .merge_with_cli(&args.session, None, cli.threads, Some(args.descriptors.len()))
            .unwrap();
        assert_eq!(resolved.session.repeat_length, 3);
        assert_eq!(resolved.screening, ScreeningConfig::default());
    }
}
