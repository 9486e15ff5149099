//! Model description generator
//!
//! Instantiates one of the bundled slaves and writes its `modelDescription.xml`, applying
//! an optional TOML configuration and capability overrides.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p rustfmu-describe -- \
//!   --model demo \
//!   --config fmu.toml \
//!   --capability canInterpolateInputs=true \
//!   --output modelDescription.xml
//! ```

use clap::{Parser, ValueEnum};
use rustfmu::config::DescriptionConfig;
use rustfmu::model_description::CapabilityOverrides;
use rustfmu::prelude::*;
use rustfmu::{Counter, DemoSlave};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Model {
    Counter,
    Demo,
}

/// Write modelDescription.xml for a bundled slave
#[derive(Parser, Debug)]
#[command(name = "rustfmu-describe")]
#[command(about = "Generate the FMI 2.0 model description of a bundled slave")]
struct Args {
    /// Slave to describe
    #[arg(short, long, value_enum, default_value = "demo")]
    model: Model,

    /// TOML file overriding metadata and capability flags
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Capability override, e.g. `canInterpolateInputs=true`. May be repeated.
    #[arg(long = "capability", value_parser = parse_capability)]
    capabilities: Vec<(String, bool)>,

    /// Shorthand for canInterpolateInputs=true
    #[arg(long)]
    interpolate_inputs: bool,

    /// Shorthand for canBeInstantiatedOnlyOncePerProcess=true
    #[arg(long)]
    only_one_per_process: bool,

    /// Shorthand for canHandleVariableCommunicationStepSize=false
    #[arg(long)]
    no_variable_step: bool,

    /// Output file; the document is printed when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print debug diagnostics
    #[arg(short, long)]
    verbose: bool,
}

fn parse_capability(value: &str) -> Result<(String, bool), String> {
    let (name, flag) = value
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=true|false, got '{}'", value))?;
    let flag = flag
        .trim()
        .parse::<bool>()
        .map_err(|_| format!("'{}' is not a boolean", flag))?;
    Ok((name.trim().to_string(), flag))
}

impl Args {
    /// Command-line overrides, shorthands first so that `--capability` wins.
    fn overrides(&self) -> CapabilityOverrides {
        let mut overrides = CapabilityOverrides::new();
        let shorthands = [
            ("canInterpolateInputs", self.interpolate_inputs, true),
            ("canBeInstantiatedOnlyOncePerProcess", self.only_one_per_process, true),
            ("canHandleVariableCommunicationStepSize", self.no_variable_step, false),
        ];
        for (name, given, value) in shorthands {
            if given {
                overrides.insert(name.to_string(), value);
            }
        }
        overrides.extend(self.capabilities.iter().cloned());
        overrides
    }
}

/// Render the description of `S` with `config` applied on top of its metadata.
fn describe<S: Fmi2Slave>(
    config: Option<&DescriptionConfig>,
    overrides: &CapabilityOverrides,
) -> FmuResult<String> {
    let mut metadata = S::metadata();
    if let Some(config) = config {
        config.apply(&mut metadata);
    }
    let context = InstanceContext::new(
        metadata.model_name.clone(),
        LogQueue::new(metadata.log_categories.clone()),
    );
    let mut instance = SlaveInstance::<S>::with_metadata(context, metadata)?;
    debug!(
        model = %instance.metadata().model_name,
        variables = instance.registry().len(),
        "Instantiated slave"
    );
    instance.to_model_description(overrides)
}

fn run(args: &Args) -> FmuResult<()> {
    let config = args
        .config
        .as_ref()
        .map(DescriptionConfig::from_path)
        .transpose()?;
    let overrides = args.overrides();

    let xml = match args.model {
        Model::Counter => describe::<Counter>(config.as_ref(), &overrides)?,
        Model::Demo => describe::<DemoSlave>(config.as_ref(), &overrides)?,
    };

    match &args.output {
        Some(path) => {
            fs::write(path, xml)?;
            info!(path = %path.display(), "Wrote model description");
        }
        None => println!("{}", xml),
    }
    Ok(())
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&args) {
        eprintln!("Failed to write model description: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_capability() {
        assert_eq!(
            parse_capability("canInterpolateInputs=true").unwrap(),
            ("canInterpolateInputs".to_string(), true)
        );
        assert_eq!(
            parse_capability(" needsExecutionTool = false ").unwrap(),
            ("needsExecutionTool".to_string(), false)
        );
        assert!(parse_capability("canInterpolateInputs").is_err());
        assert!(parse_capability("canInterpolateInputs=yes").is_err());
    }

    #[test]
    fn test_explicit_capability_wins_over_shorthand() {
        let args = Args::parse_from([
            "rustfmu-describe",
            "--interpolate-inputs",
            "--capability",
            "canInterpolateInputs=false",
            "--no-variable-step",
        ]);
        let overrides = args.overrides();
        assert_eq!(overrides["canInterpolateInputs"], false);
        assert_eq!(overrides["canHandleVariableCommunicationStepSize"], false);
        assert_eq!(overrides.len(), 2);
    }

    #[test]
    fn test_config_is_applied() {
        let config = DescriptionConfig::from_toml_str(
            r#"
author = "Jane Doe"
guid = "11111111-2222-4333-8444-555555555555"

[capabilities]
canInterpolateInputs = true
"#,
        )
        .unwrap();

        let xml = describe::<Counter>(Some(&config), &CapabilityOverrides::new()).unwrap();
        assert!(xml.contains(r#"author="Jane Doe""#));
        assert!(xml.contains(r#"guid="11111111-2222-4333-8444-555555555555""#));
        assert!(xml.contains(r#"canInterpolateInputs="true""#));
        assert!(xml.contains(r#"modelName="Counter""#));
    }

    #[test]
    fn test_command_line_overrides_config() {
        let config = DescriptionConfig::from_toml_str(
            r#"
[capabilities]
canInterpolateInputs = true
"#,
        )
        .unwrap();
        let mut overrides = CapabilityOverrides::new();
        overrides.insert("canInterpolateInputs".to_string(), false);

        let xml = describe::<DemoSlave>(Some(&config), &overrides).unwrap();
        assert!(xml.contains(r#"canInterpolateInputs="false""#));
    }
}
