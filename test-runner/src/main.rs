//! vmc-run: executes bytecode on a connector module
//!
//! Without `--module` the statically linked example VM is used.

use anyhow::{bail, Context};
use clap::Parser;
use std::path::PathBuf;
use vmc_example_vm::vmc_create_example_vm;
use vmc_host::{
    abi::Address,
    CallMessage, ExecutionOutcome, HostConfig, MemoryHost, Module, Vm,
};

#[derive(Parser, Debug)]
#[command(name = "vmc-run")]
#[command(about = "Execute bytecode through the VM connector ABI", long_about = None)]
#[command(version)]
struct Cli {
    /// Shared library exporting a VM factory
    #[arg(long)]
    module: Option<PathBuf>,

    /// Factory symbol; derived from the library file name when omitted
    #[arg(long, requires = "module")]
    symbol: Option<String>,

    /// Bytecode as hex
    #[arg(long)]
    code: String,

    /// Call data as hex
    #[arg(long, default_value = "")]
    input: String,

    /// Gas limit; overrides the config file
    #[arg(long)]
    gas: Option<i64>,

    /// Revision number; overrides the config file
    #[arg(long)]
    revision: Option<i32>,

    /// Module option as NAME=VALUE; may repeat
    #[arg(long = "option", value_parser = parse_option)]
    options: Vec<(String, String)>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the outcome as JSON
    #[arg(long)]
    json: bool,
}

fn parse_option(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got {raw:?}"))?;
    if name.is_empty() {
        return Err(format!("empty option name in {raw:?}"));
    }
    Ok((name.to_string(), value.to_string()))
}

fn decode_hex(label: &str, raw: &str) -> anyhow::Result<Vec<u8>> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    hex::decode(digits).with_context(|| format!("{label} is not valid hex"))
}

impl Cli {
    /// Merges the config file with command-line overrides
    fn host_config(&self) -> anyhow::Result<HostConfig> {
        let mut config = match &self.config {
            Some(path) => HostConfig::from_file(path)?,
            None => HostConfig::default(),
        };
        if let Some(gas) = self.gas {
            config.gas_limit = gas;
        }
        if let Some(revision) = self.revision {
            config.revision = revision;
        }
        for (name, value) in &self.options {
            config.options.insert(name.clone(), value.clone());
        }
        config.validate()?;
        Ok(config)
    }

    fn open_vm(&self) -> anyhow::Result<Vm> {
        let Some(path) = &self.module else {
            return Ok(unsafe { Vm::from_factory(vmc_create_example_vm) }?);
        };
        let module = Module::open(path)?;
        let vm = match &self.symbol {
            Some(symbol) => module.create_with(symbol)?,
            None => module.create()?,
        };
        Ok(vm)
    }
}

fn print_outcome(outcome: &ExecutionOutcome, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }
    println!("status:   {}", outcome.status);
    println!("gas used: {} of {}", outcome.gas_used(), outcome.gas_limit);
    println!("gas left: {}", outcome.gas_left);
    println!("output:   0x{}", hex::encode(&outcome.output));
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let code = decode_hex("--code", &cli.code)?;
    let input = decode_hex("--input", &cli.input)?;
    let config = cli.host_config()?;

    let mut vm = cli.open_vm()?;
    log::info!(
        "loaded {} {} (abi {}, capabilities {:?})",
        vm.name(),
        vm.version(),
        vm.abi_version(),
        vm.capabilities()
    );
    vm.configure(&config)?;

    let revision = config.revision();
    let mut host = MemoryHost::new();
    let msg = CallMessage::new(Address::ZERO, config.gas_limit).with_input(input);
    let outcome = vm.execute(&mut host, revision, &msg, &code)?;
    vm.destroy();

    print_outcome(&outcome, cli.json)?;
    if !outcome.is_success() {
        bail!("execution ended with {}", outcome.status);
    }
    Ok(())
}
