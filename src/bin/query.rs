//! netblock-query: CLI tool for resolving client addresses to ISP bundles.

use clap::{Args, Parser, Subcommand};
use netblock::{loader, Bundle, BundleField, BundleResolver, EngineConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "netblock-query")]
#[command(author = "Kaitu.io")]
#[command(version = "0.1.0")]
#[command(about = "Resolve client addresses to ISP content server rules", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DataArgs {
    /// Netblock list file (plain or gzip); uses embedded data when omitted
    #[arg(short, long, requires = "isps")]
    netblocks: Option<PathBuf>,

    /// ISP registry YAML file (plain or gzip)
    #[arg(short, long, requires = "netblocks")]
    isps: Option<PathBuf>,

    /// Engine configuration YAML file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve addresses and print their bundles
    Resolve {
        /// Client addresses (IPv4 or IPv6)
        #[arg(required = true)]
        addresses: Vec<String>,

        /// Country hint
        #[arg(short, long)]
        country: Option<String>,

        /// Print a single field: latest, download, country, ispname,
        /// filterip, filterrule or allow
        #[arg(short, long)]
        field: Option<String>,

        /// Wrap JSON output in a callback, JSONP style
        #[arg(long)]
        callback: Option<String>,

        #[command(flatten)]
        data: DataArgs,
    },

    /// Resolve an address and apply a dual-ISP probe result
    Probe {
        /// Client address
        address: String,

        /// Probe descriptor, e.g. "steam.wa.co.za icmp *.wa.co.za"
        #[arg(short, long)]
        probe: String,

        /// Result code the probe returned
        #[arg(short = 'r', long, allow_hyphen_values = true)]
        code: i32,

        #[command(flatten)]
        data: DataArgs,
    },

    /// Load and validate data files
    Check {
        /// Verbose output
        #[arg(short, long)]
        verbose: bool,

        #[command(flatten)]
        data: DataArgs,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Resolve {
            addresses,
            country,
            field,
            callback,
            data,
        } => resolve_addresses(&addresses, country.as_deref(), field, callback, &data),
        Commands::Probe {
            address,
            probe,
            code,
            data,
        } => apply_probe(&address, &probe, code, &data),
        Commands::Check { verbose, data } => check_data(&data, verbose),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_resolver(data: &DataArgs) -> Result<BundleResolver, Box<dyn std::error::Error>> {
    let config = match &data.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };

    let resolver = match (&data.netblocks, &data.isps) {
        (Some(netblocks), Some(isps)) => loader::load_files(netblocks, isps, config)?,
        _ => loader::load_embedded(config)?,
    };
    Ok(resolver)
}

fn resolve_addresses(
    addresses: &[String],
    country: Option<&str>,
    field: Option<String>,
    callback: Option<String>,
    data: &DataArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let field = field.as_deref().map(parse_field).transpose()?;
    let resolver = load_resolver(data)?;

    for address in addresses {
        let bundle = resolver.resolve(address, country)?;
        match field {
            Some(field) => println!("{}", bundle.field(field)),
            None => println!("{}", render(&bundle, callback.as_deref())?),
        }
    }

    Ok(())
}

fn apply_probe(
    address: &str,
    probe: &str,
    code: i32,
    data: &DataArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let resolver = load_resolver(data)?;
    let mut bundle = resolver.resolve(address, None)?;

    if bundle.apply_probe(probe, code) {
        log::info!("Applied override for {:?} result {}", probe, code);
    } else {
        log::warn!("No override for {:?} result {} on {}", probe, code, bundle.isp_name);
    }

    println!("{}", render(&bundle, None)?);
    Ok(())
}

fn check_data(data: &DataArgs, verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let resolver = load_resolver(data)?;
    let classifier = resolver.classifier();

    println!("Netblocks:     {}", classifier.netblocks().len());
    println!("IPv6 prefixes: {}", classifier.ipv6().len());
    println!("ISPs:          {}", resolver.registry().len());

    if verbose {
        for record in resolver.registry().records() {
            let blocks = classifier
                .netblocks()
                .ranges()
                .iter()
                .filter(|r| r.isp == record.index)
                .count();
            let probes = record.test.as_ref().map(|t| t.probes.len()).unwrap_or(0);
            println!(
                "  {:>3}  {:<48} {:>4} netblocks  {} probes",
                record.index, record.name, blocks, probes
            );
        }
    }

    Ok(())
}

fn parse_field(name: &str) -> Result<BundleField, String> {
    BundleField::parse(name).ok_or_else(|| {
        let known: Vec<&str> = BundleField::ALL.iter().map(|f| f.as_str()).collect();
        format!("unknown field: {} (expected one of {})", name, known.join(", "))
    })
}

/// Render a bundle as JSON, optionally wrapped as `callback(...)`.
fn render(bundle: &Bundle, callback: Option<&str>) -> Result<String, Box<dyn std::error::Error>> {
    let json = bundle.to_json()?;
    Ok(match callback {
        Some(cb) if !cb.is_empty() => format!("{}({})", cb, json),
        _ => json,
    })
}
