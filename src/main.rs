use clap::{Parser, Subcommand};
use color_eyre::eyre::{bail, WrapErr};
use color_eyre::Result;
use env_logger::Env;
use log::info;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use ipcarve::engine::{self, ReleaseOutcome, ReservationRequest};
use ipcarve::error::IpamError;
use ipcarve::persist;
use ipcarve::range::AddressRange;
use ipcarve::reconcile::{reconcile, VirtualNetworkDescription};
use ipcarve::registry::ContextRegistry;
use ipcarve::validate_against_root;

/// Subnet carving utility for IP address management workflows
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the registry state file (JSON)
    #[arg(short, long, default_value = "ipcarve_state.json")]
    state: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create or replace a named context
    SetContext {
        /// Context name (case-insensitive)
        name: String,
        /// Root address block in CIDR notation
        root: String,
        /// Pre-existing consumed ranges to seed the context with (repeatable)
        #[arg(long = "consumed")]
        consumed: Vec<String>,
    },
    /// Reserve address space from a context
    Reserve {
        /// Context to reserve from
        context: String,
        /// Reserve the first free block of this prefix length (repeatable)
        #[arg(long = "prefix-len", value_parser = clap::value_parser!(u8).range(0..=32))]
        prefix_lens: Vec<u8>,
        /// Reserve this exact CIDR block (repeatable)
        #[arg(long = "cidr")]
        cidrs: Vec<String>,
        /// Reserve the smallest block holding this many hosts (repeatable)
        #[arg(long = "count")]
        counts: Vec<u64>,
        /// Reserve a point-to-point /31 block (repeat for more than one)
        #[arg(long, action = clap::ArgAction::Count)]
        p2p: u8,
    },
    /// Release an exact previously reserved range
    Release {
        context: String,
        /// The exact CIDR block to release
        cidr: String,
    },
    /// Check candidate ranges against a root without touching any context
    Validate {
        /// Root address block in CIDR notation
        root: String,
        /// Candidate ranges to validate
        ranges: Vec<String>,
    },
    /// Show one context
    Show { name: String },
    /// List all contexts
    List,
    /// Rename a context, keeping root and consumed ranges
    Rename { old: String, new: String },
    /// Remove all consumed ranges from a context, keeping its root
    Clear { name: String },
    /// Delete a context from the registry
    Delete { name: String },
    /// Replay a cloud virtual-network description (JSON) into contexts
    Reconcile {
        /// Base name for the created context(s)
        name: String,
        /// Path to the virtual-network description file
        description: PathBuf,
    },
}

/// What a command did, for deciding whether to save and how to exit
#[derive(Debug, Default)]
struct Outcome {
    mutated: bool,
    failed_requests: usize,
}

fn parse_ranges(texts: &[String]) -> Result<Vec<AddressRange>, IpamError> {
    texts.iter().map(|text| text.parse()).collect()
}

fn execute(registry: &mut ContextRegistry, command: &Command) -> Result<Outcome> {
    let mut outcome = Outcome::default();
    match command {
        Command::SetContext {
            name,
            root,
            consumed,
        } => {
            let root: AddressRange = root.parse()?;
            let seed = parse_ranges(consumed)?;
            registry.set_context(name, root, seed)?;
            println!("Context '{}' set with root {}", name, root);
            outcome.mutated = true;
        }

        Command::Reserve {
            context,
            prefix_lens,
            cidrs,
            counts,
            p2p,
        } => {
            // All argument parsing happens before any reservation runs
            let mut requests: Vec<ReservationRequest> = Vec::new();
            requests.extend(prefix_lens.iter().map(|p| ReservationRequest::ByPrefix(*p)));
            for range in parse_ranges(cidrs)? {
                requests.push(ReservationRequest::Exact(range));
            }
            requests.extend(counts.iter().map(|c| ReservationRequest::ByCount(*c)));
            requests.extend((0..*p2p).map(|_| ReservationRequest::PointToPoint));
            if requests.is_empty() {
                bail!("no reservation requested: pass --prefix-len, --cidr, --count, or --p2p");
            }

            let target = registry.get_mut(context)?;
            let results = engine::reserve_batch(target.consumed_mut(), &requests);
            for result in &results {
                match result {
                    Ok(granted) => {
                        println!("Reserved {}", granted);
                        outcome.mutated = true;
                    }
                    Err(error) => {
                        eprintln!("Failed: {}", error);
                        outcome.failed_requests += 1;
                    }
                }
            }
        }

        Command::Release { context, cidr } => {
            let range: AddressRange = cidr.parse()?;
            let target = registry.get_mut(context)?;
            match engine::release(target.consumed_mut(), range) {
                ReleaseOutcome::Released(released) => {
                    println!("Released {}", released);
                    outcome.mutated = true;
                }
                ReleaseOutcome::NotPresent(missed) => {
                    println!("Nothing removed: {} is not reserved in '{}'", missed, context);
                }
            }
        }

        Command::Validate { root, ranges } => {
            let root: AddressRange = root.parse()?;
            let candidates = parse_ranges(ranges)?;
            validate_against_root(root, &candidates)?;
            println!(
                "{} range(s) are contained in {} and mutually non-overlapping",
                candidates.len(),
                root
            );
        }

        Command::Show { name } => {
            let context = registry
                .get(name)
                .ok_or_else(|| IpamError::ContextNotFound { name: name.clone() })?;
            println!("Context: {}", context.name());
            println!("Root:    {}", context.root());
            println!("Consumed ({}):", context.consumed().len());
            for range in context.consumed().ranges() {
                println!("  {}", range);
            }
        }

        Command::List => {
            if registry.is_empty() {
                println!("No contexts");
            }
            for context in registry.iter() {
                println!(
                    "{}  {}  ({} consumed)",
                    context.name(),
                    context.root(),
                    context.consumed().len()
                );
            }
        }

        Command::Rename { old, new } => {
            registry.rename(old, new)?;
            println!("Renamed '{}' to '{}'", old, new);
            outcome.mutated = true;
        }

        Command::Clear { name } => {
            registry.clear(name)?;
            println!("Cleared context '{}'", name);
            outcome.mutated = true;
        }

        Command::Delete { name } => {
            if registry.remove(name).is_none() {
                return Err(IpamError::ContextNotFound { name: name.clone() }.into());
            }
            println!("Deleted context '{}'", name);
            outcome.mutated = true;
        }

        Command::Reconcile { name, description } => {
            let file = File::open(description).wrap_err_with(|| {
                format!("Failed to open description file '{}'", description.display())
            })?;
            let parsed: VirtualNetworkDescription = serde_json::from_reader(BufReader::new(file))
                .wrap_err_with(|| {
                    format!("Failed to parse description file '{}'", description.display())
                })?;

            let summaries = reconcile(registry, name, &parsed);
            for summary in &summaries {
                println!(
                    "Context '{}' ({}): {} reserved, {} skipped",
                    summary.context_name, summary.root, summary.reserved, summary.skipped
                );
            }
            outcome.mutated = !summaries.is_empty();
        }
    }
    Ok(outcome)
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse command-line arguments
    let args = Args::parse();

    // Initialize logging with default filter level of "info"
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    // Persistence is injected here: the engine itself never touches a file
    let mut registry = if args.state.exists() {
        persist::load_registry(&args.state)?
    } else {
        info!(
            "State file '{}' not found, starting with an empty registry",
            args.state.display()
        );
        ContextRegistry::new()
    };

    let outcome = execute(&mut registry, &args.command)?;

    // Batch elements that already succeeded are committed even when later
    // elements failed, so the state is saved before reporting the failure
    if outcome.mutated {
        persist::save_registry(&args.state, &registry)?;
    }
    if outcome.failed_requests > 0 {
        bail!("{} reservation request(s) failed", outcome.failed_requests);
    }
    Ok(())
}
