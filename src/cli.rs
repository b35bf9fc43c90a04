//! Command line driver: each command loads one state file, applies one
//! operation and writes the file back. A failed operation writes nothing.

use crate::config::Settings;
use crate::models::{Cidr, NetworkStatus, NetworkType, SubnetStatus};
use crate::output::print_state;
use crate::processing::{Counter, NetworkAggregate, SubnetTracker};
use crate::store::{read_state, write_state, StateDoc};
use clap::{Parser, Subcommand};
use num_bigint::{BigInt, BigUint};
use std::error::Error;
use std::path::Path;

#[derive(Parser, Debug)]
#[command(name = "ipam")]
#[command(about = "Allocate prefixes, addresses and network identifiers from JSON state files.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage the vacant blocks of a subnet
    Subnet {
        file: String,
        #[command(subcommand)]
        action: SubnetAction,
    },
    /// Manage the root ranges of a network
    Network {
        file: String,
        #[command(subcommand)]
        action: NetworkAction,
    },
    /// Manage a network identifier counter
    Counter {
        file: String,
        #[command(subcommand)]
        action: CounterAction,
    },
    /// Print a state file
    Show { file: String },
}

#[derive(Subcommand, Debug)]
pub enum SubnetAction {
    /// Create a subnet state with `cidr` fully vacant
    Init { cidr: Cidr },
    Reserve { cidr: Cidr },
    Release { cidr: Cidr },
    /// Print a free block without reserving it
    Propose {
        #[arg(long, conflicts_with = "capacity", required_unless_present = "capacity")]
        bits: Option<u8>,
        #[arg(long)]
        capacity: Option<BigUint>,
    },
}

#[derive(Subcommand, Debug)]
pub enum NetworkAction {
    Reserve { cidr: Cidr },
    Release { cidr: Cidr },
}

#[derive(Subcommand, Debug)]
pub enum CounterAction {
    /// Create a counter holding the full identifier range of `network_type`
    Init { network_type: NetworkType },
    Reserve {
        #[arg(allow_hyphen_values = true)]
        id: BigInt,
    },
    Release {
        #[arg(allow_hyphen_values = true)]
        id: BigInt,
    },
    /// Print the next free identifier without reserving it
    Propose,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Run one command against the state directory in `settings`.
pub fn run(cli: CommandLine, settings: &Settings) -> Result<(), Box<dyn Error>> {
    match cli.command {
        Commands::Subnet { file, action } => run_subnet(&settings.state_path(&file), action),
        Commands::Network { file, action } => run_network(&settings.state_path(&file), action),
        Commands::Counter { file, action } => run_counter(&settings.state_path(&file), action),
        Commands::Show { file } => {
            let doc = read_state(&settings.state_path(&file))?;
            print_state(&doc)?;
            Ok(())
        }
    }
}

fn wrong_kind(path: &Path, expected: &str, found: &StateDoc) -> Box<dyn Error> {
    format!(
        "State file {} holds a {}, expected a {expected}",
        path.display(),
        found.kind()
    )
    .into()
}

fn refuse_existing(path: &Path) -> Result<(), Box<dyn Error>> {
    if path.exists() {
        return Err(format!("State file {} already exists", path.display()).into());
    }
    Ok(())
}

fn save(path: &Path, doc: StateDoc) -> Result<(), Box<dyn Error>> {
    write_state(path, &doc)?;
    print_state(&doc)?;
    Ok(())
}

fn load_subnet(path: &Path) -> Result<(SubnetStatus, SubnetTracker), Box<dyn Error>> {
    match read_state(path)? {
        StateDoc::Subnet(status) => {
            let tracker = SubnetTracker::from_status(&status)?;
            Ok((status, tracker))
        }
        other => Err(wrong_kind(path, "subnet", &other)),
    }
}

fn save_subnet(
    path: &Path,
    mut status: SubnetStatus,
    tracker: &SubnetTracker,
) -> Result<(), Box<dyn Error>> {
    tracker.write_status(&mut status);
    save(path, StateDoc::Subnet(status))
}

fn run_subnet(path: &Path, action: SubnetAction) -> Result<(), Box<dyn Error>> {
    match action {
        SubnetAction::Init { cidr } => {
            refuse_existing(path)?;
            save_subnet(path, SubnetStatus::default(), &SubnetTracker::fill_from(cidr))
        }
        SubnetAction::Reserve { cidr } => {
            let (status, mut tracker) = load_subnet(path)?;
            tracker.reserve(&cidr)?;
            save_subnet(path, status, &tracker)
        }
        SubnetAction::Release { cidr } => {
            let (status, mut tracker) = load_subnet(path)?;
            tracker.release(&cidr)?;
            save_subnet(path, status, &tracker)
        }
        SubnetAction::Propose { bits, capacity } => {
            let (_, tracker) = load_subnet(path)?;
            let proposal = match (bits, capacity) {
                (Some(bits), None) => tracker.propose_by_bits(bits)?,
                (None, Some(capacity)) => tracker.propose_by_capacity(&capacity)?,
                _ => return Err("exactly one of --bits, --capacity is required".into()),
            };
            println!("{proposal}");
            Ok(())
        }
    }
}

// A missing network file is an empty network.
fn load_network(path: &Path) -> Result<(NetworkStatus, NetworkAggregate), Box<dyn Error>> {
    if !path.exists() {
        log::info!("Starting new network state {}", path.display());
        return Ok((NetworkStatus::default(), NetworkAggregate::new()));
    }
    match read_state(path)? {
        StateDoc::Network(status) => {
            let network = NetworkAggregate::from_status(&status)?;
            Ok((status, network))
        }
        other => Err(wrong_kind(path, "network", &other)),
    }
}

fn run_network(path: &Path, action: NetworkAction) -> Result<(), Box<dyn Error>> {
    let (mut status, mut network) = load_network(path)?;
    match action {
        NetworkAction::Reserve { cidr } => network.reserve(&cidr)?,
        NetworkAction::Release { cidr } => network.release(&cidr)?,
    }
    network.write_status(&mut status);
    save(path, StateDoc::Network(status))
}

fn load_counter(path: &Path) -> Result<(NetworkType, Counter), Box<dyn Error>> {
    match read_state(path)? {
        StateDoc::Counter(doc) => Ok((doc.network_type, Counter::from_doc(&doc)?)),
        other => Err(wrong_kind(path, "counter", &other)),
    }
}

fn run_counter(path: &Path, action: CounterAction) -> Result<(), Box<dyn Error>> {
    let (network_type, counter) = match action {
        CounterAction::Init { network_type } => {
            refuse_existing(path)?;
            (network_type, Counter::for_type(network_type))
        }
        CounterAction::Reserve { id } => {
            let (network_type, mut counter) = load_counter(path)?;
            counter.reserve(&id)?;
            (network_type, counter)
        }
        CounterAction::Release { id } => {
            let (network_type, mut counter) = load_counter(path)?;
            counter.release(&id)?;
            (network_type, counter)
        }
        CounterAction::Propose => {
            let (_, counter) = load_counter(path)?;
            println!("{}", counter.propose()?);
            return Ok(());
        }
    };
    save(path, StateDoc::Counter(counter.to_doc(network_type)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AllocationState;

    fn run_in(dir: &Path, args: &[&str]) -> Result<(), Box<dyn Error>> {
        let cli = CommandLine::try_parse_from(std::iter::once("ipam").chain(args.iter().copied()))?;
        let settings = Settings {
            state_dir: dir.to_path_buf(),
            ..Default::default()
        };
        run(cli, &settings)
    }

    #[test]
    fn test_subnet_commands() {
        let dir = tempfile::tempdir().unwrap();
        run_in(dir.path(), &["subnet", "pods.json", "init", "10.0.0.0/24"]).unwrap();
        run_in(dir.path(), &["subnet", "pods.json", "reserve", "10.0.0.0/26"]).unwrap();
        run_in(dir.path(), &["subnet", "pods.json", "propose", "--capacity", "100"]).unwrap();
        assert!(run_in(dir.path(), &["subnet", "pods.json", "init", "10.1.0.0/24"]).is_err());

        let StateDoc::Subnet(status) = read_state(&dir.path().join("pods.json")).unwrap() else {
            panic!("expected a subnet state");
        };
        assert_eq!(status.capacity_left, Some(BigUint::from(192u32)));
        assert_eq!(status.state, AllocationState::Allocated);
        assert_eq!(
            status.vacant,
            vec![
                Cidr::parse("10.0.0.64/26").unwrap(),
                Cidr::parse("10.0.0.128/25").unwrap()
            ]
        );
    }

    #[test]
    fn test_failed_command_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pods.json");
        run_in(dir.path(), &["subnet", "pods.json", "init", "10.0.0.0/24"]).unwrap();
        let before = std::fs::read_to_string(&path).unwrap();
        assert!(run_in(dir.path(), &["subnet", "pods.json", "reserve", "10.0.1.0/26"]).is_err());
        assert!(run_in(dir.path(), &["subnet", "pods.json", "release", "10.0.0.0/26"]).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn test_propose_needs_one_size() {
        assert!(CommandLine::try_parse_from(["ipam", "subnet", "f.json", "propose"]).is_err());
        assert!(CommandLine::try_parse_from([
            "ipam", "subnet", "f.json", "propose", "--bits", "24", "--capacity", "5"
        ])
        .is_err());
    }

    #[test]
    fn test_network_commands() {
        let dir = tempfile::tempdir().unwrap();
        run_in(dir.path(), &["network", "net.json", "reserve", "10.0.0.0/16"]).unwrap();
        run_in(dir.path(), &["network", "net.json", "reserve", "fd00::/64"]).unwrap();
        assert!(run_in(dir.path(), &["network", "net.json", "reserve", "10.0.1.0/24"]).is_err());
        run_in(dir.path(), &["network", "net.json", "release", "10.0.0.0/16"]).unwrap();

        let StateDoc::Network(status) = read_state(&dir.path().join("net.json")).unwrap() else {
            panic!("expected a network state");
        };
        assert!(status.ipv4_ranges.is_empty());
        assert_eq!(status.ipv6_ranges, vec![Cidr::parse("fd00::/64").unwrap()]);
        assert_eq!(status.ipv4_capacity, BigUint::from(0u32));
    }

    #[test]
    fn test_counter_commands() {
        let dir = tempfile::tempdir().unwrap();
        run_in(dir.path(), &["counter", "ids.json", "init", "generic"]).unwrap();
        run_in(dir.path(), &["counter", "ids.json", "reserve", "-5"]).unwrap();
        run_in(dir.path(), &["counter", "ids.json", "propose"]).unwrap();
        assert!(run_in(dir.path(), &["counter", "ids.json", "release", "7"]).is_err());
        assert!(run_in(dir.path(), &["subnet", "ids.json", "reserve", "10.0.0.0/8"]).is_err());
        run_in(dir.path(), &["show", "ids.json"]).unwrap();

        let StateDoc::Counter(doc) = read_state(&dir.path().join("ids.json")).unwrap() else {
            panic!("expected a counter state");
        };
        assert_eq!(doc.network_type, NetworkType::Generic);
        assert_eq!(doc.vacant.len(), 2);
    }
}
