//! Subcommand definitions and handlers

use std::path::PathBuf;

use clap::{Args, Subcommand};
use eyre::bail;
use rackdb_inventory::Inventory;
use rackdb_model::{Host, normalize_key, render_host_table};
use rackdb_report::{HostSelection, LocationField, LocationManager, ReportGenerator, ReportMode};

#[derive(Subcommand)]
pub enum Command {
    /// Manage host records
    Host {
        #[command(subcommand)]
        action: HostCommand,
    },
    /// Build a consolidated host report
    Report(ReportArgs),
    /// Query or update a host's physical location over IPMI
    Locate {
        #[command(subcommand)]
        action: LocateCommand,
    },
}

#[derive(Subcommand)]
pub enum HostCommand {
    /// Register a new host
    Add(HostArgs),
    /// Apply a partial update to an existing host
    Update(HostArgs),
    /// Show one host
    Get { hostname: String },
    /// Remove a host
    Del { hostname: String },
    /// Show every registered host
    List,
}

#[derive(Args)]
pub struct HostArgs {
    /// Primary hostname, unique within the store
    pub hostname: String,
    /// SSH address (IP literal)
    #[arg(long)]
    pub ssh_addr: Option<String>,
    /// SSH port
    #[arg(long)]
    pub ssh_port: Option<u16>,
    /// SSH user
    #[arg(long)]
    pub ssh_user: Option<String>,
    /// IPMI address
    #[arg(long)]
    pub ipmi_addr: Option<String>,
    /// IPMI user
    #[arg(long)]
    pub ipmi_user: Option<String>,
    /// IPMI password
    #[arg(long)]
    pub ipmi_pass: Option<String>,
    /// Extra attribute as key=value, repeatable
    #[arg(short = 'e', long = "extra")]
    pub extra: Vec<String>,
}

#[derive(Args)]
pub struct ReportArgs {
    /// Cover every registered host
    #[arg(long, conflicts_with = "hosts")]
    pub all: bool,
    /// Cover only these hosts
    #[arg(long, value_delimiter = ',')]
    pub hosts: Vec<String>,
    /// Write the collector inventory file itself
    #[arg(long)]
    pub export: bool,
    /// Write merged per-host fact documents into a directory
    #[arg(long)]
    pub ansible: bool,
    /// Write the qualified dataset as JSON
    #[arg(long)]
    pub json: bool,
    /// Render a static HTML report
    #[arg(long)]
    pub html: bool,
    /// Output file or directory
    #[arg(short, long)]
    pub output: PathBuf,
}

#[derive(Subcommand)]
pub enum LocateCommand {
    /// Read the host's location record
    Get { hostname: String },
    /// Write one location field and verify the change
    Set {
        hostname: String,
        /// aisle, datacenter, rackname, rackslot, or roomname
        field: String,
        value: String,
    },
}

pub async fn run_host(inventory: &Inventory, action: HostCommand) -> eyre::Result<()> {
    match action {
        HostCommand::Add(args) => {
            let host = host_from_args(&args, true)?;
            inventory.add(host).await?;
            println!("Host '{}' created.", args.hostname);
        }
        HostCommand::Update(args) => {
            let host = host_from_args(&args, false)?;
            inventory.update(host).await?;
            println!("Host '{}' updated.", args.hostname);
        }
        HostCommand::Get { hostname } => {
            let host = inventory.get(&hostname).await?;
            println!("{}", render_host_table(std::slice::from_ref(&host)));
        }
        HostCommand::Del { hostname } => {
            inventory.delete(&hostname).await?;
            println!("Host '{hostname}' deleted.");
        }
        HostCommand::List => {
            let hosts = inventory.list().await?;
            println!("{}", render_host_table(&hosts));
        }
    }
    Ok(())
}

pub async fn run_report(inventory: &Inventory, args: ReportArgs) -> eyre::Result<()> {
    let mode = ReportMode::from_flags(args.export, args.ansible, args.json, args.html)?;
    let selection = if args.all {
        HostSelection::All
    } else if args.hosts.is_empty() {
        bail!("select hosts with --all or --hosts");
    } else {
        HostSelection::Named(args.hosts)
    };
    let generator = ReportGenerator::new(inventory);
    generator.generate(selection, mode, &args.output).await?;
    println!("Report saved to {}.", args.output.display());
    Ok(())
}

pub async fn run_locate(inventory: &Inventory, action: LocateCommand) -> eyre::Result<()> {
    let manager = LocationManager::new(inventory);
    let location = match action {
        LocateCommand::Get { hostname } => manager.get(&hostname).await?,
        LocateCommand::Set {
            hostname,
            field,
            value,
        } => {
            let field: LocationField = field.parse()?;
            manager.set(&hostname, field, &value).await?
        }
    };
    for (key, value) in location {
        println!("{key}={value}");
    }
    Ok(())
}

fn host_from_args(args: &HostArgs, creating: bool) -> eyre::Result<Host> {
    let mut host = if creating { Host::new() } else { empty_host() };
    host.hostname = args.hostname.clone();
    if let Some(addr) = &args.ssh_addr {
        host.ssh_address = addr.clone();
    }
    if let Some(port) = args.ssh_port {
        host.ssh_port = port;
    }
    if let Some(user) = &args.ssh_user {
        host.ssh_user = user.clone();
    }
    if let Some(addr) = &args.ipmi_addr {
        host.ipmi_address = addr.clone();
    }
    if let Some(user) = &args.ipmi_user {
        host.ipmi_user = user.clone();
    }
    if let Some(pass) = &args.ipmi_pass {
        host.ipmi_password = pass.clone();
    }
    for pair in &args.extra {
        let (key, value) = parse_extra_pair(pair)?;
        host.extra_info.insert(key, serde_json::Value::String(value));
    }
    Ok(host)
}

/// A host with every field unset, so the update merge policy can fill the
/// gaps from the stored record.
fn empty_host() -> Host {
    let mut host = Host::new();
    host.ssh_port = 0;
    host
}

fn parse_extra_pair(pair: &str) -> eyre::Result<(String, String)> {
    match pair.split_once('=') {
        Some((key, value)) if !key.is_empty() => {
            Ok((normalize_key(key), value.to_string()))
        }
        _ => bail!("malformed extra field '{pair}', expected key=value"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extra_pairs_parse_and_normalize_keys() {
        let (key, value) = parse_extra_pair("rack slot=A-12").unwrap();
        assert_eq!(key, "rack_slot");
        assert_eq!(value, "A-12");
    }

    #[test]
    fn extra_pair_value_may_contain_separator() {
        let (_, value) = parse_extra_pair("comment=a=b").unwrap();
        assert_eq!(value, "a=b");
    }

    #[test]
    fn malformed_extra_pair_is_rejected() {
        assert!(parse_extra_pair("no-separator").is_err());
        assert!(parse_extra_pair("=value").is_err());
    }

    #[test]
    fn update_args_leave_unset_fields_empty() {
        let args = HostArgs {
            hostname: "node-1".to_string(),
            ssh_addr: None,
            ssh_port: Some(2222),
            ssh_user: None,
            ipmi_addr: None,
            ipmi_user: None,
            ipmi_pass: None,
            extra: Vec::new(),
        };
        let host = host_from_args(&args, false).unwrap();
        assert_eq!(host.ssh_port, 2222);
        assert!(host.ssh_address.is_empty());
        assert!(host.ssh_user.is_empty());
    }

    #[test]
    fn create_args_default_the_ssh_port() {
        let args = HostArgs {
            hostname: "node-1".to_string(),
            ssh_addr: None,
            ssh_port: None,
            ssh_user: None,
            ipmi_addr: None,
            ipmi_user: None,
            ipmi_pass: None,
            extra: Vec::new(),
        };
        let host = host_from_args(&args, true).unwrap();
        assert_eq!(host.ssh_port, 22);
    }
}
