//! Syncpoint CLI — thin wrapper over the client facade.
//!
//! One positional role argument selects the path: `1` attaches as the
//! Writer and commits the payload, `0` attaches as a Reader and prints
//! the latest committed payload. A missing or non-numeric role is a
//! usage error (exit code 2); service errors exit with code 1.

use std::process;

use clap::{Arg, Command};

use syncpoint_api::{CheckpointService, Client};
use syncpoint_core::{CheckpointName, Role, SectionId};

/// Exit code for malformed invocations.
const USAGE_EXIT: i32 = 2;

const DEFAULT_PAYLOAD: &str = "Hello world!";

fn build_cli() -> Command {
    Command::new("syncpoint")
        .about("Process-synchronizing checkpoint service")
        .arg(
            Arg::new("role")
                .value_name("ROLE")
                .required(true)
                .help("1 = Writer, 0 = Reader"),
        )
        .arg(
            Arg::new("payload")
                .value_name("PAYLOAD")
                .help("Payload the Writer commits (default: \"Hello world!\")"),
        )
        .arg(
            Arg::new("data-dir")
                .long("data-dir")
                .value_name("DIR")
                .default_value(".syncpoint")
                .help("Service data directory"),
        )
        .arg(
            Arg::new("checkpoint")
                .long("checkpoint")
                .value_name("NAME")
                .help("Checkpoint name (default: from syncpoint.toml)"),
        )
}

fn parse_role(raw: &str) -> Option<Role> {
    match raw.parse::<i64>() {
        Ok(1) => Some(Role::Writer),
        Ok(0) => Some(Role::Reader),
        _ => None,
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("SYNCPOINT_LOG"))
        .init();

    let matches = build_cli().get_matches();

    let raw_role = matches.get_one::<String>("role").expect("required arg");
    let role = match parse_role(raw_role) {
        Some(role) => role,
        None => {
            eprintln!("Wrong arguments USAGE: syncpoint <1(Writer)/0(Reader)> [PAYLOAD]");
            process::exit(USAGE_EXIT);
        }
    };

    let data_dir = matches.get_one::<String>("data-dir").expect("has default");
    let service = match CheckpointService::open(data_dir) {
        Ok(service) => service,
        Err(err) => {
            eprintln!("Failed to open service at {}: {}", data_dir, err);
            process::exit(1);
        }
    };

    let client = match matches.get_one::<String>("checkpoint") {
        Some(name) => match CheckpointName::new(name.clone()) {
            Ok(name) => {
                let section = SectionId::from(service.config().facade.section.as_str());
                let attrs = service.config().facade.attrs;
                Client::with_target(service, name, section, attrs)
            }
            Err(err) => {
                eprintln!("{}", err);
                process::exit(USAGE_EXIT);
            }
        },
        None => match Client::new(service) {
            Ok(client) => client,
            Err(err) => {
                eprintln!("{}", err);
                process::exit(1);
            }
        },
    };

    let outcome = match role {
        Role::Writer => {
            let payload = matches
                .get_one::<String>("payload")
                .map(String::as_str)
                .unwrap_or(DEFAULT_PAYLOAD);
            client.run_as_writer(payload.as_bytes()).map(|record| {
                println!(
                    "Committed {} to checkpoint {} ({} bytes)",
                    record.version,
                    client.checkpoint(),
                    payload.len()
                );
            })
        }
        Role::Reader => client.run_as_reader().map(|got| {
            println!(
                "Checkpoint {} {}: {}",
                client.checkpoint(),
                got.version,
                String::from_utf8_lossy(&got.value)
            );
        }),
    };

    if let Err(err) = outcome {
        eprintln!("{}", err);
        process::exit(1);
    }
}
