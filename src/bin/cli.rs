//! linekv CLI Client
//!
//! Command-line interface for interacting with linekv.

use clap::{Parser, Subcommand};
use linekv::{Client, Credentials, KvError, WireFormat};

/// linekv CLI
#[derive(Parser, Debug)]
#[command(name = "linekv-cli")]
#[command(about = "CLI for the linekv key-value store")]
#[command(version)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:6380")]
    server: String,

    /// Use the binary protocol instead of text
    #[arg(short, long)]
    binary: bool,

    /// Login for servers that require authentication
    #[arg(long, requires = "password")]
    login: Option<String>,

    /// Password for servers that require authentication
    #[arg(long, requires = "login")]
    password: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), KvError> {
    let wire_format = if args.binary {
        WireFormat::Binary
    } else {
        WireFormat::Text
    };

    let mut client = match (args.login, args.password) {
        (Some(login), Some(password)) => Client::connect_with_credentials(
            &args.server,
            wire_format,
            &Credentials::new(login, password),
        )?,
        _ => Client::connect(&args.server, wire_format)?,
    };

    match args.command {
        Commands::Get { key } => println!("{}", client.get(&key)?),
        Commands::Set { key, value } => println!("{}", client.set(&key, &value)?),
        Commands::Del { key } => println!("{}", client.del(&key)?),
    }

    Ok(())
}
