//! emberkv CLI Client
//!
//! Command-line interface for interacting with an emberkv server.

use clap::{Parser, Subcommand};

use emberkv::network::Client;

/// emberkv CLI
#[derive(Parser, Debug)]
#[command(name = "emberkv-cli")]
#[command(about = "CLI for the emberkv key-value store")]
#[command(version)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:4690")]
    server: String,

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

    /// Remove a key
    Rm {
        /// The key to remove
        key: String,
    },
}

fn main() {
    let args = Args::parse();
    let client = Client::new(&args.server);

    let result = match args.command {
        Commands::Get { key } => match client.get(&key) {
            Ok(Some(value)) => {
                println!("{}", value);
                Ok(())
            }
            Ok(None) => {
                println!("(key not found)");
                Ok(())
            }
            Err(e) => Err(e),
        },
        Commands::Set { key, value } => client.set(&key, &value),
        Commands::Rm { key } => client.remove(&key),
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
