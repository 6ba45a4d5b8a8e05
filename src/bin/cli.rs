//! ChainLog CLI Client
//!
//! Command-line interface for interacting with a ChainLog server.

use std::net::TcpStream;
use std::process::ExitCode;
use std::time::Duration;

use chainlog::protocol::{read_response, write_command, Command, Response, Status};
use clap::{Parser, Subcommand};

/// ChainLog CLI
#[derive(Parser, Debug)]
#[command(name = "chainlog-cli")]
#[command(about = "CLI for the ChainLog transaction log")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:7070")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Submit a transaction
    Submit {
        /// Transaction key
        key: String,

        /// Transaction value
        value: String,
    },

    /// Find every transaction with a key
    Search {
        /// The key to look up
        key: String,

        /// Timeout in milliseconds (0 = server default)
        #[arg(short, long, default_value = "0")]
        timeout_ms: u64,
    },

    /// Ping the server
    Ping,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let command = match args.command {
        Commands::Submit { key, value } => Command::Submit { key, value },
        Commands::Search { key, timeout_ms } => Command::Search {
            key,
            timeout: Duration::from_millis(timeout_ms),
        },
        Commands::Ping => Command::Ping,
    };

    match roundtrip(&args.server, &command) {
        Ok(response) => print_response(&response),
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn roundtrip(server: &str, command: &Command) -> chainlog::Result<Response> {
    let mut stream = TcpStream::connect(server)?;
    write_command(&mut stream, command)?;
    read_response(&mut stream)
}

fn print_response(response: &Response) -> ExitCode {
    match response.status {
        Status::Ok => match response.decode_transactions() {
            Ok(transactions) => {
                for tx in &transactions {
                    println!("{}\t{}\t{}", tx.timestamp(), tx.key(), tx.value());
                }
                ExitCode::SUCCESS
            }
            // PING answers with plain text
            Err(_) => {
                println!("{}", response.payload_str());
                ExitCode::SUCCESS
            }
        },
        Status::Accepted => {
            println!("accepted {}", response.payload_str());
            ExitCode::SUCCESS
        }
        Status::NotFound => {
            println!("(not found)");
            ExitCode::from(1)
        }
        Status::TimedOut => {
            println!("(timed out)");
            ExitCode::from(1)
        }
        Status::Error => {
            eprintln!("server error: {}", response.payload_str());
            ExitCode::FAILURE
        }
    }
}
