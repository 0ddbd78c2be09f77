//! Bank client CLI

use anyhow::Context;
use clap::{Parser, Subcommand};
use shardbank::common::ClientCommand;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

#[derive(Parser)]
#[command(name = "shardbank")]
#[command(about = "shardbank bank client")]
#[command(version)]
struct Cli {
    /// Coordinator address
    #[arg(long, default_value = "localhost:9000")]
    coordinator: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create accounts 1..=count, each on its owning shard
    CreateAccounts {
        /// Number of accounts
        count: u32,

        /// Initial balance per account
        #[arg(long, default_value = "0")]
        initial: f64,
    },

    /// Show one account
    Consult {
        /// Account id
        account: i64,
    },

    /// Transfer between two accounts
    Transfer {
        /// Source account id
        from: i64,

        /// Destination account id
        to: i64,

        /// Amount to move
        #[arg(long)]
        amount: f64,
    },

    /// Open a loan against an account
    LoanCreate {
        /// Account id
        account: i64,

        /// Loan principal
        #[arg(long)]
        amount: f64,

        /// Initially pending amount
        #[arg(long)]
        pending: f64,
    },

    /// Pay into a loan
    LoanPay {
        /// Account id
        account: i64,

        /// Loan id
        loan: i64,

        /// Payment amount
        #[arg(long)]
        amount: f64,
    },

    /// Show the loans of an account
    LoanStatus {
        /// Account id
        account: i64,
    },

    /// Cluster-wide audit: total balance and account count
    Arqueo,
}

impl Commands {
    fn to_command(&self) -> ClientCommand {
        match *self {
            Commands::CreateAccounts { count, initial } => ClientCommand::CreateAccounts {
                count,
                initial_balance: initial,
            },
            Commands::Consult { account } => ClientCommand::ConsultAccount {
                account_id: account,
            },
            Commands::Transfer { from, to, amount } => {
                ClientCommand::Transfer { from, to, amount }
            }
            Commands::LoanCreate {
                account,
                amount,
                pending,
            } => ClientCommand::CreateLoan {
                account_id: account,
                amount,
                pending_amount: pending,
            },
            Commands::LoanPay {
                account,
                loan,
                amount,
            } => ClientCommand::PayLoan {
                account_id: account,
                loan_id: loan,
                amount,
            },
            Commands::LoanStatus { account } => ClientCommand::LoanStatus {
                account_id: account,
            },
            Commands::Arqueo => ClientCommand::Arqueo,
        }
    }

    /// CREATE_ACCOUNTS answers with an INFO line before its DONE line.
    fn reply_lines(&self) -> usize {
        match self {
            Commands::CreateAccounts { .. } => 2,
            _ => 1,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let stream = TcpStream::connect(&cli.coordinator)
        .await
        .with_context(|| format!("cannot reach coordinator at {}", cli.coordinator))?;
    let (read_half, mut writer) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    writer.write_all(b"CLIENT_BANK|cli\n").await?;
    let welcome = lines
        .next_line()
        .await?
        .context("coordinator closed the connection during handshake")?;
    tracing::debug!(%welcome, "handshake complete");

    writer
        .write_all(format!("{}\n", cli.command.to_command().to_line()).as_bytes())
        .await?;

    for _ in 0..cli.command.reply_lines() {
        let reply = lines
            .next_line()
            .await?
            .context("coordinator closed the connection before replying")?;
        println!("{}", reply);
    }

    Ok(())
}
