use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Network;
use crate::transactions::AssetKind;

#[derive(Parser)]
#[command(name = "tonsend")]
#[command(about = "Submit TON transfers through a toncenter API", long_about = None)]
pub struct Cli {
    #[arg(short, long, help = "Path to the configuration file", default_value = "config/config.toml")]
    pub config: PathBuf,
    #[arg(short, long, help = "The TON network to use, overrides the configuration file")]
    pub network: Option<Network>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a key pair and save it with its wallet address to the credential file
    Init {
        #[arg(short, long, help = "Workchain of the wallet address", default_value_t = 0, allow_negative_numbers = true)]
        workchain: i8,
        #[arg(short, long, help = "Password to encrypt the private key")]
        password: Option<String>,
        #[arg(long, help = "Overwrite an existing credential file")]
        force: bool,
    },
    /// Show the wallet balance
    Balance {
        #[arg(short, long, help = "Password to decrypt the private key")]
        password: Option<String>,
    },
    /// Estimate the fee of a transfer without sending it
    Estimate {
        #[arg(short, long, help = "Destination address")]
        to: String,
        #[arg(short, long, help = "Comment to attach. Defaults to the asset's comment")]
        comment: Option<String>,
        #[arg(long, help = "Asset to send (ton or usdt)", default_value_t = AssetKind::Ton)]
        asset: AssetKind,
        #[arg(long, help = "Base64 BoC of the state init code")]
        init_code: Option<String>,
        #[arg(long, help = "Base64 BoC of the state init data")]
        init_data: Option<String>,
    },
    /// Show the body and fees of the last transaction of an address
    History {
        #[arg(short, long, help = "Address to inspect. Defaults to the wallet address")]
        address: Option<String>,
        #[arg(long, help = "Hash of a specific transaction to look up")]
        hash: Option<String>,
        #[arg(short, long, help = "Password to decrypt the private key")]
        password: Option<String>,
    },
    /// Send a transfer
    Send {
        #[arg(short, long, help = "Destination address")]
        to: String,
        #[arg(short = 'm', long, help = "Amount in nanotons")]
        amount: u64,
        #[arg(long, help = "Asset to send (ton or usdt)", default_value_t = AssetKind::Ton)]
        asset: AssetKind,
        #[arg(short, long, help = "Comment to attach. Defaults to the asset's comment")]
        comment: Option<String>,
        #[arg(short, long, help = "Password to decrypt the private key")]
        password: Option<String>,
        #[arg(short, long, help = "Accept the estimated fee without asking")]
        yes: bool,
    },
}
