pub mod address;
pub mod cell;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod http;
pub mod log;
pub mod prompt;
pub mod transactions;
pub mod wallet;

pub use crate::config::{WalletConfig, load_configuration};
pub use crate::credentials::{CredentialStore, Credentials, EnvFileCredentialStore};
pub use crate::transactions::{AssetKind, SubmissionOutcome, TransferRequest, TransferSubmitter};
pub use crate::wallet::{ToncenterWallet, WalletClient};
