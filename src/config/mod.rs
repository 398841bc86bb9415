//! Layered configuration: TOML file, then `TONSEND__*` environment
//! variables, then command line flags.

mod defaults;
mod loader;

pub use defaults::{Network, WalletConfig};
pub use loader::{get_default_config, load_configuration, write_config_to};
