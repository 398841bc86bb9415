use std::sync::Arc;

use anyhow::{Context, anyhow, bail};
use clap::Parser;
use log::{info, warn};

use tonsend::address::TonAddress;
use tonsend::cli::{Cli, Commands};
use tonsend::config::{Network, WalletConfig, load_configuration};
use tonsend::credentials::{CredentialStore, Credentials, EnvFileCredentialStore};
use tonsend::http::ToncenterClient;
use tonsend::log::{init_logging, mask_string};
use tonsend::prompt::{AutoOperator, Operator, TerminalOperator};
use tonsend::transactions::formatting::{format_nano_and_ton, format_ton};
use tonsend::transactions::{
    FeeEstimator, MessageBuilder, SubmissionOutcome, TransactionHistory, TransferRequest, TransferSubmitter,
};
use tonsend::wallet::{ToncenterWallet, V4R2Signer};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    init_logging()?;
    let cli = Cli::parse();

    let config = load_configuration(&cli.config, cli.network)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    let store = EnvFileCredentialStore::new(&config.credentials_path);

    match cli.command {
        Commands::Init {
            workchain,
            password,
            force,
        } => init(&store, workchain, config.network == Network::Testnet, password.as_deref(), force),
        Commands::Balance { password } => {
            let credentials = store.load(password.as_deref()).context("Failed to load credentials")?;
            balance(&config, &credentials).await
        },
        Commands::Estimate {
            to,
            comment,
            asset,
            init_code,
            init_data,
        } => {
            let request = TransferRequest::new(to, 0, asset, comment);
            estimate(&config, &request, init_code.as_deref(), init_data.as_deref()).await
        },
        Commands::History {
            address,
            hash,
            password,
        } => {
            let address = match address {
                Some(address) => address,
                None => {
                    store
                        .load(password.as_deref())
                        .context("Failed to load credentials")?
                        .address
                },
            };
            history(&config, &address, hash.as_deref()).await
        },
        Commands::Send {
            to,
            amount,
            asset,
            comment,
            password,
            yes,
        } => {
            let credentials = store.load(password.as_deref()).context("Failed to load credentials")?;
            send(&config, credentials, TransferRequest::new(to, amount, asset, comment), yes).await
        },
    }
}

fn toncenter_client(config: &WalletConfig) -> Result<Arc<ToncenterClient>, anyhow::Error> {
    let base_url = config.base_url().context("Invalid base_url")?;
    let client = ToncenterClient::with_config(base_url, config.api_key(), config.retry_settings())?;
    Ok(Arc::new(client))
}

fn init(
    store: &EnvFileCredentialStore,
    workchain: i8,
    testnet: bool,
    password: Option<&str>,
    force: bool,
) -> Result<(), anyhow::Error> {
    if store.exists() && !force {
        println!(
            "Credentials already exist at {}. Use --force to replace them.",
            store.path().display()
        );
        return Ok(());
    }

    let credentials = Credentials::generate(workchain, testnet).context("Failed to generate credentials")?;
    store
        .save(&credentials, password, force)
        .context("Failed to save credentials")?;

    println!("Keys and address saved to {}", store.path().display());
    println!("Address:    {}", credentials.address);
    println!("Public key: {}", hex::encode(credentials.public_key().to_bytes()));
    if password.is_none() {
        warn!("Private key stored unencrypted");
    }
    Ok(())
}

async fn balance(config: &WalletConfig, credentials: &Credentials) -> Result<(), anyhow::Error> {
    let client = toncenter_client(config)?;
    let balance = client
        .get_address_balance(&credentials.address)
        .await
        .context("Failed to fetch balance")?;

    println!("Address: {}", credentials.address);
    println!("Balance: {}", format_nano_and_ton(balance));
    Ok(())
}

async fn estimate(
    config: &WalletConfig,
    request: &TransferRequest,
    init_code: Option<&str>,
    init_data: Option<&str>,
) -> Result<(), anyhow::Error> {
    let destination = TonAddress::parse(request.destination()).context("Invalid destination address")?;
    let body = MessageBuilder::new(config.comment_encoding).build_comment_body(request.effective_comment())?;

    let estimator = FeeEstimator::new(toncenter_client(config)?);
    let fees = estimator
        .estimate(
            &destination.to_user_friendly(),
            &body.to_boc_base64()?,
            init_code,
            init_data,
        )
        .await
        .context("Fee estimation failed")?;
    let total = fees.total()?;

    println!("Comment:     {}", request.effective_comment());
    println!("In fwd fee:  {}", format_nano_and_ton(fees.in_fwd_fee));
    println!("Storage fee: {}", format_nano_and_ton(fees.storage_fee));
    println!("Gas fee:     {}", format_nano_and_ton(fees.gas_fee));
    println!("Fwd fee:     {}", format_nano_and_ton(fees.fwd_fee));
    println!("Total:       {}", format_nano_and_ton(total));
    Ok(())
}

async fn history(config: &WalletConfig, address: &str, hash: Option<&str>) -> Result<(), anyhow::Error> {
    let history = TransactionHistory::new(toncenter_client(config)?, config.history_limit);
    let Some(fees) = history
        .last_transaction_fees(address, hash)
        .await
        .context("Failed to fetch transaction history")?
    else {
        println!("No transactions found for {address}");
        return Ok(());
    };

    if let Some(hash) = &fees.hash {
        println!("Transaction: {hash}");
    }
    match fees.body.as_deref() {
        Some(body) => {
            let builder = MessageBuilder::new(config.comment_encoding);
            match builder
                .reuse_pending_body(body)
                .and_then(|b| builder.decode_comment_body(b.cell()))
            {
                Ok(comment) => println!("Comment:     {comment}"),
                Err(_) => println!("Body:        {body}"),
            }
        },
        None => println!("Body:        (none)"),
    }
    println!("Fee:         {}", format_nano_and_ton(fees.fee));
    println!("Storage fee: {}", format_nano_and_ton(fees.storage_fee));
    println!("Other fee:   {}", format_nano_and_ton(fees.other_fee));
    println!("Fwd fee:     {}", format_nano_and_ton(fees.fwd_fee));
    Ok(())
}

async fn send(
    config: &WalletConfig,
    credentials: Credentials,
    request: TransferRequest,
    yes: bool,
) -> Result<(), anyhow::Error> {
    let client = toncenter_client(config)?;
    let address = TonAddress::parse(&credentials.address).context("Invalid wallet address in credentials")?;
    let signer = V4R2Signer::new(credentials.private_key.signing_key().clone(), address);
    let wallet = Arc::new(ToncenterWallet::new(
        client.clone(),
        signer,
        config.confirmation_settings(),
    ));

    let operator: Arc<dyn Operator> = if yes {
        Arc::new(AutoOperator::new(true))
    } else {
        Arc::new(TerminalOperator::stdio())
    };

    let submitter = TransferSubmitter::new(
        wallet,
        operator,
        FeeEstimator::new(client.clone()),
        TransactionHistory::new(client, config.history_limit),
        MessageBuilder::new(config.comment_encoding),
    )
    .with_max_amount_retries(config.max_amount_retries);

    let asset = request.asset();
    info!(
        destination = &*mask_string(request.destination()),
        asset:% = asset;
        "Submitting transfer"
    );

    match submitter.submit(request).await {
        SubmissionOutcome::Sent(hash) => {
            println!("Transaction sent. Hash: {hash}");
            Ok(())
        },
        SubmissionOutcome::Cancelled => {
            println!("Transaction cancelled.");
            Ok(())
        },
        SubmissionOutcome::InsufficientBalance { balance, requested } => bail!(
            "Insufficient balance: have {} TON, need {} TON",
            format_ton(balance),
            format_ton(requested)
        ),
        SubmissionOutcome::Failed(e) => Err(anyhow!(e).context(format!("Failed to send {asset}"))),
    }
}

