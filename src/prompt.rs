//! Operator decisions during a submission: smaller-amount retries and fee
//! confirmation.

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};
use tokio::sync::Mutex;

use crate::transactions::formatting::{format_nano_and_ton, format_ton};
use crate::transactions::{FeeBreakdown, TransferRequest};

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Failed to talk to the operator: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountDecision {
    Cancel,
    /// Try again with this many nanotons.
    Retry(u64),
}

#[async_trait]
pub trait Operator: Send + Sync {
    /// Whether a person can answer prompts. A non-interactive operator is
    /// never asked for a smaller amount.
    fn is_interactive(&self) -> bool {
        true
    }

    async fn smaller_amount(&self, balance: u64, requested: u64) -> Result<AmountDecision, PromptError>;

    async fn confirm_fee(&self, request: &TransferRequest, fees: &FeeBreakdown, total: u64)
    -> Result<bool, PromptError>;
}

/// Answers every fee confirmation the same way without asking.
#[derive(Debug, Clone, Copy)]
pub struct AutoOperator {
    confirm: bool,
}

impl AutoOperator {
    pub fn new(confirm: bool) -> Self {
        Self { confirm }
    }
}

#[async_trait]
impl Operator for AutoOperator {
    fn is_interactive(&self) -> bool {
        false
    }

    async fn smaller_amount(&self, _balance: u64, _requested: u64) -> Result<AmountDecision, PromptError> {
        Ok(AmountDecision::Cancel)
    }

    async fn confirm_fee(
        &self,
        _request: &TransferRequest,
        _fees: &FeeBreakdown,
        _total: u64,
    ) -> Result<bool, PromptError> {
        Ok(self.confirm)
    }
}

/// Line-based prompts on a reader/writer pair, stdin/stdout by default.
pub struct TerminalOperator<R = BufReader<Stdin>, W = Stdout> {
    input: Mutex<R>,
    output: Mutex<W>,
}

impl TerminalOperator {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> TerminalOperator<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(input: R, output: W) -> Self {
        Self {
            input: Mutex::new(input),
            output: Mutex::new(output),
        }
    }

    async fn say(&self, text: &str) -> Result<(), PromptError> {
        let mut output = self.output.lock().await;
        output.write_all(text.as_bytes()).await?;
        output.flush().await?;
        Ok(())
    }

    /// `None` on end of input.
    async fn ask(&self, question: &str) -> Result<Option<String>, PromptError> {
        self.say(question).await?;
        let mut line = String::new();
        let read = self.input.lock().await.read_line(&mut line).await?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    async fn ask_yes_no(&self, question: &str) -> Result<bool, PromptError> {
        Ok(self.ask(question).await?.is_some_and(|answer| is_yes(&answer)))
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.to_ascii_lowercase().as_str(), "yes" | "y")
}

#[async_trait]
impl<R, W> Operator for TerminalOperator<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn smaller_amount(&self, balance: u64, requested: u64) -> Result<AmountDecision, PromptError> {
        self.say(&format!(
            "Insufficient balance: have {}, need {}.\n",
            format_nano_and_ton(balance),
            format_nano_and_ton(requested)
        ))
        .await?;

        if !self
            .ask_yes_no("Do you want to try with a smaller amount? (yes/no): ")
            .await?
        {
            return Ok(AmountDecision::Cancel);
        }

        loop {
            let Some(answer) = self.ask("Please enter a smaller amount in nanotons: ").await? else {
                return Ok(AmountDecision::Cancel);
            };
            match answer.parse::<u64>() {
                Ok(amount) => return Ok(AmountDecision::Retry(amount)),
                Err(_) => self.say(&format!("'{answer}' is not a whole number of nanotons.\n")).await?,
            }
        }
    }

    async fn confirm_fee(
        &self,
        request: &TransferRequest,
        fees: &FeeBreakdown,
        total: u64,
    ) -> Result<bool, PromptError> {
        self.say(&format!(
            "Sending {} {} to {}\n\
             Estimated fee: {} nanoTON (in_fwd {}, storage {}, gas {}, fwd {})\n",
            format_ton(request.amount()),
            request.asset(),
            request.destination(),
            total,
            fees.in_fwd_fee,
            fees.storage_fee,
            fees.gas_fee,
            fees.fwd_fee,
        ))
        .await?;

        self.ask_yes_no(&format!(
            "Estimated fee: {} TON. Do you want to proceed? (yes/no): ",
            format_ton(total)
        ))
        .await
    }
}
