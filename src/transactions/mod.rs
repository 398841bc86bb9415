//! Transfer construction and submission.
//!
//! This module turns a [`TransferRequest`] into a broadcast wallet transfer:
//!
//! - **Message Building**: [`MessageBuilder`] encodes the comment body, or
//!   reuses a body still pending in the destination's history
//! - **Fee Estimation**: [`FeeEstimator`] asks the remote service to simulate
//!   the message and returns a [`FeeBreakdown`]
//! - **History**: [`TransactionHistory`] reads recent transactions and their fees
//! - **Submission**: [`TransferSubmitter`] drives the balance check, the
//!   operator prompts and the broadcast
//!
//! # Architecture
//!
//! ```text
//! +-------------------+     +------------------+     +-------------------+
//! | TransferSubmitter |---->| MessageBuilder   |     | Operator (prompt) |
//! +-------------------+     +------------------+     +-------------------+
//!     |        |                                              ^
//!     |        +------------>+------------------+             |
//!     |                      | FeeEstimator     |-------------+
//!     v                      +------------------+
//! +-------------------+              |
//! | WalletClient      |              v
//! +-------------------+     +------------------+
//!                           | ToncenterClient  |
//!                           +------------------+
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use tonsend::transactions::{AssetKind, TransferRequest, TransferSubmitter};
//!
//! let request = TransferRequest::new(destination, 1_000_000_000, AssetKind::Ton, None);
//! match submitter.submit(request).await {
//!     SubmissionOutcome::Sent(hash) => println!("{hash}"),
//!     other => eprintln!("{other:?}"),
//! }
//! ```

pub mod fee_estimator;
pub mod formatting;
pub mod history;
pub mod message_builder;
pub mod request;
pub mod submission;

pub use fee_estimator::{FeeBreakdown, FeeError, FeeEstimationError, FeeEstimator};
pub use history::{HistoryError, TransactionFees, TransactionHistory};
pub use message_builder::{CommentEncoding, MAX_COMMENT_BYTES, MessageBody, MessageBuildError, MessageBuilder};
pub use request::{AssetKind, SubmissionOutcome, TransferRequest};
pub use submission::{DEFAULT_MAX_AMOUNT_RETRIES, SubmissionError, TransferSubmitter};

pub use crate::wallet::TxHash;
