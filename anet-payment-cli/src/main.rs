//! Operator CLI for the Authorize.Net payment adapter.
//!
//! Runs single gateway operations against the merchant account described by a TOML
//! config file. Secrets are read from the environment variables the config names.
//! Results are printed to stdout as JSON; logs go to stderr.

mod observability;

use std::{path::PathBuf, process::ExitCode};

use anet_payment::{
    config::PaymentMethodConfig,
    error::{GatewayError, Result},
    gateway::{
        CaptureTransactionRequest, GatewayClient, PublicClientKeyRequest,
        RefundTransactionRequest, TransactionDetailsRequest, TransactionMessage, TransactionResult,
        VoidTransactionRequest,
    },
    payment::{AuthorizeNetPaymentMethod, MethodSettings, Order, Payment},
};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tracing::error;

use crate::observability::{LogFormat, init_observability};

/// Authorize.Net payment adapter CLI
#[derive(Parser, Debug)]
#[command(name = "anet-payment", version)]
#[command(about = "Run single Authorize.Net gateway operations for a configured merchant")]
struct Args {
    /// Payment method config file
    #[arg(short, long, default_value = "anet-payment.toml", env = "ANET_PAYMENT_CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the merchant's public client key for Accept.js
    ClientKey,
    /// Show the status of a transaction
    Details {
        /// Gateway transaction id
        transaction_id: String,
    },
    /// Capture a prior authorization
    Capture {
        /// Gateway transaction id
        transaction_id: String,
        /// Amount to capture
        #[arg(long)]
        amount: Decimal,
    },
    /// Refund a settled transaction
    Refund {
        /// Gateway transaction id
        transaction_id: String,
        /// Amount to refund
        #[arg(long)]
        amount: Decimal,
        /// Last four card digits; looked up from the transaction when omitted
        #[arg(long)]
        payment_data: Option<String>,
    },
    /// Void an unsettled transaction
    Void {
        /// Gateway transaction id
        transaction_id: String,
    },
    /// Render the Accept.js checkout form for an order
    CheckoutForm {
        /// Platform order id
        #[arg(long)]
        order_id: String,
        /// Human-facing order number
        #[arg(long, default_value = "")]
        order_number: String,
        /// Amount due
        #[arg(long)]
        amount: Decimal,
        /// ISO 4217 currency code
        #[arg(long, default_value = "USD")]
        currency: String,
        /// Customer IP
        #[arg(long)]
        user_ip: Option<String>,
    },
}

fn messages_json(messages: &[TransactionMessage]) -> Value {
    messages.iter().map(|m| json!({ "code": m.code, "description": m.description })).collect()
}

fn transaction_json(result: &TransactionResult) -> Value {
    json!({
        "is_success": result.is_success,
        "outcome": format!("{:?}", result.outcome()),
        "response_code": result.response_code,
        "transaction_id": result.transaction_id,
        "transaction_status": result.transaction_status,
        "transaction_type": result.transaction_type,
        "account_number": result.account_number,
        "messages": messages_json(&result.messages),
        "errors": messages_json(&result.errors),
    })
}

/// Card number the gateway reported for a transaction, for use as refund payment data.
fn refund_payment_data(details: &TransactionResult) -> Result<String> {
    match &details.account_number {
        Some(account_number) if !account_number.is_empty() => Ok(account_number.clone()),
        _ => Err(GatewayError::InvalidInput(
            "transaction details carry no card number; pass --payment-data".to_owned(),
        )),
    }
}

async fn run(command: Command, config: &PaymentMethodConfig) -> Result<Value> {
    let credentials = config.resolve_credentials()?;
    let client = config.build_client()?;

    let output = match command {
        Command::ClientKey => {
            let result = client.get_public_client_key(&PublicClientKeyRequest { credentials }).await?;
            json!({
                "is_success": result.is_success,
                "client_key": result.client_key,
                "messages": messages_json(&result.messages),
            })
        }
        Command::Details { transaction_id } => {
            let request = TransactionDetailsRequest { credentials, transaction_id };
            transaction_json(&client.get_transaction_details(&request).await?)
        }
        Command::Capture { transaction_id, amount } => {
            let request = CaptureTransactionRequest { credentials, transaction_id, amount };
            transaction_json(&client.capture_transaction(&request).await?)
        }
        Command::Refund { transaction_id, amount, payment_data } => {
            let payment_data = match payment_data {
                Some(payment_data) => payment_data,
                None => {
                    let details = client
                        .get_transaction_details(&TransactionDetailsRequest {
                            credentials: credentials.clone(),
                            transaction_id: transaction_id.clone(),
                        })
                        .await?;
                    refund_payment_data(&details)?
                }
            };
            let request =
                RefundTransactionRequest { credentials, transaction_id, amount, payment_data };
            transaction_json(&client.refund_transaction(&request).await?)
        }
        Command::Void { transaction_id } => {
            let request = VoidTransactionRequest { credentials, transaction_id };
            transaction_json(&client.void_transaction(&request).await?)
        }
        Command::CheckoutForm { order_id, order_number, amount, currency, user_ip } => {
            let method =
                AuthorizeNetPaymentMethod::new(client, MethodSettings::new(config, credentials));
            let order = Order { id: order_id.clone(), number: order_number };
            let mut payment = Payment::new(order_id, amount, currency);
            let result = method.process_payment(&mut payment, &order, user_ip.as_deref()).await?;
            json!({
                "is_success": result.is_success,
                "new_status": format!("{:?}", result.new_status),
                "html_form": result.html_form,
                "error_message": result.error_message,
            })
        }
    };
    Ok(output)
}

#[tokio::main]
async fn main() -> ExitCode {
    init_observability(LogFormat::from_env());
    let args = Args::parse();

    let config = match PaymentMethodConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, config = %args.config.display(), "cannot load config");
            return ExitCode::FAILURE;
        }
    };

    match run(args.command, &config).await {
        Ok(output) => {
            println!("{output:#}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "operation failed");
            ExitCode::FAILURE
        }
    }
}
