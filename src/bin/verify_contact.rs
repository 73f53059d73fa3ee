//! Utility to verify one contact from the command line.
//!
//! Usage: `verify_contact <contact_id> [email]`
//!
//! Runs the same pipeline as `POST /api/v1/functions/verify-contact` and
//! prints the `{statusCode, body}` envelope. Exits with status 1 when the
//! verification did not succeed.

use kickbox_hubspot_api::card::CardVerification;
use kickbox_hubspot_api::config::Config;
use kickbox_hubspot_api::core::pipeline::{dispatch, InvocationContext, InvocationResponse, VerificationPipeline};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}

/// Main entry point for the contact verification utility.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kickbox_hubspot_api=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut args = std::env::args().skip(1);
    let Some(contact_id) = args.next() else {
        anyhow::bail!("Usage: verify_contact <contact_id> [email]");
    };
    let email = args.next();

    let config = Config::from_env()?;
    let pipeline = VerificationPipeline::new(&config);

    let context = InvocationContext::Direct {
        contact_id: Some(contact_id),
        email,
    };

    let envelope = match dispatch(pipeline.as_ref(), context).await {
        InvocationResponse::Function(envelope) => envelope,
        other => anyhow::bail!("Unexpected response for a direct call: {:?}", other),
    };

    println!("{}", serde_json::to_string_pretty(&envelope)?);

    if !envelope.is_success() {
        std::process::exit(1);
    }

    let body = envelope.body_json()?;
    if let Some(v) = CardVerification::from_function_body(&body) {
        println!();
        println!("Status:     {}", v.status_label);
        println!("Reason:     {}", v.reason_label);
        println!("Sendex:     {}", v.sendex_percent);
        println!("Success:    {}", yes_no(v.success));
        println!("Disposable: {}", yes_no(v.disposable));
        println!("Accept all: {}", yes_no(v.accept_all));
        println!("Role:       {}", yes_no(v.role));
        println!("Free:       {}", yes_no(v.free));
        if let Some(suggestion) = v.did_you_mean {
            println!("Did you mean: {}", suggestion);
        }
        if let Some(date) = v.verification_date {
            println!("Verified at: {}", date);
        }
    }

    Ok(())
}
