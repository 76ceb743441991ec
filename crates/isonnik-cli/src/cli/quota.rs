//! Quota, subscription and context commands.

use anyhow::{Context, Result, bail};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use isonnik_core::quota::PaymentOutcome;
use isonnik_core::render::NullSink;
use isonnik_types::error::ClientError;
use isonnik_types::quota::QuotaState;

use crate::state::AppState;

use super::chat::renderer::format_quota;

fn quota_json(state: &QuotaState, indicator: &str, refreshed: bool) -> serde_json::Value {
    serde_json::json!({
        "free_left": state.free_left,
        "total_sent": state.total_sent,
        "has_subscription": state.has_subscription,
        "indicator": indicator,
        "refreshed": refreshed,
    })
}

fn spinner(message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner
}

/// Show the local quota view, optionally refreshed from the server first.
pub async fn show_quota(app: &AppState, refresh: bool, json: bool) -> Result<()> {
    let refreshed = if refresh {
        let token = app.credentials.load().await?;
        app.quota
            .refresh_from_backend(app.backend.as_ref(), token.as_ref(), &NullSink)
            .await
            .is_some()
    } else {
        false
    };

    let state = app.quota.get_state().await?;
    let indicator = state.indicator(app.quota.limit());

    if json {
        println!("{}", quota_json(&state, &indicator, refreshed));
        return Ok(());
    }

    println!();
    println!("{}", format_quota(&state, &indicator));
    if refresh && !refreshed {
        println!(
            "  {}",
            style("Could not refresh from the server, showing the local count.").dim()
        );
    }
    println!();
    Ok(())
}

/// Run the payment flow.
pub async fn subscribe(app: &AppState, json: bool) -> Result<()> {
    let progress = spinner("Processing payment...");
    let outcome = app.subscriptions.subscribe(&NullSink).await;
    progress.finish_and_clear();

    let outcome = match outcome {
        Err(ClientError::NotAuthenticated) => bail!("not logged in, run `isonnik login` first"),
        other => other.context("payment failed")?,
    };

    match (outcome, json) {
        (PaymentOutcome::Activated(state), true) => {
            let indicator = state.indicator(app.quota.limit());
            println!(
                "{}",
                serde_json::json!({"activated": true, "quota": quota_json(&state, &indicator, true)})
            );
        }
        (PaymentOutcome::Activated(state), false) => {
            println!(
                "  {} Subscription activated.",
                style("✓").green().bold()
            );
            println!("{}", format_quota(&state, &state.indicator(app.quota.limit())));
        }
        (PaymentOutcome::Redirect(url), true) => {
            println!("{}", serde_json::json!({"activated": false, "payment_url": url}));
        }
        (PaymentOutcome::Redirect(url), false) => {
            println!(
                "  {} Finish the payment at {}",
                style("$").yellow().bold(),
                style(url).cyan().underlined()
            );
        }
    }
    Ok(())
}

/// Ask the server to forget the conversation and re-seed the greeting.
pub async fn clear_context(app: &AppState, json: bool) -> Result<()> {
    let session = match app.context.clear_context(&NullSink).await {
        Err(ClientError::NotAuthenticated) => bail!("not logged in, run `isonnik login` first"),
        other => other.context("could not clear context")?,
    };

    if json {
        println!(
            "{}",
            serde_json::json!({"cleared": true, "messages": session.messages.len()})
        );
    } else {
        println!("  {} Context cleared.", style("✓").green().bold());
    }
    Ok(())
}
