//! Account commands: login, register, logout.

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Input, Password};
use isonnik_types::auth::{MIN_PASSWORD_LEN, RegisterRequest};

use crate::state::AppState;

fn prompt_missing(value: Option<String>, prompt: &str) -> Result<String> {
    match value {
        Some(v) => Ok(v),
        None => Ok(Input::<String>::new().with_prompt(prompt).interact_text()?),
    }
}

/// Log in with email and a hidden password prompt.
pub async fn login(state: &AppState, email: Option<String>, json: bool) -> Result<()> {
    let email = prompt_missing(email, "Email")?;
    let password = Password::new().with_prompt("Password").interact()?;

    state
        .accounts
        .login(&email, &password)
        .await
        .context("login failed")?;

    if json {
        println!("{}", serde_json::json!({"logged_in": true, "email": email.trim()}));
    } else {
        println!(
            "  {} Logged in as {}",
            style("✓").green().bold(),
            style(email.trim()).bold()
        );
    }
    Ok(())
}

/// Create an account. Fields not given as flags are prompted for.
pub async fn register(
    state: &AppState,
    username: Option<String>,
    email: Option<String>,
    birth_date: Option<String>,
    json: bool,
) -> Result<()> {
    let username = prompt_missing(username, "Username")?;
    let email = prompt_missing(email, "Email")?;
    let birth_date = prompt_missing(birth_date, "Birth date (YYYY-MM-DD)")?;
    let password = Password::new()
        .with_prompt(format!("Password (at least {MIN_PASSWORD_LEN} characters)"))
        .with_confirmation("Repeat password", "Passwords do not match")
        .interact()?;

    let request = RegisterRequest {
        username: username.trim().to_string(),
        email: email.trim().to_string(),
        password,
        birth_date: birth_date.trim().to_string(),
    };

    state
        .accounts
        .register(&request)
        .await
        .context("registration failed")?;

    if json {
        println!("{}", serde_json::json!({"registered": true, "email": request.email}));
    } else {
        println!(
            "  {} Account created. Log in with: {}",
            style("✓").green().bold(),
            style("isonnik login").yellow()
        );
    }
    Ok(())
}

/// Log out and wipe the profile's local session, chats and quota.
pub async fn logout(state: &AppState, json: bool) -> Result<()> {
    let was_logged_in = state.accounts.is_authenticated().await?;
    state.accounts.logout().await.context("logout failed")?;

    if json {
        println!("{}", serde_json::json!({"logged_out": true, "was_logged_in": was_logged_in}));
    } else if was_logged_in {
        println!("  {} Logged out. Local history cleared.", style("✓").green().bold());
    } else {
        println!("  {} Not logged in. Local history cleared.", style("i").blue().bold());
    }
    Ok(())
}
