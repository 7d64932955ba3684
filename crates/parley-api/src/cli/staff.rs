//! `parley grant-staff`: promote an account.

use anyhow::{Result, bail};
use console::style;
use parley_types::error::ServiceError;
use parley_types::user::PublicUser;

use crate::state::AppState;

pub async fn grant_staff(state: &AppState, email: &str, json: bool) -> Result<()> {
    let user = match state.auth_service.grant_staff(email).await {
        Ok(user) => user,
        Err(ServiceError::NotFound) => bail!("No account with email '{email}'"),
        Err(e) => return Err(e.into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&PublicUser::from(&user))?);
        return Ok(());
    }

    println!();
    println!(
        "  {} {} is now staff",
        style("✓").green().bold(),
        style(&user.email).cyan()
    );
    println!();
    Ok(())
}
