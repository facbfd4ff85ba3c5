use chrono::Utc;
use clap::Subcommand;
use taper_core::store::StateStore;

#[derive(Subcommand)]
pub enum ShieldAction {
    /// Spend a shield on today, recovering the day's negative points
    Use,
    /// Claim the monthly bonus shield (top rank only)
    Claim,
    /// Print the shield bank status
    Status,
}

pub fn run(user: &str, action: ShieldAction) -> Result<(), Box<dyn std::error::Error>> {
    let engine = super::open_engine()?;
    let now = Utc::now();

    match action {
        ShieldAction::Use => {
            let receipt = engine.use_shield(user, now)?;
            println!("{}", serde_json::to_string_pretty(&receipt)?);
        }
        ShieldAction::Claim => {
            let shields = engine.claim_monthly_shield(user, now)?;
            println!("{}", serde_json::json!({ "shields": shields }));
        }
        ShieldAction::Status => {
            let shields = engine
                .store()
                .progression(user)?
                .map(|s| s.shields_count)
                .unwrap_or(0);
            let settings = engine.store().settings(user)?;
            let status = serde_json::json!({
                "shields": shields,
                "lifetime_used": settings.shields_used,
                "monthly_claimed_on": settings.monthly_shield_claimed_on,
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }
    Ok(())
}
