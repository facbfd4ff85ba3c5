use chrono::Utc;
use clap::Subcommand;
use taper_core::store::StateStore;
use taper_core::UserSettings;

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Get a settings value
    Get {
        /// Settings key (e.g. "pack_price", "initial_daily_goal")
        key: String,
    },
    /// Set a settings value
    Set {
        /// Settings key
        key: String,
        /// New value
        value: String,
    },
    /// List all settings
    List,
    /// Wipe progression and start over (events are kept)
    ResetAccount,
}

fn get_key(settings: &UserSettings, key: &str) -> Option<String> {
    match key {
        "pack_price" => Some(settings.pack_price.to_string()),
        "units_per_pack" => Some(settings.units_per_pack.to_string()),
        "initial_daily_goal" => Some(settings.initial_daily_goal.to_string()),
        _ => None,
    }
}

fn set_key(
    settings: &mut UserSettings,
    key: &str,
    value: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    match key {
        "pack_price" => settings.pack_price = value.parse()?,
        "units_per_pack" => settings.units_per_pack = value.parse()?,
        "initial_daily_goal" => settings.initial_daily_goal = value.parse()?,
        _ => return Err(format!("unknown key: {key}").into()),
    }
    Ok(())
}

pub fn run(user: &str, action: SettingsAction) -> Result<(), Box<dyn std::error::Error>> {
    let engine = super::open_engine()?;

    match action {
        SettingsAction::Get { key } => {
            let settings = engine.store().settings(user)?;
            match get_key(&settings, &key) {
                Some(value) => println!("{value}"),
                None => {
                    eprintln!("unknown key: {key}");
                    std::process::exit(1);
                }
            }
        }
        SettingsAction::Set { key, value } => {
            let mut settings = engine.store().settings(user)?;
            set_key(&mut settings, &key, &value)?;
            engine.store().put_settings(user, &settings)?;
            println!("ok");
        }
        SettingsAction::List => {
            let settings = engine.store().settings(user)?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        SettingsAction::ResetAccount => {
            engine.reset_account(user, Utc::now())?;
            println!("account progression reset");
        }
    }
    Ok(())
}
