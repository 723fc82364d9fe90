use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 12] = [
        "RUST_LOG",
        "MCS_HOST",
        "MCS_PORT",
        "MCS_DATABASE_URL",
        "MCS_MINIMUM_ORDER_CENTS",
        "MCS_CHECKOUT_SUCCESS_URL",
        "MCS_CHECKOUT_CANCEL_URL",
        "MCS_SQUARE_LOCATION_ID",
        "MCS_SQUARE_NOTIFICATION_URL",
        "MCS_DISCORD_GUILD_ID",
        "MCS_DISCORD_TICKET_CATEGORY_ID",
        "MCS_EMAIL_FROM",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
