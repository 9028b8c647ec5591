use dialoguer::{theme::ColorfulTheme, Confirm};

/// Yes/no question on the terminal, e.g. before overwriting an index.
pub fn ask_confirmation(prompt: &str, default_yes: bool) -> dialoguer::Result<bool> {
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(default_yes)
        .show_default(true)
        .interact()
}
