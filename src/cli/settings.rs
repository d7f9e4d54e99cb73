//! The `settings` command.
use crate::settings::{Settings, get_settings_file_path};
use anyhow::Result;
use clap::Subcommand;

/// Ways to inspect the settings file
#[derive(Subcommand)]
pub enum SettingsSubcommands {
    /// Print where settings.toml is looked for
    Path,
    /// Print a settings.toml with every setting at its default
    DumpDefault,
}

impl SettingsSubcommands {
    /// Print what the subcommand asks for
    pub fn execute(self) -> Result<()> {
        println!("{}", self.output()?.trim_end());

        Ok(())
    }

    fn output(&self) -> Result<String> {
        Ok(match self {
            Self::Path => get_settings_file_path().display().to_string(),
            Self::DumpDefault => Settings::default_file_contents()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output() {
        let path = SettingsSubcommands::Path.output().unwrap();
        assert!(path.ends_with("settings.toml"));

        let contents = SettingsSubcommands::DumpDefault.output().unwrap();
        assert_eq!(contents, Settings::default_file_contents().unwrap());
    }
}
