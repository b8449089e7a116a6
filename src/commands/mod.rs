/*!
Command handlers for the CLI

- `history` -- render the scrollback a new conversation would be seeded with
- `config`  -- print the effective configuration
*/

use crate::config::Config;
use crate::error::Result;

pub mod history;

/// Print the effective configuration as YAML
pub fn show_config(config: &Config) -> Result<()> {
    let yaml = serde_yaml::to_string(config)?;
    print!("{}", yaml);
    Ok(())
}
