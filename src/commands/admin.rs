use super::CommandRunner;
use crate::admin;
use crate::cli;
use crate::storage::Storage;
use anyhow::{Context, Result};

impl CommandRunner for cli::AdminCmd {
    fn run<S: Storage>(&self, _storage: &S) -> Result<()> {
        match self {
            cli::AdminCmd::Models => {
                let json = serde_json::to_string_pretty(&admin::registry())
                    .context("serializing admin registry")?;
                println!("{}", json);
                Ok(())
            }
        }
    }
}
