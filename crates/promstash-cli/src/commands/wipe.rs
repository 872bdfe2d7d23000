use crate::output;
use crate::store::Session;
use anyhow::{bail, Result};
use clap::Parser;

/// Delete every key under the configured namespace prefix
#[derive(Parser, Debug)]
pub struct WipeCmd {
    /// Confirm deletion
    #[arg(long)]
    pub yes: bool,
}

impl WipeCmd {
    /// Wipe the namespace, refusing without `--yes`
    pub async fn execute(&self, session: &Session) -> Result<()> {
        let prefix = session.engine.keys().prefix();
        if !self.yes {
            output::warning(&format!(
                "this deletes every key starting with '{}'",
                prefix
            ));
            bail!("refusing to wipe without --yes");
        }

        let deleted = session.engine.wipe().await?;
        output::success(&format!("Wiped namespace '{}'", prefix));
        output::detail("Keys deleted", &deleted.to_string());
        Ok(())
    }
}
