use std::path::Path;

use crate::error::{LadingError, Result};
use crate::settings::{default_settings_path, save_settings, Settings};

pub fn run(config: Option<&Path>, force: bool) -> Result<()> {
    let path = config
        .map(Path::to_path_buf)
        .unwrap_or_else(default_settings_path);
    if path.exists() && !force {
        return Err(LadingError::Settings(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    save_settings(&Settings::default(), &path)?;
    println!("Wrote default settings to {}", path.display());
    println!("Set \"transactions\" and \"lookup\" there, or pass --transactions/--lookup.");
    Ok(())
}
