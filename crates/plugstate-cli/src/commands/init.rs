use std::path::Path;

use plugstate_core::Configuration;

pub fn init(plugin_id: &str, output: &Path, force: bool) -> anyhow::Result<()> {
    if output.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", output.display());
    }

    let config = Configuration::scaffold(plugin_id);
    config.validate()?;
    std::fs::write(output, config.to_toml_string()?)?;
    println!("✓ Generated {}", output.display());

    Ok(())
}
