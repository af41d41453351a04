//! Check command implementation.
//!
//! Validates the environment without compiling or binding a port.

use crate::cli::{CheckArgs, ServeArgs};
use crate::config::ServerConfig;
use crate::error::{Result, ResultExt};
use crate::ui;

/// Execute the check command.
///
/// # Validation Steps
///
/// 1. Resolve every variable for the backend
/// 2. Load the layout directory
/// 3. Report whether pre-built artifacts are present
///
/// # Errors
///
/// Returns errors for missing or invalid variables and unreadable layouts.
pub async fn execute(args: CheckArgs) -> Result<()> {
    ui::info(&format!("Checking {} configuration...", args.backend));

    let config = ServerConfig::load(args.backend, &ServeArgs::default())?;
    ui::success("Configuration is valid");
    ui::info(&format!("  mode:      {}", config.mode));
    ui::info(&format!("  address:   {}", config.address()));
    ui::info(&format!("  sources:   {}", config.component_dir.display()));
    ui::info(&format!("  build:     {}", config.build_command));
    ui::info(&format!("  render:    {}", config.render_command));

    let layouts = config.load_layouts().with_hint(format!(
        "Check {} and the permissions of the files in it",
        config.var("TEMPLATE_DIR")
    ))?;
    if layouts.is_empty() {
        ui::warning(&format!(
            "No layouts loaded; requests cannot use ?{}=<file>",
            args.backend.selector_param()
        ));
    } else {
        ui::success(&format!("{} layouts loaded", layouts.len()));
        for name in layouts.names() {
            ui::info(&format!("  {}", name));
        }
    }

    let artifacts = config.artifact_layout();
    if artifacts.exists() {
        ui::success(&format!(
            "Pre-built artifacts found in {}",
            artifacts.build_dir.display()
        ));
    } else if config.mode.is_development() {
        ui::info("Artifacts will be compiled on start");
    } else {
        ui::warning(&format!(
            "No pre-built artifacts in {}; the first start will run the build command",
            artifacts.build_dir.display()
        ));
    }

    Ok(())
}
