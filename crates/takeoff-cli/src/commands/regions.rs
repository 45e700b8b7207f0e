//! The `regions` CLI subcommand -- lists enabled compliance regions.

use anyhow::Context;

use takeoff_compliance::GlobalCompliance;

use crate::ExitCode;

// ---------------------------------------------------------------------------
// RegionsArgs
// ---------------------------------------------------------------------------

/// List enabled compliance regions and their standards.
#[derive(Debug, clap::Args)]
pub struct RegionsArgs {
    /// Emit the region list as JSON instead of plain text.
    #[arg(long)]
    pub json: bool,
}

// ---------------------------------------------------------------------------
// execute
// ---------------------------------------------------------------------------

/// Executes the `regions` subcommand.
pub fn execute(args: RegionsArgs) -> Result<ExitCode, anyhow::Error> {
    let config = takeoff_core::config::load_config(Some(std::path::Path::new(".")))
        .context("failed to load configuration")?;
    let compliance = GlobalCompliance::new(&config.compliance.regions);

    if args.json {
        let listing: Vec<serde_json::Value> = compliance
            .enabled_regions()
            .into_iter()
            .map(|region| {
                serde_json::json!({
                    "region": region.name(),
                    "standards": compliance.region_standards(region),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&listing)?);
    } else {
        for region in compliance.enabled_regions() {
            println!(
                "{}: {}",
                region.name(),
                compliance.region_standards(region).join(", ")
            );
        }
    }

    Ok(ExitCode::Pass)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execute_plain_succeeds() {
        let code = execute(RegionsArgs { json: false }).unwrap();
        assert_eq!(code, ExitCode::Pass);
    }

    #[test]
    fn execute_json_succeeds() {
        let code = execute(RegionsArgs { json: true }).unwrap();
        assert_eq!(code, ExitCode::Pass);
    }
}
