use std::path::Path;

use anyhow::{Context, Result};
use wafcheck_config::{load_config, HarnessConfig, CONFIG_FILE_NAME};
use wafcheck_domain::{Region, UniqueId};
use wafcheck_driver::{random_unique_id, AwsZoneLookup, ZoneLookup};
use wafcheck_harness::Harness;

use crate::output::{render_report, render_request};

/// Resolve the config: explicit path, else `./wafcheck.yml` if it exists,
/// else defaults. `--region` wins over both.
pub fn load(path: Option<&Path>, region: Option<String>) -> Result<HarnessConfig> {
    let default_path = Path::new(CONFIG_FILE_NAME);
    let path = path.or_else(|| default_path.exists().then_some(default_path));

    let mut config = load_config(path).with_context(|| match path {
        Some(p) => format!("Failed to load {}", p.display()),
        None => "Failed to load default configuration".to_string(),
    })?;

    if let Some(region) = region {
        config.region = Region::new(region).context("Invalid --region")?;
    }
    Ok(config)
}

pub async fn run(config: HarnessConfig, suffix: Option<String>, keep: bool) -> Result<()> {
    let suffix = resolve_suffix(suffix)?;
    let harness = Harness::from_config(config)
        .await
        .context("Failed to initialise the harness")?;

    let report = harness
        .run_cycle_with(suffix.clone(), keep)
        .await
        .with_context(|| format!("Provisioning cycle for suffix {suffix} failed"))?;

    print!("{}", render_report(&report));
    if keep {
        println!("Resources kept. Remove them with: wafcheck destroy --suffix {suffix}");
    }
    Ok(())
}

pub async fn zones(config: HarnessConfig) -> Result<()> {
    let lookup = AwsZoneLookup::from_env()
        .await
        .context("Failed to resolve AWS credentials")?;
    let zones = lookup
        .availability_zones(&config.region)
        .await
        .with_context(|| format!("Failed to list availability zones in {}", config.region))?;

    for zone in zones {
        println!("{zone}");
    }
    Ok(())
}

pub async fn request(config: HarnessConfig, suffix: Option<String>, json: bool) -> Result<()> {
    let suffix = resolve_suffix(suffix)?;
    let harness = Harness::from_config(config)
        .await
        .context("Failed to initialise the harness")?;
    let request = harness.build_request(suffix).await?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&request).context("Failed to serialize request")?
        );
    } else {
        print!("{}", render_request(&request));
    }
    Ok(())
}

pub async fn destroy(config: HarnessConfig, suffix: String) -> Result<()> {
    let suffix = UniqueId::parse(&suffix).context("Invalid --suffix")?;
    let harness = Harness::from_config(config)
        .await
        .context("Failed to initialise the harness")?;

    let request = harness
        .destroy_kept(suffix)
        .await
        .context("Destroy failed")?;
    println!("Destroyed {}", request.acl_name);
    Ok(())
}

fn resolve_suffix(suffix: Option<String>) -> Result<UniqueId> {
    match suffix {
        Some(s) => UniqueId::parse(&s).context("Invalid --suffix"),
        None => Ok(random_unique_id()),
    }
}
