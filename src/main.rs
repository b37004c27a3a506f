/*
 * This file is part of Drivetemp.
 *
 * Copyright (C) 2025 Drivetemp contributors
 *
 * Drivetemp is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Drivetemp is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Drivetemp. If not, see <https://www.gnu.org/licenses/>.
 */

use std::path::Path;

use anyhow::Context;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use drivetemp::config::load_config;
use drivetemp::logger;
use drivetemp::sgio::SgDevice;
use drivetemp::system::scan_block_devices;
use drivetemp::{AttachOutcome, DeviceHandle, Registry};

fn main() -> anyhow::Result<()> {
    let log_level = std::env::var("DRIVETEMP_LOG").unwrap_or_else(|_| "warn".to_string());
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_env_filter(&log_level)
        .init();

    // SG_IO on block devices needs CAP_SYS_RAWIO
    if unsafe { libc::geteuid() } != 0 {
        eprintln!("Error: drivetemp requires root privileges to issue ATA pass-through commands.");
        eprintln!("Please run with: sudo {}", std::env::args().next().unwrap_or_else(|| "drivetemp".to_string()));
        std::process::exit(1);
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let json_output = args.iter().any(|a| a == "--json");
    let logging_enabled = args.iter().any(|a| a == "--logging");
    let requested: Vec<&str> = args.iter().filter(|a| !a.starts_with("--")).map(String::as_str).collect();

    let config = load_config().context("loading configuration")?;

    if logging_enabled {
        match logger::init_logging(config.log_path.as_deref()) {
            Some(path) => debug!(path = %path.display(), "event logging enabled"),
            None => warn!("could not open an event log file, continuing without"),
        }
        logger::log_event("startup", json!({ "args": args }));
    }

    let wanted: Vec<&str> = if requested.is_empty() {
        config.devices.iter().map(String::as_str).collect()
    } else {
        requested
    };

    let mut registry = Registry::new();
    for dev in scan_block_devices(Path::new("/")).context("scanning /sys/block")? {
        if !wanted.is_empty() && !wanted.contains(&dev.name.as_str()) {
            continue;
        }
        let transport = match SgDevice::open(&dev.dev_path) {
            Ok(t) => t,
            Err(e) => {
                warn!(device = %dev.name, "{}", e);
                continue;
            }
        };
        match registry.attach(DeviceHandle::new(&dev.name), transport, &dev.identity, config.smart) {
            Ok(AttachOutcome::Registered) => info!(device = %dev.name, model = %dev.model, "attached"),
            Ok(AttachOutcome::Rejected(reason)) => debug!(device = %dev.name, "skipped: {}", reason),
            Ok(AttachOutcome::AlreadyAttached) => {}
            Err(e) => warn!(device = %dev.name, "probe failed: {}", e),
        }
    }

    let mut report = Map::new();
    for (handle, source) in registry.iter() {
        let readings = match source.read_all() {
            Ok(r) => r,
            Err(e) => {
                warn!(device = %handle, "read failed: {}", e);
                continue;
            }
        };
        let mut channels = Map::new();
        for r in &readings {
            channels.insert(r.metric.attribute_name().to_string(), json!(r.value));
        }
        logger::log_event("reading", json!({ "device": handle.as_str(), "channels": channels }));

        if json_output {
            report.insert(handle.to_string(), Value::Object(channels));
        } else {
            println!("{} ({:?})", handle, source.capabilities().mode());
            for r in &readings {
                println!("  {}: {}", r.metric, r.value);
            }
        }
    }

    if json_output {
        println!("{}", serde_json::to_string_pretty(&Value::Object(report))?);
    }

    if registry.is_empty() && !json_output {
        eprintln!("No drives with a usable temperature sensor found.");
    }

    logger::shutdown_logging();
    Ok(())
}
