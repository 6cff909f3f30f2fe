// Copyright 2024 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Rewrite the debug-ID and hash locales of the configured
//! localization targets.

use anyhow::{bail, Context as _};
use clap::Parser;
use locsync::config::DEFAULT_SCRIPT;
use locsync::tasks::process_locales;
use locsync::Config;
use log::info;
use std::path::PathBuf;

#[derive(Clone, Debug, Parser)]
#[command(version, about)]
struct Args {
    /// The configuration file shared by the localization scripts.
    #[arg(long, default_value = "locsync.toml")]
    config: PathBuf,
    /// The section of the configuration file to read.
    #[arg(long, default_value = DEFAULT_SCRIPT)]
    script: String,
    /// Task list whose settings for this script override the defaults.
    task_list: Option<String>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().filter_or("RUST_LOG", "info"));
    let args = Args::parse();

    info!("--- Process debug id/test/source, and hash locales script start ---");
    let config = Config::load(&args.config, &args.script, args.task_list.as_deref())
        .with_context(|| format!("Could not read configuration from {:?}", args.config))?;
    let report = process_locales(&config).context("Could not process locales")?;
    info!("--- Process debug id/test/source, and hash locales script end ---");

    if !report.is_success() {
        let failed = report
            .failures
            .iter()
            .map(|failure| format!("{} ({:?})", failure.target, failure.locale))
            .collect::<Vec<_>>();
        bail!("{} target(s) failed: {}", failed.len(), failed.join(", "));
    }
    Ok(())
}
