use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::randvars::SizeDistribution;
use crate::simulator::SimParams;
use crate::sweep::SweepConfig;
use crate::utils::app_config::AppConfig;
use crate::utils::prelude::*;

#[derive(Debug, Deserialize)]
pub(crate) struct OutputDir(PathBuf);

impl OutputDir {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

/// Typed access to the sections the simulator cares about
pub(crate) trait AppConfigExt {
    fn output_dir(&self) -> Result<OutputDir>;
    fn size_distribution(&self) -> Result<SizeDistribution>;
    fn sim_params(&self) -> Result<SimParams>;
    fn sweep(&self) -> Result<SweepConfig>;
}

impl AppConfigExt for AppConfig {
    fn output_dir(&self) -> Result<OutputDir> {
        self.get("output_dir")
    }

    fn size_distribution(&self) -> Result<SizeDistribution> {
        let path: PathBuf = self.get("size_dist")?;
        SizeDistribution::from_file(path)
    }

    fn sim_params(&self) -> Result<SimParams> {
        self.fetch()
    }

    fn sweep(&self) -> Result<SweepConfig> {
        self.get("sweep")
    }
}
