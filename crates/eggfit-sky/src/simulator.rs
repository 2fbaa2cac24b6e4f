use std::path::Path;
use std::process::Command;

use log::{debug, info};

use crate::SkyError;

/// Renders a catalog/configuration pair into an image.
pub trait Simulator {
    fn render(&self, catalog: &Path, config: &Path) -> Result<(), SkyError>;
}

/// SkyMaker followed by the EGG post-processor, run as external programs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkyMaker {
    pub skymaker: String,
    pub postprocessor: String,
}

impl Default for SkyMaker {
    fn default() -> Self {
        Self {
            skymaker: "sky".to_string(),
            postprocessor: "egg-postskymaker".to_string(),
        }
    }
}

fn run(program: &str, command: &mut Command) -> Result<(), SkyError> {
    debug!("running {command:?}");
    let status = command.status().map_err(|e| SkyError::Simulator {
        program: program.to_string(),
        reason: e.to_string(),
    })?;
    if !status.success() {
        return Err(SkyError::Simulator {
            program: program.to_string(),
            reason: status.to_string(),
        });
    }
    Ok(())
}

impl Simulator for SkyMaker {
    fn render(&self, catalog: &Path, config: &Path) -> Result<(), SkyError> {
        run(
            &self.skymaker,
            Command::new(&self.skymaker).arg(catalog).arg("-c").arg(config),
        )?;
        let mut conf_arg = std::ffi::OsString::from("conf=");
        conf_arg.push(config);
        run(
            &self.postprocessor,
            Command::new(&self.postprocessor).arg(conf_arg),
        )?;
        info!("rendered {}", catalog.display());
        Ok(())
    }
}
