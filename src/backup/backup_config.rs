use crate::backup::archive::source_item::SourceItem;
use crate::backup::builder::create_backup_at;
use crate::backup::compress::CompressorConfig;
use crate::backup::destination::ensure_destination;
use crate::backup::report::RunReport;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::fatal::FatalError;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::WithMsg;
use crate::backup::validate::{validate_destination, validate_sources};
use bon::Builder;
use chrono::{DateTime, Local, TimeZone};
use getset::Getters;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::result;
use tracing::{info, warn};
use validator::Validate;

/// One backup request: what to archive and where to put it
///
/// ```yaml
/// destination: /backups
/// sources:
///   - /etc/hosts
///   - /home/me/docs
/// compressor:
///   compressor_type: gzip
///   level: 9
/// ```
#[derive(Clone, Serialize, Deserialize, Debug, Validate, Builder, PartialEq, Eq, Getters)]
#[serde(deny_unknown_fields)]
#[getset(get = "pub")]
pub struct BackupConfig {
    #[validate(custom(function = validate_destination))]
    #[builder(into)]
    destination: PathBuf,
    #[validate(custom(function = validate_sources))]
    #[serde(default)]
    #[builder(default, into)]
    sources: Vec<SourceItem>,
    #[validate(nested)]
    #[serde(default)]
    #[builder(default)]
    compressor: CompressorConfig,
}

impl BackupConfig {
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        File::open(path.as_ref())
            .map_err(Error::from)
            .and_then(|f| serde_yml::from_reader::<_, BackupConfig>(f).map_err(Error::from))
            .with_msg(format!("Parse YAML config failed: {:?}", path.as_ref()))
    }

    /// Validates, prepares the destination and archives everything, timestamped now.
    pub fn run(&self) -> result::Result<RunReport, FatalError> {
        self.run_at(Local::now())
    }

    pub fn run_at<O: Display, T: TimeZone<Offset = O>>(
        &self,
        captured_at: DateTime<T>,
    ) -> result::Result<RunReport, FatalError> {
        self.validate()
            .map_err(Error::from)
            .map_err(FatalError::InvalidConfig)?;
        if self.sources.is_empty() {
            warn!("No sources configured, the archive will be empty");
        }

        ensure_destination(&self.destination)?;
        let report = create_backup_at(&self.sources, &self.destination, &self.compressor, captured_at)?;
        info!("{report}");
        Ok(report)
    }
}
