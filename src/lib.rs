//! # tgz-backup
//!
//! A single-shot backup tool that captures files and directories into one
//! timestamped, compressed tar archive.
//!
//! ## Features
//!
//! - **Timestamped Layout**: `<destination>/backup_<T>/backup_<T>.tar.gz`
//! - **Multiple Sources**: any mix of files and directories, archived under their base names
//! - **Compression**: Gzip by default, XZ (LZMA) optional
//! - **Partial Failure Tolerance**: missing or unreadable sources are reported, never fatal
//!
//! ## Quick Start
//!
//! ```no_run
//! use tgz_backup::backup::backup_config::BackupConfig;
//!
//! // Load configuration from YAML file
//! let config: BackupConfig = serde_yml::from_reader(std::fs::File::open("backup.yml")?)?;
//!
//! // Run one backup
//! let report = config.run()?;
//! println!("{}", report.archive_path().display());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod backup;
