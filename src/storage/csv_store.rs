//! CSV-backed record store
//!
//! One row per record under a header row of `id` plus the field names.
//! Append mode adds rows at the end of the file and so leaves the file
//! unsorted across runs; overwrite mode rewrites the whole file from an
//! ordered sequence, via a sibling temporary file renamed into place.

use crate::record::Record;
use crate::storage::traits::{PersistMode, RecordStore, StorageError, StorageResult};
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Record store backed by a single CSV file
#[derive(Debug, Clone)]
pub struct CsvStore {
    path: PathBuf,
    dry_run: bool,
}

impl CsvStore {
    /// Creates a store for the given file; nothing is touched until used
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            dry_run: false,
        }
    }

    /// Logs intended writes instead of performing them
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn display_path(&self) -> String {
        self.path.display().to_string()
    }

    fn temp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }

    /// True when the file is missing or has no bytes, i.e. needs a header
    fn needs_header(&self) -> StorageResult<bool> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.len() == 0),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(true),
            Err(e) => Err(StorageError::Read {
                path: self.display_path(),
                source: e,
            }),
        }
    }

    fn write_records(&self, file: File, records: &[Record], header: bool) -> StorageResult<()> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(header)
            .from_writer(file);

        for record in records {
            writer.serialize(record).map_err(|e| StorageError::Csv {
                path: self.display_path(),
                source: e,
            })?;
        }

        writer.flush().map_err(|e| StorageError::Write {
            path: self.display_path(),
            source: e,
        })
    }

    fn append(&self, records: &[Record]) -> StorageResult<()> {
        let header = self.needs_header()?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StorageError::Write {
                path: self.display_path(),
                source: e,
            })?;

        self.write_records(file, records, header)
    }

    fn overwrite(&self, records: &[Record]) -> StorageResult<()> {
        let tmp = self.temp_path();
        let file = File::create(&tmp).map_err(|e| StorageError::Write {
            path: tmp.display().to_string(),
            source: e,
        })?;

        self.write_records(file, records, true)?;

        fs::rename(&tmp, &self.path).map_err(|e| StorageError::Write {
            path: self.display_path(),
            source: e,
        })
    }
}

impl RecordStore for CsvStore {
    fn load(&self) -> StorageResult<Vec<Record>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No existing store at {}", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(StorageError::Read {
                    path: self.display_path(),
                    source: e,
                })
            }
        };

        let mut reader = csv::Reader::from_reader(file);

        // `deserialize` swallows a failed header read and yields no rows
        reader.headers().map_err(|e| StorageError::Csv {
            path: self.display_path(),
            source: e,
        })?;

        let mut records = Vec::new();
        for row in reader.deserialize::<Record>() {
            let record = row.map_err(|e| StorageError::Csv {
                path: self.display_path(),
                source: e,
            })?;
            records.push(record);
        }

        records.sort_by_key(|r| r.id);
        tracing::debug!(
            "Loaded {} records from {}",
            records.len(),
            self.path.display()
        );
        Ok(records)
    }

    fn persist(&mut self, records: &[Record], mode: PersistMode) -> StorageResult<()> {
        if self.dry_run {
            tracing::info!(
                "[dry run] would {} {} records to {}",
                match mode {
                    PersistMode::Append => "append",
                    PersistMode::Overwrite => "write",
                },
                records.len(),
                self.path.display()
            );
            for record in records {
                tracing::debug!("[dry run] {:?}", record);
            }
            return Ok(());
        }

        match mode {
            PersistMode::Append => self.append(records),
            PersistMode::Overwrite => self.overwrite(records),
        }
    }
}
