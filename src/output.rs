use std::io::{self, Write};

use serde::Serialize;

use crate::app::{DeleteReport, SubmissionReport};
use crate::index::IndexReport;

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_submission(result: &SubmissionReport) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_delete(result: &DeleteReport) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_index(result: &IndexReport) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_seed(result: &SeedSummary) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SeedSummary {
    pub data_types: usize,
    pub file_types: usize,
    pub visibilities: usize,
}
