use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Serialize;

use pingsift_core::DecodedRecord;

/// Table format of an output partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// Comma-separated values with a header row
    Csv,
    /// One JSON object per line
    Jsonl,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Jsonl => "jsonl",
        }
    }
}

/// Output file for the records of one capture source.
pub fn partition_path(out_dir: &Path, source_name: &str, format: ExportFormat) -> PathBuf {
    out_dir.join(format!(
        "{source_name}_parsed_packets.{}",
        format.extension()
    ))
}

#[derive(Serialize)]
struct CsvRow<'a> {
    #[serde(rename = "Source_IP")]
    source_ip: String,
    #[serde(rename = "Destination_IP")]
    destination_ip: String,
    #[serde(rename = "Arrival_Time")]
    arrival_time: f64,
    #[serde(rename = "Class")]
    class: &'static str,
    #[serde(rename = "Magic_Number")]
    magic_number: Option<u32>,
    #[serde(rename = "Send_TTL")]
    send_ttl: Option<u8>,
    #[serde(rename = "Round")]
    round: Option<u8>,
    #[serde(rename = "Checksum_Tweak")]
    checksum_tweak: Option<u16>,
    #[serde(rename = "Send_Timestamp")]
    send_timestamp: Option<&'a str>,
    #[serde(rename = "Fallback_Time")]
    fallback_time: Option<f64>,
    #[serde(rename = "Raw_Packet_Data")]
    raw_packet_data: &'a str,
}

impl<'a> From<&'a DecodedRecord> for CsvRow<'a> {
    fn from(record: &'a DecodedRecord) -> Self {
        Self {
            source_ip: record.source_address.to_string(),
            destination_ip: record.destination_address.to_string(),
            arrival_time: record.arrival_time,
            class: record.class.as_str(),
            magic_number: record.magic_number,
            send_ttl: record.probe_send_ttl,
            round: record.round_number,
            checksum_tweak: record.checksum_tweak,
            send_timestamp: record.send_time.as_deref(),
            fallback_time: record.fallback_time,
            raw_packet_data: &record.raw_payload_hex,
        }
    }
}

enum Sink {
    Csv(csv::Writer<File>),
    Jsonl(BufWriter<File>),
}

/// Append-only writer for one output partition.
pub struct RecordWriter {
    sink: Sink,
    path: PathBuf,
    rows: u64,
}

impl RecordWriter {
    pub fn create(path: &Path, format: ExportFormat) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        let sink = match format {
            ExportFormat::Csv => Sink::Csv(csv::Writer::from_writer(file)),
            ExportFormat::Jsonl => Sink::Jsonl(BufWriter::new(file)),
        };
        Ok(Self {
            sink,
            path: path.to_path_buf(),
            rows: 0,
        })
    }

    pub fn write(&mut self, record: &DecodedRecord) -> Result<()> {
        match &mut self.sink {
            Sink::Csv(writer) => writer
                .serialize(CsvRow::from(record))
                .with_context(|| format!("Failed to write CSV row: {}", self.path.display()))?,
            Sink::Jsonl(writer) => {
                serde_json::to_writer(&mut *writer, record)
                    .context("JSON serialization failed")?;
                writer
                    .write_all(b"\n")
                    .with_context(|| format!("Failed to write: {}", self.path.display()))?;
            }
        }
        self.rows += 1;
        Ok(())
    }

    /// Flush the partition and return the number of rows written.
    pub fn finish(self) -> Result<u64> {
        match self.sink {
            Sink::Csv(mut writer) => writer.flush(),
            Sink::Jsonl(mut writer) => writer.flush(),
        }
        .with_context(|| format!("Failed to flush: {}", self.path.display()))?;
        Ok(self.rows)
    }
}
