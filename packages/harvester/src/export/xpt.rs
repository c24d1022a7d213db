//! SAS Transport (XPT) version 5 export.
//!
//! Every column becomes a character variable. XPT v5 limits names to 8
//! characters, labels to 40 and character values to 200 bytes, so names are
//! shortened (the full name is kept as the label) and values are folded to
//! ASCII and truncated.
//!
//! File layout, all in 80-byte records:
//! - library header, real header, second header
//! - member header, descriptor header, member data, member second
//! - NAMESTR header and one 140-byte NAMESTR per variable
//! - OBS header and fixed-width observations

use std::collections::BTreeSet;
use std::io::{self, Write};
use std::path::Path;

use chrono::{Local, NaiveDateTime};

use crate::error::Result;
use crate::transliterate::to_ascii;
use crate::types::{DatasetKind, UnifiedTable};

use super::write_atomically;

pub const RECORD_LEN: usize = 80;
pub const NAMESTR_LEN: usize = 140;

/// Longest character value XPT v5 can hold.
pub const MAX_VALUE_LEN: usize = 200;

const NAME_LEN: usize = 8;
const LABEL_LEN: usize = 40;

/// Variable type code for character data.
const NTYPE_CHAR: i16 = 2;

const LIBRARY_HEADER_PREFIX: &str = "HEADER RECORD*******LIBRARY HEADER RECORD!!!!!!!";
const MEMBER_HEADER_PREFIX: &str = "HEADER RECORD*******MEMBER  HEADER RECORD!!!!!!!";
const DSCRPTR_HEADER_PREFIX: &str = "HEADER RECORD*******DSCRPTR HEADER RECORD!!!!!!!";
const NAMESTR_HEADER_PREFIX: &str = "HEADER RECORD*******NAMESTR HEADER RECORD!!!!!!!";
const OBS_HEADER_PREFIX: &str = "HEADER RECORD*******OBS     HEADER RECORD!!!!!!!";

const SAS_VERSION: &str = "9.4";
const SAS_OS: &str = "X64_7PRO";

/// A character variable as stored in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Variable {
    name: String,
    label: String,
    length: usize,
}

/// Write `table` as an XPT file stamped with the current local time.
pub fn write_xpt(table: &UnifiedTable, path: &Path) -> Result<()> {
    let stamp = Local::now().naive_local();
    write_atomically(path, |out| write_table(out, table, stamp))
}

/// Serialize `table` into `out`.
pub fn write_table<W: Write>(
    out: &mut W,
    table: &UnifiedTable,
    stamp: NaiveDateTime,
) -> io::Result<()> {
    let stamp = format_datetime(stamp);
    let folded: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| row.iter().map(|v| fold_value(v)).collect())
        .collect();
    let variables = build_variables(&table.columns, &folded);

    out.write_all(&fixed_header(LIBRARY_HEADER_PREFIX))?;
    out.write_all(&real_header(&stamp))?;
    out.write_all(&second_header(&stamp))?;

    out.write_all(&member_header())?;
    out.write_all(&fixed_header(DSCRPTR_HEADER_PREFIX))?;
    out.write_all(&member_data(&dataset_name(table.kind, table.year), &stamp))?;
    out.write_all(&member_second(&stamp, &dataset_label(table)))?;

    out.write_all(&namestr_header(variables.len()))?;
    let mut records = RecordWriter::new(out);
    let mut position = 0usize;
    for (idx, variable) in variables.iter().enumerate() {
        records.write_bytes(&namestr(variable, idx + 1, position))?;
        position += variable.length;
    }
    records.finish()?;

    records.inner().write_all(&fixed_header(OBS_HEADER_PREFIX))?;
    let obs_len = position;
    for row in &folded {
        let mut obs = vec![b' '; obs_len];
        let mut offset = 0;
        for (idx, variable) in variables.iter().enumerate() {
            let value = row.get(idx).map(String::as_bytes).unwrap_or_default();
            obs[offset..offset + value.len()].copy_from_slice(value);
            offset += variable.length;
        }
        records.write_bytes(&obs)?;
    }
    records.finish()
}

/// Member name, e.g. `LEG2018` or `SEAT2020`.
#[must_use]
pub fn dataset_name(kind: DatasetKind, year: u16) -> String {
    let prefix = match kind {
        DatasetKind::Legend => "LEG",
        DatasetKind::Seats => "SEAT",
    };
    format!("{prefix}{year}")
}

fn dataset_label(table: &UnifiedTable) -> String {
    format!("TSE {} {}", table.kind, table.year)
}

/// ASCII-fold a value and cut it to the XPT limit.
fn fold_value(value: &str) -> String {
    let mut folded = to_ascii(value);
    folded.truncate(MAX_VALUE_LEN);
    folded
}

fn build_variables(columns: &[String], rows: &[Vec<String>]) -> Vec<Variable> {
    let names = short_names(columns);
    columns
        .iter()
        .zip(names)
        .enumerate()
        .map(|(idx, (column, name))| {
            let widest = rows
                .iter()
                .filter_map(|row| row.get(idx))
                .map(String::len)
                .max()
                .unwrap_or(0);
            Variable {
                name,
                label: to_ascii(column).chars().take(LABEL_LEN).collect(),
                length: widest.clamp(1, MAX_VALUE_LEN),
            }
        })
        .collect()
}

/// Shorten column names to unique 8-character SAS names.
///
/// Collisions keep the longest possible prefix and end in a counter:
/// `DESCRICAO_ELEICAO` and `DESCRICAO_CARGO` become `DESCRICA` and
/// `DESCRIC1`.
#[must_use]
pub fn short_names(columns: &[String]) -> Vec<String> {
    let mut taken = BTreeSet::new();
    let mut names = Vec::with_capacity(columns.len());

    for column in columns {
        let mut base: String = to_ascii(column)
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        if base.is_empty() || base.starts_with(|c: char| c.is_ascii_digit()) {
            base.insert(0, '_');
        }

        let mut candidate: String = base.chars().take(NAME_LEN).collect();
        let mut counter = 1usize;
        while taken.contains(&candidate) {
            let suffix = counter.to_string();
            let keep = NAME_LEN.saturating_sub(suffix.len());
            candidate = base.chars().take(keep).collect::<String>() + &suffix;
            counter += 1;
        }

        taken.insert(candidate.clone());
        names.push(candidate);
    }
    names
}

/// `ddMMMyy:hh:mm:ss`, e.g. `15OCT26:09:30:00`.
fn format_datetime(stamp: NaiveDateTime) -> String {
    stamp.format("%d%b%y:%H:%M:%S").to_string().to_uppercase()
}

fn fixed_header(prefix: &str) -> [u8; RECORD_LEN] {
    let mut record = [b' '; RECORD_LEN];
    write_str(&mut record, 0, prefix, 48);
    record[48..78].fill(b'0');
    record
}

fn real_header(stamp: &str) -> [u8; RECORD_LEN] {
    let mut record = [b' '; RECORD_LEN];
    write_str(&mut record, 0, "SAS", 8);
    write_str(&mut record, 8, "SAS", 8);
    write_str(&mut record, 16, "SASLIB", 8);
    write_str(&mut record, 24, SAS_VERSION, 8);
    write_str(&mut record, 32, SAS_OS, 8);
    write_str(&mut record, 64, stamp, 16);
    record
}

fn second_header(stamp: &str) -> [u8; RECORD_LEN] {
    let mut record = [b' '; RECORD_LEN];
    write_str(&mut record, 0, stamp, 16);
    record
}

fn member_header() -> [u8; RECORD_LEN] {
    let mut record = fixed_header(MEMBER_HEADER_PREFIX);
    write_str(&mut record, 64, "0160", 4);
    write_str(&mut record, 74, &format!("{NAMESTR_LEN:04}"), 4);
    record
}

fn member_data(name: &str, stamp: &str) -> [u8; RECORD_LEN] {
    let mut record = [b' '; RECORD_LEN];
    write_str(&mut record, 0, "SAS", 8);
    write_str(&mut record, 8, name, 8);
    write_str(&mut record, 16, "SASDATA", 8);
    write_str(&mut record, 24, SAS_VERSION, 8);
    write_str(&mut record, 32, SAS_OS, 8);
    write_str(&mut record, 64, stamp, 16);
    record
}

fn member_second(stamp: &str, label: &str) -> [u8; RECORD_LEN] {
    let mut record = [b' '; RECORD_LEN];
    write_str(&mut record, 0, stamp, 16);
    write_str(&mut record, 32, label, LABEL_LEN);
    record
}

fn namestr_header(count: usize) -> [u8; RECORD_LEN] {
    let mut record = fixed_header(NAMESTR_HEADER_PREFIX);
    write_str(&mut record, 54, &format!("{count:04}"), 4);
    record
}

fn namestr(variable: &Variable, varnum: usize, position: usize) -> [u8; NAMESTR_LEN] {
    let mut buf = [0u8; NAMESTR_LEN];
    buf[0..2].copy_from_slice(&NTYPE_CHAR.to_be_bytes());
    // nhfun stays zero
    buf[4..6].copy_from_slice(&to_i16(variable.length).to_be_bytes());
    buf[6..8].copy_from_slice(&to_i16(varnum).to_be_bytes());
    pad_str(&mut buf, 8, &variable.name, NAME_LEN);
    pad_str(&mut buf, 16, &variable.label, LABEL_LEN);
    // No format or informat; names are blank and lengths zero.
    pad_str(&mut buf, 56, "", 8);
    pad_str(&mut buf, 72, "", 8);
    let npos = i32::try_from(position).unwrap_or(i32::MAX);
    buf[84..88].copy_from_slice(&npos.to_be_bytes());
    buf
}

fn to_i16(value: usize) -> i16 {
    i16::try_from(value).unwrap_or(i16::MAX)
}

/// Copy `value` into a space-initialized buffer.
fn write_str(buf: &mut [u8], offset: usize, value: &str, len: usize) {
    let bytes = value.as_bytes();
    let n = bytes.len().min(len);
    buf[offset..offset + n].copy_from_slice(&bytes[..n]);
}

/// Copy `value` into a zero-initialized buffer, padding with spaces.
fn pad_str(buf: &mut [u8], offset: usize, value: &str, len: usize) {
    buf[offset..offset + len].fill(b' ');
    write_str(buf, offset, value, len);
}

/// Packs byte runs into 80-byte records, padding the last with spaces.
struct RecordWriter<'a, W: Write> {
    writer: &'a mut W,
    record: [u8; RECORD_LEN],
    pos: usize,
}

impl<'a, W: Write> RecordWriter<'a, W> {
    fn new(writer: &'a mut W) -> Self {
        Self {
            writer,
            record: [b' '; RECORD_LEN],
            pos: 0,
        }
    }

    fn write_bytes(&mut self, mut bytes: &[u8]) -> io::Result<()> {
        while !bytes.is_empty() {
            let take = (RECORD_LEN - self.pos).min(bytes.len());
            self.record[self.pos..self.pos + take].copy_from_slice(&bytes[..take]);
            self.pos += take;
            bytes = &bytes[take..];

            if self.pos == RECORD_LEN {
                self.writer.write_all(&self.record)?;
                self.record = [b' '; RECORD_LEN];
                self.pos = 0;
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        if self.pos > 0 {
            self.record[self.pos..].fill(b' ');
            self.writer.write_all(&self.record)?;
            self.record = [b' '; RECORD_LEN];
            self.pos = 0;
        }
        Ok(())
    }

    fn inner(&mut self) -> &mut W {
        &mut *self.writer
    }
}
