//! Column naming per dataset kind and year.
//!
//! The source files carry no usable header, so column names come from a
//! closed table keyed by dataset kind and the first year a layout applies to.
//! Supporting a new layout means adding a row to [`SCHEMAS`].

use crate::error::{HarvesterError, Result};
use crate::types::{DatasetKind, UnifiedTable};

/// Ordered column names for one file layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSchema {
    pub kind: DatasetKind,

    /// First election year using this layout.
    pub since: u16,

    pub columns: &'static [&'static str],
}

const LEGEND_UNTIL_2016: &[&str] = &[
    "DATA_GERACAO",
    "HORA_GERACAO",
    "ANO_ELEICAO",
    "NUM_TURNO",
    "DESCRICAO_ELEICAO",
    "SIGLA_UF",
    "SIGLA_UE",
    "NOME_MUNICIPIO",
    "CODIGO_CARGO",
    "DESCRICAO_CARGO",
    "TIPO_LEGENDA",
    "NUM_PARTIDO",
    "SIGLA_PARTIDO",
    "NOME_PARTIDO",
    "SIGLA_COLIGACAO",
    "NOME_COLIGACAO",
    "COMPOSICAO_COLIGACAO",
    "SEQUENCIAL_COLIGACAO",
];

const LEGEND_FROM_2018: &[&str] = &[
    "DATA_GERACAO",
    "HORA_GERACAO",
    "ANO_ELEICAO",
    "COD_TIPO_ELEICAO",
    "NOME_TIPO_ELEICAO",
    "NUM_TURNO",
    "COD_ELEICAO",
    "DESCRICAO_ELEICAO",
    "DATA_ELEICAO",
    "SIGLA_UF",
    "SIGLA_UE",
    "NOME_UE",
    "CODIGO_CARGO",
    "DESCRICAO_CARGO",
    "TIPO_LEGENDA",
    "NUM_PARTIDO",
    "SIGLA_PARTIDO",
    "NOME_PARTIDO",
    "SEQUENCIAL_COLIGACAO",
    "NOME_COLIGACAO",
    "COMPOSICAO_COLIGACAO",
];

const SEATS_UNTIL_2014: &[&str] = &[
    "DATA_GERACAO",
    "HORA_GERACAO",
    "ANO_ELEICAO",
    "DESCRICAO_ELEICAO",
    "SIGLA_UF",
    "SIGLA_UE",
    "NOME_UE",
    "CODIGO_CARGO",
    "DESCRICAO_CARGO",
    "QTDE_VAGAS",
];

const SEATS_FROM_2016: &[&str] = &[
    "DATA_GERACAO",
    "HORA_GERACAO",
    "ANO_ELEICAO",
    "COD_TIPO_ELEICAO",
    "NOME_TIPO_ELEICAO",
    "COD_ELEICAO",
    "DESCRICAO_ELEICAO",
    "DATA_ELEICAO",
    "DATA_POSSE",
    "SIGLA_UF",
    "SIGLA_UE",
    "NOME_UE",
    "CODIGO_CARGO",
    "DESCRICAO_CARGO",
    "QTDE_VAGAS",
];

/// Every known layout. Each kind has a row with `since: 0`.
pub const SCHEMAS: &[ColumnSchema] = &[
    ColumnSchema {
        kind: DatasetKind::Legend,
        since: 0,
        columns: LEGEND_UNTIL_2016,
    },
    ColumnSchema {
        kind: DatasetKind::Legend,
        since: 2018,
        columns: LEGEND_FROM_2018,
    },
    ColumnSchema {
        kind: DatasetKind::Seats,
        since: 0,
        columns: SEATS_UNTIL_2014,
    },
    ColumnSchema {
        kind: DatasetKind::Seats,
        since: 2016,
        columns: SEATS_FROM_2016,
    },
];

/// First fields of header records that some newer files start with.
const HEADER_MARKERS: &[&str] = &["DT_GERACAO", "DATA_GERACAO"];

impl ColumnSchema {
    /// The layout in effect for `kind` in `year`.
    ///
    /// # Examples
    /// ```
    /// use urna_harvester::schema::ColumnSchema;
    /// use urna_harvester::types::DatasetKind;
    ///
    /// assert_eq!(ColumnSchema::select(DatasetKind::Legend, 2002).len(), 18);
    /// assert_eq!(ColumnSchema::select(DatasetKind::Legend, 2018).len(), 21);
    /// ```
    #[must_use]
    pub fn select(kind: DatasetKind, year: u16) -> &'static ColumnSchema {
        SCHEMAS
            .iter()
            .filter(|s| s.kind == kind && s.since <= year)
            .max_by_key(|s| s.since)
            .unwrap_or(&SCHEMAS[0])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Position of a column in this layout.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| *c == name)
    }
}

/// Check every row against the layout for the table's year and name the
/// columns.
///
/// # Errors
/// `SchemaMismatch` for the first row whose field count differs. The remote
/// format has changed when this happens; no row is dropped or padded.
pub fn normalize(mut table: UnifiedTable) -> Result<UnifiedTable> {
    let schema = ColumnSchema::select(table.kind, table.year);

    if let Some((row, found)) = table
        .rows
        .iter()
        .enumerate()
        .find(|(_, r)| r.len() != schema.len())
        .map(|(i, r)| (i, r.len()))
    {
        return Err(HarvesterError::SchemaMismatch {
            kind: table.kind,
            year: table.year,
            expected: schema.len(),
            found,
            row,
            file: table.source_of_row(row).map(|s| s.name.clone()),
        });
    }

    table.columns = schema.columns.iter().map(|c| (*c).to_string()).collect();
    tracing::debug!(
        kind = %table.kind,
        year = table.year,
        columns = schema.len(),
        "Applied column schema"
    );
    Ok(table)
}

/// Whether a parsed record is a header line rather than data.
#[must_use]
pub fn is_header_record<S: AsRef<str>>(fields: &[S]) -> bool {
    fields
        .first()
        .is_some_and(|f| HEADER_MARKERS.contains(&f.as_ref().trim()))
}
