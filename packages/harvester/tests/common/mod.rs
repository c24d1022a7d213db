//! Fixture archives and a mock TSE server shared by the integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::Path;

use urna_harvester::{Dataset, Harvester, HarvesterConfig, Result};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zip::write::SimpleFileOptions;

pub const LEGEND_2002_PATH: &str = "/consulta_legendas/consulta_legendas_2002.zip";
pub const LEGEND_2018_PATH: &str = "/consulta_coligacao/consulta_coligacao_2018.zip";
pub const SEATS_2020_PATH: &str = "/consulta_vagas/consulta_vagas_2020.zip";

/// A legend row in the 18-field layout used up to 2016.
pub fn legend_2002_row(uf: &str, ue: &str, municipio: &str, cargo: &str) -> Vec<String> {
    [
        "10/09/2002",
        "12:00:00",
        "2002",
        "1",
        "ELEIÇÕES 2002",
        uf,
        ue,
        municipio,
        "1",
        cargo,
        "COLIGAÇÃO",
        "13",
        "PT",
        "PARTIDO DOS TRABALHADORES",
        "LULA PRESIDENTE",
        "LULA PRESIDENTE",
        "PT / PL / PC do B / PMN / PCB",
        "10001",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// A legend row in the 21-field layout used from 2018.
pub fn legend_2018_row(uf: &str, ue: &str, nome_ue: &str, partido: &str) -> Vec<String> {
    [
        "20/09/2018",
        "10:31:02",
        "2018",
        "2",
        "ELEIÇÃO ORDINÁRIA",
        "1",
        "297",
        "Eleição Geral Federal 2018",
        "07/10/2018",
        uf,
        ue,
        nome_ue,
        "6",
        "DEPUTADO FEDERAL",
        "COLIGAÇÃO",
        "45",
        partido,
        "PARTIDO DA SOCIAL DEMOCRACIA BRASILEIRA",
        "250000600001",
        "SÃO PAULO PARA FRENTE",
        "PSDB / DEM / PSD",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// A seats row in the 15-field layout used from 2016.
pub fn seats_2020_row(uf: &str, ue: &str, nome_ue: &str, cargo: &str, vagas: &str) -> Vec<String> {
    [
        "05/11/2020",
        "08:00:00",
        "2020",
        "2",
        "ELEIÇÃO ORDINÁRIA",
        "426",
        "Eleições Municipais 2020",
        "15/11/2020",
        "01/01/2021",
        uf,
        ue,
        nome_ue,
        "13",
        cargo,
        vagas,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Render rows the way the TSE does: quoted, `;`-separated, CRLF.
pub fn to_text(rows: &[Vec<String>]) -> String {
    rows.iter()
        .map(|row| {
            let fields: Vec<String> = row.iter().map(|f| format!("\"{f}\"")).collect();
            format!("{}\r\n", fields.join(";"))
        })
        .collect()
}

/// Encode text as Latin-1, the encoding of the published files.
pub fn latin1(text: &str) -> Vec<u8> {
    let (bytes, _, had_errors) = encoding_rs::WINDOWS_1252.encode(text);
    assert!(!had_errors, "fixture text is not representable in Latin-1");
    bytes.into_owned()
}

/// Build a ZIP archive in memory.
pub fn zip_bytes(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut buffer = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(Cursor::new(&mut buffer));
        for (name, content) in entries {
            zip.start_file(*name, SimpleFileOptions::default())
                .expect("start zip entry");
            zip.write_all(content).expect("write zip entry");
        }
        zip.finish().expect("finish zip");
    }
    buffer
}

/// Serve `body` at `url_path` on the mock server.
pub async fn serve_archive(server: &MockServer, url_path: &str, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(url_path))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
}

/// Configuration pointing at the mock server, with placeholder skipping off
/// so small fixture files are read.
pub fn test_config(server: &MockServer, cache: &Path, output: &Path) -> HarvesterConfig {
    HarvesterConfig::builder()
        .base_url(server.uri())
        .cache_dir(cache)
        .output_dir(output)
        .timeout_secs(10)
        .min_region_file_bytes(0)
        .build()
}

/// Run a request on the blocking pipeline from an async test.
pub async fn run_request(
    config: HarvesterConfig,
    request: urna_harvester::DatasetRequest,
) -> Result<Dataset> {
    tokio::task::spawn_blocking(move || Harvester::new(config)?.fetch(&request))
        .await
        .expect("blocking task panicked")
}
