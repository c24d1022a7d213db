//! End-to-end tests of the harvester pipeline against a mock TSE server.

mod common;

use std::fs;

use pretty_assertions::assert_eq;
use tempfile::tempdir;
use urna_harvester::{DatasetRequest, HarvesterConfig, HarvesterError, RegionFilter};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::*;

#[tokio::test(flavor = "multi_thread")]
async fn test_legend_2002_all_regions() {
    let server = MockServer::start().await;
    let sp = to_text(&[
        legend_2002_row("SP", "BR", "BRASIL", "PRESIDENTE"),
        legend_2002_row("SP", "SP", "SÃO PAULO", "GOVERNADOR"),
    ]);
    let ac = to_text(&[legend_2002_row("AC", "AC", "ACRE", "GOVERNADOR")]);
    let br = to_text(&[legend_2002_row("BR", "BR", "BRASIL", "PRESIDENTE")]);
    let archive = zip_bytes(&[
        ("consulta_legendas_2002_SP.txt", latin1(&sp)),
        ("consulta_legendas_2002_AC.txt", latin1(&ac)),
        ("consulta_legendas_2002_BR.txt", latin1(&br)),
        ("LEIAME.pdf", b"%PDF-1.4".to_vec()),
    ]);
    serve_archive(&server, LEGEND_2002_PATH, archive).await;

    let tmp = tempdir().unwrap();
    let cache = tmp.path().join("cache");
    let config = test_config(&server, &cache, tmp.path());
    let dataset = run_request(config, DatasetRequest::legend(2002)).await.unwrap();
    let table = &dataset.table;

    assert_eq!(table.columns.len(), 18);
    assert_eq!(table.columns[7], "NOME_MUNICIPIO");
    assert!(table.rows.iter().all(|r| r.len() == 18));

    // State files in name order; the nationwide file is not read
    let ufs: Vec<&str> = table.column("SIGLA_UF").unwrap().collect();
    assert_eq!(ufs, vec!["AC", "SP", "SP"]);

    let ues: Vec<&str> = table.column("SIGLA_UE").unwrap().collect();
    assert!(ues.contains(&"BR"));
    let municipios: Vec<&str> = table.column("NOME_MUNICIPIO").unwrap().collect();
    assert_eq!(municipios[2], "SÃO PAULO");

    assert!(dataset.warnings.is_empty());
    assert!(dataset.exported.is_none());
    assert!(!cache.join("legend2002").exists());
    assert!(!cache.join("consulta_legendas_2002.zip").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_legend_2018_single_state() {
    let server = MockServer::start().await;
    let sp = to_text(&[
        legend_2018_row("SP", "SP", "SÃO PAULO", "PSDB"),
        legend_2018_row("SP", "SP", "SÃO PAULO", "DEM"),
    ]);
    let rj = to_text(&[legend_2018_row("RJ", "RJ", "RIO DE JANEIRO", "PSDB")]);
    let archive = zip_bytes(&[
        ("consulta_coligacao_2018_RJ.txt", latin1(&rj)),
        ("consulta_coligacao_2018_SP.txt", latin1(&sp)),
    ]);
    serve_archive(&server, LEGEND_2018_PATH, archive).await;

    let tmp = tempdir().unwrap();
    let config = test_config(&server, tmp.path(), tmp.path());
    let request = DatasetRequest::legend(2018).with_regions(RegionFilter::from_codes(["sp"]));
    let dataset = run_request(config, request).await.unwrap();
    let table = &dataset.table;

    assert_eq!(table.columns.len(), 21);
    assert_eq!(table.len(), 2);
    assert!(table.column("SIGLA_UF").unwrap().all(|uf| uf == "SP"));
    assert_eq!(table.sources.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_legend_2018_full_country() {
    let server = MockServer::start().await;
    let sp = to_text(&[legend_2018_row("SP", "SP", "SÃO PAULO", "PSDB")]);
    let brasil = to_text(&[
        legend_2018_row("BR", "BR", "BRASIL", "PSDB"),
        legend_2018_row("BR", "BR", "BRASIL", "PT"),
    ]);
    let archive = zip_bytes(&[
        ("consulta_coligacao_2018_BRASIL.txt", latin1(&brasil)),
        ("consulta_coligacao_2018_SP.txt", latin1(&sp)),
    ]);
    serve_archive(&server, LEGEND_2018_PATH, archive).await;

    let tmp = tempdir().unwrap();
    let config = test_config(&server, tmp.path(), tmp.path());
    let request = DatasetRequest::legend(2018).with_full_country(true);
    let dataset = run_request(config, request).await.unwrap();

    let ufs: Vec<&str> = dataset.table.column("SIGLA_UF").unwrap().collect();
    assert_eq!(ufs, vec!["BR", "BR"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_seats_unknown_region_is_empty_result() {
    let server = MockServer::start().await;
    let sp = to_text(&[seats_2020_row("SP", "71072", "SÃO PAULO", "Vereador", "55")]);
    serve_archive(
        &server,
        SEATS_2020_PATH,
        zip_bytes(&[("consulta_vagas_2020_SP.txt", latin1(&sp))]),
    )
    .await;

    let tmp = tempdir().unwrap();
    let config = test_config(&server, tmp.path(), tmp.path());
    let request = DatasetRequest::seats(2020).with_regions(RegionFilter::from_codes(["ZZZ"]));
    let err = run_request(config, request).await.unwrap_err();

    assert!(matches!(
        err,
        HarvesterError::EmptyResult { year: 2020, ref filter, .. } if filter == "[ZZZ]"
    ));
    assert!(!tmp.path().join("seats2020").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_wrong_encoding_is_decode_error_and_cleans_up() {
    let server = MockServer::start().await;
    let sp = to_text(&[seats_2020_row("SP", "71072", "SÃO PAULO", "Vereador", "55")]);
    serve_archive(
        &server,
        SEATS_2020_PATH,
        zip_bytes(&[("consulta_vagas_2020_SP.txt", latin1(&sp))]),
    )
    .await;

    let tmp = tempdir().unwrap();
    let config = test_config(&server, tmp.path(), tmp.path());
    let request = DatasetRequest::seats(2020).with_encoding("utf-8");
    let err = run_request(config, request).await.unwrap_err();

    match err {
        HarvesterError::Decode { file, encoding } => {
            assert_eq!(file.file_name().unwrap(), "consulta_vagas_2020_SP.txt");
            assert_eq!(encoding, "UTF-8");
        }
        other => panic!("expected decode error, got {other:?}"),
    }
    assert!(!tmp.path().join("seats2020").exists());
    assert!(!tmp.path().join("consulta_vagas_2020.zip").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_schema_change_is_reported_with_file() {
    let server = MockServer::start().await;
    let mut short_row = seats_2020_row("RJ", "60011", "RIO DE JANEIRO", "Prefeito", "1");
    short_row.pop();
    let rj = to_text(&[short_row]);
    serve_archive(
        &server,
        SEATS_2020_PATH,
        zip_bytes(&[("consulta_vagas_2020_RJ.txt", latin1(&rj))]),
    )
    .await;

    let tmp = tempdir().unwrap();
    let config = test_config(&server, tmp.path(), tmp.path());
    let err = run_request(config, DatasetRequest::seats(2020)).await.unwrap_err();

    assert_eq!(
        err.to_string(),
        "Schema mismatch in seats data for 2020: row 0 of consulta_vagas_2020_RJ.txt has 14 fields, expected 15"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_keep_cache_reuses_archive() {
    let server = MockServer::start().await;
    let sp = to_text(&[seats_2020_row("SP", "71072", "SÃO PAULO", "Vereador", "55")]);
    Mock::given(method("GET"))
        .and(path(SEATS_2020_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(zip_bytes(&[("consulta_vagas_2020_SP.txt", latin1(&sp))])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let tmp = tempdir().unwrap();
    let request = DatasetRequest::seats(2020).with_keep_cache(true);

    let first = run_request(test_config(&server, tmp.path(), tmp.path()), request.clone())
        .await
        .unwrap();
    assert!(tmp.path().join("consulta_vagas_2020.zip").is_file());
    assert!(!tmp.path().join("seats2020").exists());

    let second = run_request(test_config(&server, tmp.path(), tmp.path()), request)
        .await
        .unwrap();
    assert_eq!(first.table, second.table);
    assert!(tmp.path().join("consulta_vagas_2020.zip").is_file());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_keep_cache_retains_archive_after_failure() {
    let server = MockServer::start().await;
    let sp = to_text(&[seats_2020_row("SP", "71072", "SÃO PAULO", "Vereador", "55")]);
    serve_archive(
        &server,
        SEATS_2020_PATH,
        zip_bytes(&[("consulta_vagas_2020_SP.txt", latin1(&sp))]),
    )
    .await;

    let tmp = tempdir().unwrap();
    let config = test_config(&server, tmp.path(), tmp.path());
    let request = DatasetRequest::seats(2020)
        .with_encoding("utf-8")
        .with_keep_cache(true);
    let err = run_request(config, request).await.unwrap_err();

    assert!(matches!(err, HarvesterError::Decode { .. }));
    assert!(!tmp.path().join("seats2020").exists());
    assert!(tmp.path().join("consulta_vagas_2020.zip").is_file());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_repeated_requests_are_deterministic() {
    let server = MockServer::start().await;
    let files: Vec<(String, Vec<u8>)> = ["RJ", "MG", "SP", "AC"]
        .iter()
        .map(|uf| {
            let text = to_text(&[seats_2020_row(uf, "1", "CAPITAL", "Vereador", "21")]);
            (format!("consulta_vagas_2020_{uf}.txt"), latin1(&text))
        })
        .collect();
    let entries: Vec<(&str, Vec<u8>)> = files
        .iter()
        .map(|(name, bytes)| (name.as_str(), bytes.clone()))
        .collect();
    serve_archive(&server, SEATS_2020_PATH, zip_bytes(&entries)).await;

    let tmp = tempdir().unwrap();
    let first = run_request(
        test_config(&server, tmp.path(), tmp.path()),
        DatasetRequest::seats(2020),
    )
    .await
    .unwrap();
    let second = run_request(
        test_config(&server, tmp.path(), tmp.path()),
        DatasetRequest::seats(2020),
    )
    .await
    .unwrap();

    assert_eq!(first.table, second.table);
    let ufs: Vec<&str> = first.table.column("SIGLA_UF").unwrap().collect();
    assert_eq!(ufs, vec!["AC", "MG", "RJ", "SP"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_reserved_codes_kept_verbatim() {
    let server = MockServer::start().await;
    let zz = to_text(&[seats_2020_row("ZZ", "ZZ", "EXTERIOR", "Presidente", "1")]);
    let vt = to_text(&[seats_2020_row("VT", "VT", "VOTO EM TRÂNSITO", "Presidente", "1")]);
    serve_archive(
        &server,
        SEATS_2020_PATH,
        zip_bytes(&[
            ("consulta_vagas_2020_VT.txt", latin1(&vt)),
            ("consulta_vagas_2020_ZZ.txt", latin1(&zz)),
        ]),
    )
    .await;

    let tmp = tempdir().unwrap();
    let config = test_config(&server, tmp.path(), tmp.path());
    let dataset = run_request(config, DatasetRequest::seats(2020)).await.unwrap();

    let ufs: Vec<&str> = dataset.table.column("SIGLA_UF").unwrap().collect();
    assert_eq!(ufs, vec!["VT", "ZZ"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_transliterate_and_export() {
    let server = MockServer::start().await;
    let sp = to_text(&[seats_2020_row("SP", "71072", "SÃO PAULO", "Vereador", "55")]);
    serve_archive(
        &server,
        SEATS_2020_PATH,
        zip_bytes(&[("consulta_vagas_2020_SP.txt", latin1(&sp))]),
    )
    .await;

    let tmp = tempdir().unwrap();
    let out = tmp.path().join("out");
    let config = test_config(&server, &tmp.path().join("cache"), &out);
    let request = DatasetRequest::seats(2020)
        .with_transliterate(true)
        .with_export(true);
    let dataset = run_request(config, request).await.unwrap();

    let nomes: Vec<&str> = dataset.table.column("NOME_UE").unwrap().collect();
    assert_eq!(nomes, vec!["SAO PAULO"]);
    assert!(dataset.table.rows.iter().flatten().all(|v| v.is_ascii()));

    let files = dataset.exported.expect("export requested");
    assert_eq!(files.csv, out.join("seats_2020.csv"));
    let csv = fs::read_to_string(&files.csv).unwrap();
    let mut lines = csv.lines();
    assert!(lines.next().unwrap().starts_with("DATA_GERACAO,HORA_GERACAO,ANO_ELEICAO"));
    assert!(lines.next().unwrap().contains("SAO PAULO"));

    let xpt = fs::read(&files.xpt).unwrap();
    assert_eq!(xpt.len() % 80, 0);
    assert!(xpt.starts_with(b"HEADER RECORD*******LIBRARY HEADER RECORD!!!!!!!"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_export_failure_is_a_warning() {
    let server = MockServer::start().await;
    let sp = to_text(&[seats_2020_row("SP", "71072", "SÃO PAULO", "Vereador", "55")]);
    serve_archive(
        &server,
        SEATS_2020_PATH,
        zip_bytes(&[("consulta_vagas_2020_SP.txt", latin1(&sp))]),
    )
    .await;

    let tmp = tempdir().unwrap();
    let blocked = tmp.path().join("blocked");
    fs::write(&blocked, "not a directory").unwrap();
    let config = test_config(&server, &tmp.path().join("cache"), &blocked);
    let dataset = run_request(config, DatasetRequest::seats(2020).with_export(true))
        .await
        .unwrap();

    assert_eq!(dataset.table.len(), 1);
    assert!(dataset.exported.is_none());
    assert_eq!(dataset.warning_count(), 1);
    assert!(dataset.warnings[0].starts_with("Export failed"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_incomplete_year_warns() {
    let server = MockServer::start().await;
    let mut row = legend_2002_row("SP", "SP", "SÃO PAULO", "GOVERNADOR");
    row[2] = "1998".to_string();
    serve_archive(
        &server,
        "/consulta_legendas/consulta_legendas_1998.zip",
        zip_bytes(&[("consulta_legendas_1998_SP.txt", latin1(&to_text(&[row])))]),
    )
    .await;

    let tmp = tempdir().unwrap();
    let config = test_config(&server, tmp.path(), tmp.path());
    let dataset = run_request(config, DatasetRequest::legend(1998)).await.unwrap();

    assert_eq!(dataset.table.columns.len(), 18);
    assert_eq!(dataset.warning_count(), 1);
    assert!(dataset.warnings[0].contains("incomplete"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_placeholder_files_skipped_by_default() {
    let server = MockServer::start().await;
    let rows: Vec<Vec<String>> = (0..3)
        .map(|_| seats_2020_row("SP", "71072", "SÃO PAULO", "Vereador", "55"))
        .collect();
    let sp = to_text(&rows);
    let ac = to_text(&[seats_2020_row("AC", "1", "X", "Y", "1")]);
    assert!(ac.len() <= 200 && sp.len() > 200);
    serve_archive(
        &server,
        SEATS_2020_PATH,
        zip_bytes(&[
            ("consulta_vagas_2020_AC.txt", latin1(&ac)),
            ("consulta_vagas_2020_SP.txt", latin1(&sp)),
        ]),
    )
    .await;

    let tmp = tempdir().unwrap();
    let config = HarvesterConfig::builder()
        .base_url(server.uri())
        .cache_dir(tmp.path())
        .build();
    let dataset = run_request(config, DatasetRequest::seats(2020)).await.unwrap();

    assert_eq!(dataset.table.len(), 3);
    assert_eq!(dataset.table.sources[0].name, "consulta_vagas_2020_SP.txt");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_archive_is_fetch_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let tmp = tempdir().unwrap();
    let config = test_config(&server, tmp.path(), tmp.path());
    let err = run_request(config, DatasetRequest::seats(2020)).await.unwrap_err();

    match err {
        HarvesterError::Fetch { url, message, .. } => {
            assert!(url.ends_with(SEATS_2020_PATH));
            assert!(message.contains("404"));
        }
        other => panic!("expected fetch error, got {other:?}"),
    }
    assert!(fs::read_dir(tmp.path()).unwrap().next().is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_html_error_page_is_fetch_error() {
    let server = MockServer::start().await;
    serve_archive(&server, SEATS_2020_PATH, b"<html>manutencao</html>".to_vec()).await;

    let tmp = tempdir().unwrap();
    let config = test_config(&server, tmp.path(), tmp.path());
    let err = run_request(config, DatasetRequest::seats(2020)).await.unwrap_err();

    match err {
        HarvesterError::Fetch { url, message, .. } => {
            assert!(url.ends_with(SEATS_2020_PATH));
            assert!(message.starts_with("not a ZIP archive"));
        }
        other => panic!("expected fetch error, got {other:?}"),
    }
    assert!(fs::read_dir(tmp.path()).unwrap().next().is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_oversized_archive_is_fetch_error() {
    let server = MockServer::start().await;
    let sp = to_text(&[seats_2020_row("SP", "71072", "SAO PAULO", "Vereador", "55")]);
    serve_archive(
        &server,
        SEATS_2020_PATH,
        zip_bytes(&[("consulta_vagas_2020_SP.txt", latin1(&sp))]),
    )
    .await;

    let tmp = tempdir().unwrap();
    let cache = tmp.path().join("cache");
    let config = HarvesterConfig::builder()
        .base_url(server.uri())
        .cache_dir(&cache)
        .output_dir(tmp.path())
        .timeout_secs(10)
        .max_download_bytes(10)
        .build();
    let err = run_request(config, DatasetRequest::seats(2020)).await.unwrap_err();

    match err {
        HarvesterError::Fetch { message, .. } => {
            assert!(message.contains("maximum size of 10 bytes"));
        }
        other => panic!("expected fetch error, got {other:?}"),
    }
    // No partial download left behind
    let left: Vec<_> = fs::read_dir(&cache)
        .map(|entries| entries.map(|e| e.unwrap().file_name()).collect())
        .unwrap_or_default();
    assert_eq!(left, Vec::<std::ffi::OsString>::new());
}
