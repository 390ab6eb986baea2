//! End-to-end scenarios covering the full fetch -> extract -> transform ->
//! load path for both source formats, run against an in-process fake loader
//! instead of a real database.

use std::io::Write;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hospital_mrf_etl::error::LoadError;
use hospital_mrf_etl::fetch::Fetcher;
use hospital_mrf_etl::loader::Loader;
use hospital_mrf_etl::pipeline::{Pipeline, WorkItem};
use hospital_mrf_etl::transform::TransformOutput;
use zip::write::{SimpleFileOptions, ZipWriter};

struct RecordingLoader {
    outputs: Mutex<Vec<TransformOutput>>,
}

#[async_trait]
impl Loader for RecordingLoader {
    async fn load(&self, output: &TransformOutput) -> Result<(), LoadError> {
        self.outputs.lock().unwrap().push(output.clone());
        Ok(())
    }
}

#[tokio::test]
async fn csv_source_zipped_end_to_end() {
    let mut server = mockito::Server::new_async().await;

    let csv_body = "\
hospital_name,license_number_OH\n\
Example Hospital,123456789\n\
setting,code|1,code|1|type,payer_name,plan_name,gross_charge\n\
Both,99213,CPT,Acme Payer,Gold Plan,250.00\n\
Outpatient,00000,CPT,Acme Payer,Gold Plan,50.00\n";

    let dir = tempfile::tempdir().unwrap();
    let zip_path = dir.path().join("bundle.zip");
    {
        let file = std::fs::File::create(&zip_path).unwrap();
        let mut writer = ZipWriter::new(file);
        writer.start_file("standard-charges.csv", SimpleFileOptions::default()).unwrap();
        writer.write_all(csv_body.as_bytes()).unwrap();
        writer.finish().unwrap();
    }
    let zip_bytes = std::fs::read(&zip_path).unwrap();

    let mock = server
        .mock("GET", "/bundle.zip")
        .with_status(200)
        .with_header("content-type", "application/zip")
        .with_body(zip_bytes)
        .create_async()
        .await;

    let download_dir = tempfile::tempdir().unwrap();
    let fetcher = Fetcher::new().unwrap();
    let pipeline = Pipeline::new(fetcher, download_dir.path().to_path_buf(), 2);
    let loader = Arc::new(RecordingLoader { outputs: Mutex::new(Vec::new()) });

    let url = format!("{}/bundle.zip", server.url());
    let items = vec![WorkItem { url, location_name: Some("Example".to_string()) }];

    let processed = pipeline.run(items, loader.clone()).await;
    mock.assert_async().await;

    assert_eq!(processed, 1);
    let outputs = loader.outputs.lock().unwrap();
    assert_eq!(outputs.len(), 1);
    let output = &outputs[0];

    // "Both" setting expands into two services; the non-whitelisted code is dropped.
    assert_eq!(output.services.len(), 2);
    assert_eq!(output.standard_charges.len(), 2);
    assert_eq!(output.payer_charges.len(), 2);
    assert_eq!(output.hospital.name.as_deref(), Some("Example Hospital"));

    let remaining: Vec<_> = std::fs::read_dir(download_dir.path()).unwrap().collect();
    assert!(remaining.is_empty(), "zip and extracted payload should both be cleaned up");
}

#[tokio::test]
async fn json_source_end_to_end() {
    let mut server = mockito::Server::new_async().await;

    let json_body = r#"{
        "hospital_name": "Json Hospital",
        "standard_charge_information": [
            {
                "description": "Office visit",
                "code_information": [{"code": "99213", "type": "CPT"}],
                "standard_charges": [
                    {
                        "setting": "outpatient",
                        "gross_charge": 200.00,
                        "payers_information": [
                            {"payer_name": "Acme Payer", "plan_name": "Gold Plan", "standard_charge_dollar": 150.00}
                        ]
                    }
                ]
            }
        ]
    }"#;

    let mock = server
        .mock("GET", "/mrf.json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json_body)
        .create_async()
        .await;

    let download_dir = tempfile::tempdir().unwrap();
    let fetcher = Fetcher::new().unwrap();
    let pipeline = Pipeline::new(fetcher, download_dir.path().to_path_buf(), 2);
    let loader = Arc::new(RecordingLoader { outputs: Mutex::new(Vec::new()) });

    let url = format!("{}/mrf.json", server.url());
    let items = vec![WorkItem { url, location_name: None }];

    let processed = pipeline.run(items, loader.clone()).await;
    mock.assert_async().await;

    assert_eq!(processed, 1);
    let outputs = loader.outputs.lock().unwrap();
    assert_eq!(outputs[0].hospital.name.as_deref(), Some("Json Hospital"));
    assert_eq!(outputs[0].services.len(), 1);
}

#[tokio::test]
async fn bounded_queues_process_every_url_exactly_once() {
    let mut server = mockito::Server::new_async().await;
    let csv_body = "\
hospital_name,license_number_OH\n\
Hospital,111111111\n\
setting,code|1,code|1|type\n\
Outpatient,99213,CPT\n";

    let mocks: Vec<_> = (0..5)
        .map(|i| {
            let path = format!("/h{i}.csv");
            server.mock("GET", path.as_str()).with_status(200).with_body(csv_body).create()
        })
        .collect();

    let download_dir = tempfile::tempdir().unwrap();
    let fetcher = Fetcher::new().unwrap();
    // max_buffered deliberately smaller than the number of URLs, to exercise
    // backpressure across both bounded channels.
    let pipeline = Pipeline::new(fetcher, download_dir.path().to_path_buf(), 2);
    let loader = Arc::new(RecordingLoader { outputs: Mutex::new(Vec::new()) });

    let items: Vec<_> = (0..5)
        .map(|i| WorkItem { url: format!("{}/h{i}.csv", server.url()), location_name: None })
        .collect();

    let processed = pipeline.run(items, loader.clone()).await;
    for mock in &mocks {
        mock.assert();
    }

    assert_eq!(processed, 5);
    assert_eq!(loader.outputs.lock().unwrap().len(), 5);

    let remaining: Vec<_> = std::fs::read_dir(download_dir.path()).unwrap().collect();
    assert!(remaining.is_empty());
}
