mod support;

use linkspocket::common::streams::named;
use linkspocket::oci::{FILENAME_ANNOTATION, OCI_MANIFEST, OCTET_STREAM};
use linkspocket::registry::HttpRequest;
use linkspocket::{Descriptor, Digest, Manifest, RegistryConfig, RegistryError, Reference};
use reqwest::header::{HeaderName, CONTENT_LENGTH, CONTENT_RANGE};
use reqwest::{Method, StatusCode};
use std::io::Cursor;
use support::FakeRegistry;

fn data(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn header(request: &HttpRequest, name: HeaderName) -> String {
    request.headers.get(name).unwrap().to_str().unwrap().to_string()
}

#[tokio::test]
async fn test_pushing_same_blob_twice_opens_one_session() {
    let registry = FakeRegistry::new();
    let client = registry.client(4096);
    let bytes = data(10_000);
    let descriptor = Descriptor::from_bytes(&bytes, OCTET_STREAM);

    for _ in 0..2 {
        client
            .push_blob("seeds", &descriptor, &mut Cursor::new(bytes.clone()))
            .await
            .unwrap();
    }

    assert_eq!(registry.count(&Method::POST, "/blobs/uploads/"), 1);
    assert_eq!(registry.stored_blob(&descriptor.digest), Some(bytes));
}

#[tokio::test]
async fn test_chunks_cover_the_blob_contiguously() {
    let registry = FakeRegistry::new();
    let client = registry.client(4096);
    let bytes = data(10_000);
    let descriptor = Descriptor::from_bytes(&bytes, OCTET_STREAM);

    client
        .push_blob("library/seeds", &descriptor, &mut Cursor::new(bytes.clone()))
        .await
        .unwrap();

    let patches = registry.patches();
    assert_eq!(patches.len(), 3);

    let ranges: Vec<String> = patches.iter().map(|p| header(p, CONTENT_RANGE)).collect();
    assert_eq!(ranges, vec!["0-4095", "4096-8191", "8192-9999"]);

    let lengths: Vec<String> = patches.iter().map(|p| header(p, CONTENT_LENGTH)).collect();
    assert_eq!(lengths, vec!["4096", "4096", "1808"]);

    let finalize = registry
        .requests()
        .into_iter()
        .find(|r| r.method == Method::PUT)
        .unwrap();
    let digest = finalize
        .url
        .query_pairs()
        .find(|(k, _)| k == "digest")
        .map(|(_, v)| v.into_owned());
    assert_eq!(digest, Some(descriptor.digest.to_string()));
    assert_eq!(registry.stored_blob(&descriptor.digest), Some(bytes));
}

#[tokio::test]
async fn test_exact_multiple_of_chunk_size() {
    let registry = FakeRegistry::new();
    let client = registry.client(1024);
    let bytes = data(4096);
    let descriptor = Descriptor::from_bytes(&bytes, OCTET_STREAM);

    client
        .push_blob("seeds", &descriptor, &mut Cursor::new(bytes))
        .await
        .unwrap();

    assert_eq!(registry.patches().len(), 4);
}

#[tokio::test]
async fn test_each_patch_uses_the_previous_location() {
    let registry = FakeRegistry::new();
    let client = registry.client(100);
    let bytes = data(350);
    let descriptor = Descriptor::from_bytes(&bytes, OCTET_STREAM);

    client
        .push_blob("seeds", &descriptor, &mut Cursor::new(bytes))
        .await
        .unwrap();

    // The fake rejects stale locations, so each state value must advance by one.
    let states: Vec<String> = registry
        .patches()
        .iter()
        .map(|p| p.url.query().unwrap_or_default().to_string())
        .collect();
    assert_eq!(states, vec!["_state=0", "_state=1", "_state=2", "_state=3"]);
}

#[tokio::test]
async fn test_empty_blob_is_initiated_and_finalized_without_chunks() {
    let registry = FakeRegistry::new();
    let client = registry.client(4096);
    let descriptor = Descriptor::from_bytes(b"", OCTET_STREAM);

    client
        .push_blob("seeds", &descriptor, &mut Cursor::new(Vec::new()))
        .await
        .unwrap();

    assert!(registry.patches().is_empty());
    assert_eq!(registry.stored_blob(&descriptor.digest), Some(Vec::new()));
}

#[tokio::test]
async fn test_source_shorter_than_descriptor_fails() {
    let registry = FakeRegistry::new();
    let client = registry.client(4096);
    let descriptor = Descriptor::from_bytes(&data(5000), OCTET_STREAM);

    let err = client
        .push_blob("seeds", &descriptor, &mut Cursor::new(data(3000)))
        .await
        .unwrap_err();

    assert!(matches!(err, RegistryError::Upload(_)));
    assert!(registry.stored_blob(&descriptor.digest).is_none());
}

#[tokio::test]
async fn test_push_descriptor_streams_bound_content_with_progress() {
    let registry = FakeRegistry::new();
    let client = registry.client(64);
    let bytes = data(300);
    let source = named("rom", Cursor::new(bytes.clone()));
    let mut descriptor = Descriptor::from_stream(source, OCTET_STREAM).unwrap();

    let mut seen = 0u64;
    client
        .push_descriptor("seeds", &mut descriptor, |n: u64| seen += n)
        .await
        .unwrap();

    assert_eq!(seen, 300);
    assert!(!descriptor.has_content());
    assert_eq!(registry.stored_blob(&descriptor.digest), Some(bytes));
}

#[tokio::test]
async fn test_manifest_push_is_skipped_when_present() {
    let registry = FakeRegistry::new();
    registry.put_manifest("seeds", "v1", b"{}");
    let client = registry.client(4096);

    client
        .push_manifest("seeds", "v1", &Manifest::new(OCI_MANIFEST))
        .await
        .unwrap();

    assert_eq!(registry.count(&Method::PUT, "/manifests/"), 0);
    assert_eq!(registry.stored_manifest("seeds", "v1"), Some(b"{}".to_vec()));
}

#[tokio::test]
async fn test_manifest_round_trip() {
    let registry = FakeRegistry::new();
    let client = registry.client(4096);

    let config = Descriptor::from_bytes(
        br#"{"files":["a","b"]}"#,
        "application/vnd.linkspocket.config.v1+json",
    );
    let mut manifest = Manifest::new("application/vnd.linkspocket.artifact.v1").with_config(config);
    for (data, title) in [(b"bbb", "b"), (b"aaa", "a")] {
        let layer = Descriptor::from_bytes(data, OCTET_STREAM);
        manifest.add_layer(layer.with_annotation(FILENAME_ANNOTATION, title));
    }

    client.push_manifest("seeds", "v1", &manifest).await.unwrap();
    assert_eq!(registry.count(&Method::PUT, "/manifests/v1"), 1);

    let pulled = client.pull_manifest("seeds", "v1").await.unwrap().unwrap();
    assert_eq!(pulled.config.digest, manifest.config.digest);
    assert_eq!(pulled.layers, manifest.layers);
    assert_eq!(pulled.media_type, "application/vnd.linkspocket.artifact.v1");
    assert!(pulled.blobs().all(|d| !d.has_content()));
}

#[tokio::test]
async fn test_unknown_manifest() {
    let registry = FakeRegistry::new();
    let client = registry.client(4096);

    assert!(client.pull_manifest("seeds", "missing").await.unwrap().is_none());

    let reference: Reference = "localhost:5000/seeds:missing".parse().unwrap();
    let err = client.require_manifest(&reference).await.unwrap_err();
    assert!(matches!(err, RegistryError::UnknownManifest { .. }));
    assert_eq!(err.to_string(), "Could not find manifest for localhost:5000/seeds:missing");
}

#[tokio::test]
async fn test_pull_blob_streams_stored_content() {
    let registry = FakeRegistry::new();
    let bytes = data(2000);
    let digest = registry.put_blob(&bytes);
    let client = registry.client(4096);

    let mut blob = client.pull_blob("seeds", &digest).await.unwrap();
    let mut out = Vec::new();
    blob.copy_verified(&mut out, &digest).await.unwrap();
    blob.close();

    assert_eq!(out, bytes);

    let missing = Digest::sha256(b"absent");
    let err = client.pull_blob("seeds", &missing).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_existence_check_statuses() {
    let registry = FakeRegistry::new();
    registry.break_existence_checks("broken", StatusCode::INTERNAL_SERVER_ERROR);
    let digest = registry.put_blob(b"present");

    let lenient = registry.client(4096);
    assert!(lenient.does_blob_exist("seeds", &digest).await.unwrap());
    assert!(!lenient.does_blob_exist("seeds", &Digest::sha256(b"absent")).await.unwrap());
    assert!(!lenient.does_blob_exist("broken", &digest).await.unwrap());

    let strict = registry.client_with(
        RegistryConfig::new("localhost:5000").with_strict_existence_checks(true),
    );
    let err = strict.does_blob_exist("broken", &digest).await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert!(strict.does_manifest_exist("broken", "v1").await.is_err());
}
