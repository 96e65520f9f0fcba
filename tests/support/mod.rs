//! In-memory distribution API used by the integration tests
//!
//! Records every request and enforces the upload session rules a real registry
//! does: each PATCH must start at the accepted offset and use the newest location.

#![allow(dead_code)]

use async_trait::async_trait;
use linkspocket::error::Result;
use linkspocket::registry::{HttpRequest, HttpResponse, HttpTransport};
use linkspocket::{Digest, Logger, RegistryClient, RegistryConfig, Scheme};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_RANGE, LOCATION};
use reqwest::{Method, StatusCode};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

struct UploadState {
    data: Vec<u8>,
    generation: u64,
}

#[derive(Default)]
struct State {
    blobs: HashMap<String, Vec<u8>>,
    manifests: HashMap<(String, String), Vec<u8>>,
    uploads: HashMap<String, UploadState>,
    next_upload: u64,
}

#[derive(Default)]
pub struct FakeRegistry {
    state: Mutex<State>,
    requests: Mutex<Vec<HttpRequest>>,
    /// Repositories whose existence checks answer with this status
    broken: Mutex<HashMap<String, StatusCode>>,
}

enum Route {
    Uploads { repository: String, id: String },
    Blob { repository: String, digest: String },
    Manifest { repository: String, reference: String },
    Unknown,
}

fn route(path: &str) -> Route {
    let Some(path) = path.strip_prefix("/v2/") else {
        return Route::Unknown;
    };

    if let Some((repository, id)) = path.split_once("/blobs/uploads/") {
        Route::Uploads {
            repository: repository.to_string(),
            id: id.to_string(),
        }
    } else if let Some((repository, digest)) = path.rsplit_once("/blobs/") {
        Route::Blob {
            repository: repository.to_string(),
            digest: digest.to_string(),
        }
    } else if let Some((repository, reference)) = path.rsplit_once("/manifests/") {
        Route::Manifest {
            repository: repository.to_string(),
            reference: reference.to_string(),
        }
    } else {
        Route::Unknown
    }
}

fn respond(status: StatusCode) -> HttpResponse {
    HttpResponse::from_bytes(status, HeaderMap::new(), Vec::new())
}

fn respond_with_location(status: StatusCode, location: &str) -> HttpResponse {
    let mut headers = HeaderMap::new();
    headers.insert(LOCATION, HeaderValue::from_str(location).unwrap());
    HttpResponse::from_bytes(status, headers, Vec::new())
}

fn query(request: &HttpRequest, key: &str) -> Option<String> {
    request
        .url
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

impl FakeRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A client for this registry with the given chunk size
    pub fn client(self: &Arc<Self>, chunk_size: usize) -> RegistryClient {
        self.client_with(RegistryConfig::new("localhost:5000").with_chunk_size(chunk_size))
    }

    pub fn client_with(self: &Arc<Self>, config: RegistryConfig) -> RegistryClient {
        RegistryClient::builder(config.with_scheme(Scheme::Http))
            .with_logger(Logger::new_quiet())
            .with_transport(self.clone())
            .build()
            .unwrap()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, method: &Method, path_fragment: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == *method && r.url.path().contains(path_fragment))
            .count()
    }

    pub fn patches(&self) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == Method::PATCH)
            .collect()
    }

    pub fn stored_blob(&self, digest: &Digest) -> Option<Vec<u8>> {
        self.state.lock().unwrap().blobs.get(&digest.to_string()).cloned()
    }

    pub fn put_blob(&self, data: &[u8]) -> Digest {
        let digest = Digest::sha256(data);
        self.state
            .lock()
            .unwrap()
            .blobs
            .insert(digest.to_string(), data.to_vec());
        digest
    }

    /// Store `data` under `digest` without checking that they agree
    pub fn put_blob_as(&self, digest: &Digest, data: &[u8]) {
        self.state
            .lock()
            .unwrap()
            .blobs
            .insert(digest.to_string(), data.to_vec());
    }

    pub fn put_manifest(&self, repository: &str, reference: &str, body: &[u8]) {
        self.state
            .lock()
            .unwrap()
            .manifests
            .insert((repository.to_string(), reference.to_string()), body.to_vec());
    }

    pub fn stored_manifest(&self, repository: &str, reference: &str) -> Option<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .manifests
            .get(&(repository.to_string(), reference.to_string()))
            .cloned()
    }

    pub fn break_existence_checks(&self, repository: &str, status: StatusCode) {
        self.broken
            .lock()
            .unwrap()
            .insert(repository.to_string(), status);
    }

    fn handle(&self, request: &HttpRequest) -> HttpResponse {
        let mut state = self.state.lock().unwrap();

        match (request.method.clone(), route(request.url.path())) {
            (Method::POST, Route::Uploads { repository, id }) if id.is_empty() => {
                state.next_upload += 1;
                let id = format!("session-{}", state.next_upload);
                state.uploads.insert(
                    id.clone(),
                    UploadState {
                        data: Vec::new(),
                        generation: 0,
                    },
                );
                respond_with_location(
                    StatusCode::ACCEPTED,
                    &format!("/v2/{}/blobs/uploads/{}?_state=0", repository, id),
                )
            }
            (Method::PATCH, Route::Uploads { repository, id }) => {
                let Some(upload) = state.uploads.get_mut(&id) else {
                    return respond(StatusCode::NOT_FOUND);
                };
                if query(request, "_state") != Some(upload.generation.to_string()) {
                    return respond(StatusCode::RANGE_NOT_SATISFIABLE);
                }

                let body = request.body.clone().unwrap_or_default();
                if body.is_empty() {
                    return respond(StatusCode::BAD_REQUEST);
                }
                let expected_range = format!(
                    "{}-{}",
                    upload.data.len(),
                    upload.data.len() + body.len() - 1
                );
                let range = request
                    .headers
                    .get(CONTENT_RANGE)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                if range != Some(expected_range) {
                    return respond(StatusCode::RANGE_NOT_SATISFIABLE);
                }

                upload.data.extend_from_slice(&body);
                upload.generation += 1;
                respond_with_location(
                    StatusCode::ACCEPTED,
                    &format!(
                        "/v2/{}/blobs/uploads/{}?_state={}",
                        repository, id, upload.generation
                    ),
                )
            }
            (Method::PUT, Route::Uploads { id, .. }) => {
                let Some(upload) = state.uploads.get(&id) else {
                    return respond(StatusCode::NOT_FOUND);
                };
                if query(request, "_state") != Some(upload.generation.to_string()) {
                    return respond(StatusCode::RANGE_NOT_SATISFIABLE);
                }
                let Some(digest) = query(request, "digest") else {
                    return respond(StatusCode::BAD_REQUEST);
                };
                if Digest::sha256(&upload.data).to_string() != digest {
                    return HttpResponse::from_bytes(
                        StatusCode::BAD_REQUEST,
                        HeaderMap::new(),
                        b"{\"errors\":[{\"code\":\"DIGEST_INVALID\"}]}".to_vec(),
                    );
                }

                let Some(upload) = state.uploads.remove(&id) else {
                    return respond(StatusCode::NOT_FOUND);
                };
                state.blobs.insert(digest, upload.data);
                respond(StatusCode::CREATED)
            }
            (Method::GET, Route::Blob { repository, digest }) => {
                if let Some(status) = self.broken.lock().unwrap().get(&repository) {
                    return respond(*status);
                }
                match state.blobs.get(&digest) {
                    Some(data) => {
                        HttpResponse::from_bytes(StatusCode::OK, HeaderMap::new(), data.clone())
                    }
                    None => respond(StatusCode::NOT_FOUND),
                }
            }
            (Method::HEAD, Route::Manifest { repository, reference }) => {
                if let Some(status) = self.broken.lock().unwrap().get(&repository) {
                    return respond(*status);
                }
                if state.manifests.contains_key(&(repository, reference)) {
                    respond(StatusCode::OK)
                } else {
                    respond(StatusCode::NOT_FOUND)
                }
            }
            (Method::GET, Route::Manifest { repository, reference }) => {
                match state.manifests.get(&(repository, reference)) {
                    Some(body) => {
                        HttpResponse::from_bytes(StatusCode::OK, HeaderMap::new(), body.clone())
                    }
                    None => respond(StatusCode::NOT_FOUND),
                }
            }
            (Method::PUT, Route::Manifest { repository, reference }) => {
                let body = request.body.clone().unwrap_or_default();
                state.manifests.insert((repository, reference), body);
                respond(StatusCode::CREATED)
            }
            _ => respond(StatusCode::METHOD_NOT_ALLOWED),
        }
    }
}

#[async_trait]
impl HttpTransport for FakeRegistry {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self.handle(&request))
    }
}
