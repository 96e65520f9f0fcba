//! Pull+push aggregates that skip pushes of content the registry already has
//!
//! Each aggregate pairs a puller with a pusher. Pulls are forwarded untouched.
//! Pushes first ask the puller whether the content exists, and only transfer when
//! it does not, so pushing the same digest twice never re-sends its bytes.

use crate::common::{BlobPuller, BlobPusher, BlobSource, ManifestPuller, ManifestPusher};
use crate::digest::Digest;
use crate::error::Result;
use crate::logging::Logger;
use crate::oci::{Descriptor, Manifest};
use crate::registry::BlobReader;
use async_trait::async_trait;
use std::sync::Arc;

pub struct BlobPullPusher {
    puller: Arc<dyn BlobPuller>,
    pusher: Arc<dyn BlobPusher>,
    output: Logger,
}

impl BlobPullPusher {
    pub fn new(puller: Arc<dyn BlobPuller>, pusher: Arc<dyn BlobPusher>, output: Logger) -> Self {
        Self {
            puller,
            pusher,
            output,
        }
    }
}

#[async_trait]
impl BlobPuller for BlobPullPusher {
    async fn does_blob_exist(&self, repository: &str, digest: &Digest) -> Result<bool> {
        self.puller.does_blob_exist(repository, digest).await
    }

    async fn pull_blob(&self, repository: &str, digest: &Digest) -> Result<BlobReader> {
        self.puller.pull_blob(repository, digest).await
    }
}

#[async_trait]
impl BlobPusher for BlobPullPusher {
    async fn push_blob(
        &self,
        repository: &str,
        descriptor: &Descriptor,
        content: BlobSource<'_>,
    ) -> Result<()> {
        if self.puller.does_blob_exist(repository, &descriptor.digest).await? {
            self.output.info(&format!(
                "Blob {} already exists, skipping",
                descriptor.digest.short()
            ));
            return Ok(());
        }

        self.pusher.push_blob(repository, descriptor, content).await
    }
}

pub struct ManifestPullPusher {
    puller: Arc<dyn ManifestPuller>,
    pusher: Arc<dyn ManifestPusher>,
    output: Logger,
}

impl ManifestPullPusher {
    pub fn new(
        puller: Arc<dyn ManifestPuller>,
        pusher: Arc<dyn ManifestPusher>,
        output: Logger,
    ) -> Self {
        Self {
            puller,
            pusher,
            output,
        }
    }
}

#[async_trait]
impl ManifestPuller for ManifestPullPusher {
    async fn does_manifest_exist(&self, repository: &str, reference: &str) -> Result<bool> {
        self.puller.does_manifest_exist(repository, reference).await
    }

    async fn pull_manifest(&self, repository: &str, reference: &str) -> Result<Option<Manifest>> {
        self.puller.pull_manifest(repository, reference).await
    }
}

#[async_trait]
impl ManifestPusher for ManifestPullPusher {
    async fn push_manifest(
        &self,
        repository: &str,
        reference: &str,
        manifest: &Manifest,
    ) -> Result<()> {
        if self.puller.does_manifest_exist(repository, reference).await? {
            self.output.info(&format!(
                "Manifest {}:{} already exists, skipping",
                repository, reference
            ));
            return Ok(());
        }

        self.pusher.push_manifest(repository, reference, manifest).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};
    use std::sync::Mutex;

    /// Stores blobs in memory and counts uploads
    #[derive(Default)]
    struct MemoryBlobs {
        stored: Mutex<Vec<Digest>>,
        pushes: Mutex<usize>,
    }

    #[async_trait]
    impl BlobPuller for MemoryBlobs {
        async fn does_blob_exist(&self, _repository: &str, digest: &Digest) -> Result<bool> {
            Ok(self.stored.lock().unwrap().contains(digest))
        }

        async fn pull_blob(&self, _repository: &str, _digest: &Digest) -> Result<BlobReader> {
            unreachable!("not pulled in these tests")
        }
    }

    #[async_trait]
    impl BlobPusher for MemoryBlobs {
        async fn push_blob(
            &self,
            _repository: &str,
            descriptor: &Descriptor,
            content: BlobSource<'_>,
        ) -> Result<()> {
            let mut bytes = Vec::new();
            content.read_to_end(&mut bytes)?;
            assert_eq!(bytes.len() as u64, descriptor.size);

            *self.pushes.lock().unwrap() += 1;
            self.stored.lock().unwrap().push(descriptor.digest.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_second_push_is_skipped() {
        let memory = Arc::new(MemoryBlobs::default());
        let blobs = BlobPullPusher::new(memory.clone(), memory.clone(), Logger::new_quiet());
        let descriptor = Descriptor::from_bytes(b"seed", "application/octet-stream");

        for _ in 0..2 {
            let mut content = Cursor::new(b"seed".to_vec());
            blobs.push_blob("seeds", &descriptor, &mut content).await.unwrap();
        }

        assert_eq!(*memory.pushes.lock().unwrap(), 1);
        assert!(blobs.does_blob_exist("seeds", &descriptor.digest).await.unwrap());
    }
}
