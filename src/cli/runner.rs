//! Push and pull workflows behind the command line

use crate::cli::args::{Args, Command};
use crate::cli::artifact::{self, CONFIG_FILE_NAME};
use crate::common::streams::{ProgressWriter, Tick};
use crate::config::{RegistryConfig, Scheme};
use crate::error::RegistryError;
use crate::logging::Logger;
use crate::oci::{Descriptor, Reference};
use crate::registry::{HttpTransport, RegistryClient};
use crate::upload::progress::{self, Display, Palette};
use std::fs::File;
use std::io::{self, IsTerminal};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    /// Bad local input, detected before talking to the registry
    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidInput(_) => 3,
            CliError::Registry(_) => 2,
        }
    }
}

impl From<io::Error> for CliError {
    fn from(err: io::Error) -> Self {
        CliError::Registry(RegistryError::Io(err))
    }
}

pub type CliResult<T> = std::result::Result<T, CliError>;

pub struct Runner {
    args: Args,
    output: Logger,
    palette: Palette,
    transport: Option<Arc<dyn HttpTransport>>,
}

impl Runner {
    pub fn new(args: Args) -> Self {
        let output = if args.quiet {
            Logger::new_quiet()
        } else {
            Logger::new(args.verbose)
        };
        let palette = if io::stderr().is_terminal() {
            Palette::ansi()
        } else {
            Palette::plain()
        };

        Self {
            args,
            output,
            palette,
            transport: None,
        }
    }

    /// Send registry requests through `transport` instead of a new reqwest client
    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Run the selected command and return the process exit code
    pub async fn run(&self) -> i32 {
        let start_time = Instant::now();
        let result = match &self.args.command {
            Command::Push {
                dir,
                reference,
                autotag,
            } => self.push(dir, reference, *autotag).await,
            Command::Pull {
                reference,
                out,
                clean,
                verify,
            } => self.pull(reference, out, *clean, *verify).await,
        };

        match result {
            Ok(()) => {
                self.output.verbose(&format!(
                    "Finished in {}",
                    self.output.format_duration(start_time.elapsed())
                ));
                0
            }
            Err(err) => {
                self.output.error(&err.to_string());
                err.exit_code()
            }
        }
    }

    fn client(&self, reference: &Reference) -> CliResult<RegistryClient> {
        let scheme = if self.args.insecure_http {
            Scheme::Http
        } else {
            Scheme::Https
        };

        let mut config = RegistryConfig::new(reference.registry.clone())
            .with_scheme(scheme)
            .with_chunk_size(self.args.chunk_size);
        if let Some(secs) = self.args.timeout {
            config = config.with_timeout(Duration::from_secs(secs));
        }

        let mut builder = RegistryClient::builder(config).with_logger(self.output.clone());
        if let Some(transport) = &self.transport {
            builder = builder.with_transport(Arc::clone(transport));
        }
        Ok(builder.build()?)
    }

    async fn push(&self, dir: &Path, reference: &str, autotag: bool) -> CliResult<()> {
        let mut reference: Reference = reference.parse()?;

        if !dir.exists() {
            return Err(CliError::InvalidInput(format!("{} does not exist", dir.display())));
        }
        if !dir.is_dir() {
            return Err(CliError::InvalidInput(format!("{} is not a directory", dir.display())));
        }

        self.output.section("Push");
        let mut manifest = artifact::artifact_from_dir(dir)?;
        if manifest.layers.is_empty() {
            return Err(CliError::InvalidInput(format!(
                "{} has no regular files to push",
                dir.display()
            )));
        }

        let tag = match (&reference.tag, autotag) {
            (Some(tag), _) => tag.clone(),
            (None, true) => artifact::autotag(&manifest),
            (None, false) => {
                return Err(CliError::InvalidInput(
                    "No tag provided and autotag is not enabled".to_string(),
                ));
            }
        };
        reference.set_tag(tag.clone());

        self.output.info(&format!("Pushing {}", reference));
        self.output.detail(&format!("{} file(s) from {}", manifest.layers.len(), dir.display()));

        let client = self.client(&reference)?;
        for descriptor in manifest.blobs_mut() {
            let name = descriptor.title().unwrap_or("config").to_string();
            let total = descriptor.size;
            if self.output.quiet {
                client
                    .push_descriptor(&reference.repository, descriptor, |_n: u64| {})
                    .await?;
            } else {
                let render = progress::transfer(&name, total, self.palette);
                let display = Display::new(render, io::stderr());
                client
                    .push_descriptor(&reference.repository, descriptor, display)
                    .await?;
            }
        }

        client
            .push_manifest(&reference.repository, &tag, &manifest)
            .await?;
        self.output.success(&format!("Pushed {}", reference));
        Ok(())
    }

    async fn pull(&self, reference: &str, out: &Path, clean: bool, verify: bool) -> CliResult<()> {
        let reference: Reference = reference.parse()?;
        let target = reference
            .reference()
            .ok_or_else(|| {
                CliError::InvalidInput(format!(
                    "{} does not have a tag or a digest attached",
                    reference
                ))
            })?
            .to_string();

        self.output.section("Pull");
        if !artifact::is_plain_file_name(&target) {
            return Err(CliError::InvalidInput(format!(
                "{} cannot be used as a directory name",
                target
            )));
        }
        let artifact_dir = out.join(&target);

        let client = self.client(&reference)?;
        let manifest = client.require_manifest(&reference).await?;

        if clean {
            match std::fs::remove_dir_all(&artifact_dir) {
                Ok(()) => self.output.detail(&format!("Removed {}", artifact_dir.display())),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        std::fs::create_dir_all(&artifact_dir)?;

        let config_path = artifact_dir.join(CONFIG_FILE_NAME);
        self.download(&client, &reference, &manifest.config, &config_path, verify)
            .await?;

        for layer in &manifest.layers {
            let Some(title) = layer.title() else {
                self.output
                    .warning(&format!("{} does not have filename attached, skipping", layer));
                continue;
            };
            if !artifact::is_plain_file_name(title) {
                self.output
                    .warning(&format!("{} has unusable filename '{}', skipping", layer, title));
                continue;
            }

            self.download(&client, &reference, layer, &artifact_dir.join(title), verify)
                .await?;
        }

        self.output
            .success(&format!("Pulled {} into {}", reference, artifact_dir.display()));
        Ok(())
    }

    async fn download(
        &self,
        client: &RegistryClient,
        reference: &Reference,
        descriptor: &Descriptor,
        dest: &Path,
        verify: bool,
    ) -> CliResult<()> {
        let name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file = File::create(dest)?;

        if self.output.quiet {
            let writer = ProgressWriter::new(file, |_n: u64| {});
            self.copy_blob(client, reference, descriptor, writer, verify)
                .await
        } else {
            let render = progress::transfer(&name, descriptor.size, self.palette);
            let writer = ProgressWriter::new(file, Display::new(render, io::stderr()));
            self.copy_blob(client, reference, descriptor, writer, verify)
                .await
        }
    }

    async fn copy_blob<T: Tick + Send>(
        &self,
        client: &RegistryClient,
        reference: &Reference,
        descriptor: &Descriptor,
        mut writer: ProgressWriter<File, T>,
        verify: bool,
    ) -> CliResult<()> {
        let mut blob = client
            .pull_blob(&reference.repository, &descriptor.digest)
            .await?;

        let written = if verify {
            blob.copy_verified(&mut writer, &descriptor.digest).await?
        } else {
            blob.copy_to(&mut writer).await?
        };
        blob.close();

        if written != descriptor.size {
            self.output.warning(&format!(
                "{} announced {} bytes but {} were received",
                descriptor.digest.short(),
                descriptor.size,
                written
            ));
        }
        Ok(())
    }
}
