//! Generate command handler
//!
//! Validates the job arguments, uploads a reference image when one is
//! given, submits the job and then follows it.

use anyhow::{Context, Result, bail};
use clap::Args;
use colored::*;
use kiln_client::{JobClient, Transport};
use kiln_core::domain::credential::Credential;
use kiln_core::domain::job::{Job, JobId};
use kiln_core::dto::job::{JobSpec, TaskInput};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::commands::watch::watch_job;
use crate::config::Config;

/// Longest prompt the service accepts, in characters
const MAX_PROMPT_CHARS: usize = 500;

const ASPECT_RATIOS: [&str; 7] = ["1:1", "16:9", "4:3", "3:2", "2:3", "3:4", "9:16"];

/// Arguments of `kiln generate`
#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Text describing the image
    #[arg(long)]
    pub prompt: String,

    /// Rendering style
    #[arg(long, default_value = "默认")]
    pub style: String,

    /// Aspect ratio of the generated images
    #[arg(long, default_value = "1:1")]
    pub aspect_ratio: String,

    /// Number of images to generate (1-9)
    #[arg(long, default_value_t = 4)]
    pub count: u8,

    /// Local reference image (jpg or png), uploaded before submitting
    #[arg(long, conflicts_with_all = ["from_work", "from_url"])]
    pub image: Option<PathBuf>,

    /// Work ID of an earlier output to use as reference
    #[arg(long, requires = "from_url")]
    pub from_work: Option<String>,

    /// Resource URL of the earlier output
    #[arg(long, requires = "from_work")]
    pub from_url: Option<String>,

    /// How closely to follow the reference image (0-1)
    #[arg(long, default_value_t = 0.25)]
    pub fidelity: f32,

    /// Print the job ID and exit without waiting for the result
    #[arg(long)]
    pub no_wait: bool,
}

impl GenerateArgs {
    /// Checks the arguments before anything is sent
    pub fn validate(&self) -> Result<()> {
        let prompt = self.prompt.trim();
        if prompt.is_empty() {
            bail!("A prompt is required");
        }
        if prompt.chars().count() > MAX_PROMPT_CHARS {
            bail!("The prompt must be less than {} characters", MAX_PROMPT_CHARS);
        }
        if !ASPECT_RATIOS.contains(&self.aspect_ratio.as_str()) {
            bail!(
                "Unsupported aspect ratio '{}', expected one of {}",
                self.aspect_ratio,
                ASPECT_RATIOS.join(", ")
            );
        }
        if !(1..=9).contains(&self.count) {
            bail!("The image count must be between 1 and 9");
        }
        if !(0.0..=1.0).contains(&self.fidelity) {
            bail!("The fidelity must be between 0 and 1");
        }
        Ok(())
    }

    /// Builds the job, given the reference input if there is one
    pub fn to_spec(&self, reference: Option<TaskInput>) -> JobSpec {
        let spec = JobSpec::text_to_image(self.prompt.trim())
            .with_argument("style", &self.style)
            .with_argument("aspect_ratio", &self.aspect_ratio)
            .with_argument("imageCount", self.count.to_string())
            .with_argument("biz", "klingai");

        match reference {
            Some(input) => spec
                .with_argument("fidelity", self.fidelity.to_string())
                .with_input(input),
            None => spec,
        }
    }

    /// Reference to an earlier work, when both halves were given
    fn work_reference(&self) -> Option<TaskInput> {
        match (&self.from_work, &self.from_url) {
            (Some(work), Some(url)) => Some(TaskInput::from_work(url, JobId::from(work.as_str()))),
            _ => None,
        }
    }
}

/// Handle `kiln generate`
///
/// # Arguments
/// * `args` - Parsed command arguments
/// * `client` - Client used for upload, submission and polling
/// * `config` - The CLI configuration
pub async fn handle_generate(args: GenerateArgs, client: Arc<JobClient>, config: &Config) -> Result<()> {
    let job = submit_job(&args, &*client, &config.credential).await?;

    println!("{} Job submitted: {}", "✓".green(), job.id.to_string().bold());

    if args.no_wait {
        return Ok(());
    }

    watch_job(client, config, job.id).await
}

/// Validates, uploads the reference image if any, then submits
///
/// A failed upload returns before anything is submitted.
async fn submit_job<T: Transport>(
    args: &GenerateArgs,
    client: &JobClient<T>,
    credential: &Credential,
) -> Result<Job> {
    args.validate()?;

    let reference = match &args.image {
        Some(path) => {
            println!("{}", format!("Uploading {}...", path.display()).dimmed());
            let url = client
                .upload(path, credential)
                .await
                .context("Image upload failed, please retry")?;
            info!("Uploaded reference image to {}", url);
            Some(TaskInput::uploaded(url))
        }
        None => args.work_reference(),
    };

    let spec = args.to_spec(reference);
    client
        .submit(&spec, credential)
        .await
        .context("Failed to submit generation job")
}
