//! Job DTOs for communication with the generation service

use serde::{Deserialize, Serialize};

use crate::domain::job::{Job, JobId};

/// Kind of generation task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobType {
    TextToImage,
    ImageToImage,
    /// A task type this client does not know about, preserved verbatim
    Other(String),
}

impl JobType {
    pub fn as_str(&self) -> &str {
        match self {
            JobType::TextToImage => "mmu_txt2img_aiweb",
            JobType::ImageToImage => "mmu_img2img_aiweb",
            JobType::Other(tag) => tag,
        }
    }
}

impl From<String> for JobType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "mmu_txt2img_aiweb" => JobType::TextToImage,
            "mmu_img2img_aiweb" => JobType::ImageToImage,
            _ => JobType::Other(tag),
        }
    }
}

impl From<JobType> for String {
    fn from(job_type: JobType) -> Self {
        job_type.as_str().to_string()
    }
}

/// Named argument of a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    pub name: String,
    pub value: String,
}

/// How a task input references its resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputType {
    #[serde(rename = "URL")]
    Url,
}

/// Typed input referencing an uploaded or previously generated resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInput {
    pub name: String,
    pub input_type: InputType,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_work_id: Option<JobId>,
}

impl TaskInput {
    /// Input pointing at a freshly uploaded asset
    pub fn uploaded(url: impl Into<String>) -> Self {
        Self {
            name: "input".to_string(),
            input_type: InputType::Url,
            url: url.into(),
            from_work_id: None,
        }
    }

    /// Input pointing at the output of an earlier work
    pub fn from_work(url: impl Into<String>, work_id: JobId) -> Self {
        Self {
            from_work_id: Some(work_id),
            ..Self::uploaded(url)
        }
    }
}

/// Job description sent to the submission endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub arguments: Vec<Argument>,
    #[serde(default)]
    pub inputs: Vec<TaskInput>,
}

impl JobSpec {
    /// Creates a text-to-image job with the given prompt as its first argument
    pub fn text_to_image(prompt: impl Into<String>) -> Self {
        Self {
            job_type: JobType::TextToImage,
            arguments: vec![Argument {
                name: "prompt".to_string(),
                value: prompt.into(),
            }],
            inputs: Vec::new(),
        }
    }

    pub fn with_argument(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.arguments.push(Argument {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Attaches a reference image, turning a text-to-image job into image-to-image
    pub fn with_input(mut self, input: TaskInput) -> Self {
        if self.job_type == JobType::TextToImage {
            self.job_type = JobType::ImageToImage;
        }
        self.inputs.push(input);
        self
    }

    pub fn argument(&self, name: &str) -> Option<&str> {
        self.arguments
            .iter()
            .find(|arg| arg.name == name)
            .map(|arg| arg.value.as_str())
    }
}

/// Response envelope shared by every endpoint of the service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub status: u16,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}

/// Data returned by the submission endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitData {
    pub task: SubmittedTask,
    #[serde(default)]
    pub status: Option<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedTask {
    pub id: JobId,
}

impl From<SubmitData> for Job {
    fn from(data: SubmitData) -> Self {
        Job {
            id: data.task.id,
            initial_status: data.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_spec_serializes_in_service_format() {
        let spec = JobSpec::text_to_image("a lighthouse")
            .with_argument("aspect_ratio", "16:9")
            .with_input(TaskInput::from_work("https://cdn/x.png", JobId::from(7u64)));

        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["type"], "mmu_img2img_aiweb");
        assert_eq!(json["arguments"][0]["name"], "prompt");
        assert_eq!(json["arguments"][1]["value"], "16:9");
        assert_eq!(json["inputs"][0]["inputType"], "URL");
        assert_eq!(json["inputs"][0]["fromWorkId"], "7");
    }

    #[test]
    fn uploaded_input_omits_work_reference() {
        let json = serde_json::to_value(TaskInput::uploaded("https://cdn/up.jpg")).unwrap();
        assert!(json.get("fromWorkId").is_none());
        assert_eq!(json["name"], "input");
    }

    #[test]
    fn unknown_job_type_is_preserved() {
        let job_type: JobType = serde_json::from_str("\"m2v_txt2video\"").unwrap();
        assert_eq!(job_type, JobType::Other("m2v_txt2video".into()));
        assert_eq!(serde_json::to_string(&job_type).unwrap(), "\"m2v_txt2video\"");
    }

    #[test]
    fn submit_envelope_converts_into_job() {
        let envelope: Envelope<SubmitData> = serde_json::from_str(
            r#"{"status": 200, "message": "ok", "data": {"task": {"id": 123}, "status": 5}}"#,
        )
        .unwrap();
        let job: Job = envelope.data.unwrap().into();
        assert_eq!(job.id.as_str(), "123");
        assert_eq!(job.initial_status, Some(5));
    }

    fn decode<D: serde::de::DeserializeOwned>(body: &str) -> Envelope<D> {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn envelope_without_data_decodes_for_any_payload() {
        let envelope: Envelope<SubmitData> = decode(r#"{"status": 401}"#);
        assert_eq!(envelope.status, 401);
        assert!(envelope.message.is_none());
        assert!(envelope.data.is_none());

        let envelope: Envelope<SubmitData> = decode(r#"{"status": 500, "data": null}"#);
        assert!(envelope.data.is_none());
    }

    #[test]
    fn argument_lookup() {
        let spec = JobSpec::text_to_image("p").with_argument("imageCount", "4");
        assert_eq!(spec.argument("imageCount"), Some("4"));
        assert_eq!(spec.argument("missing"), None);
    }
}
