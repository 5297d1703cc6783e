//! Background job submission.

use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::coordinator::MergeCoordinator;
use crate::single::run_single_image;
use crate::storage::{JobRoot, JobState, JobStatus};
use crate::PipelineError;

const UPLOAD_RECEIVED: &str = "upload received";
const PANORAMA_STARTED: &str = "360 processing started";
const PANORAMA_DONE: &str = "360 PLYs generated";
const SINGLE_STARTED: &str = "ml-sharp started";
const SINGLE_DONE: &str = "PLY generated";

/// True for `*.360.jpg`, `*.360.jpeg` and `*.360.png`, ignoring case.
#[must_use]
pub fn is_360_filename(filename: &str) -> bool {
    let lowered = filename.to_lowercase();
    [".360.jpg", ".360.jpeg", ".360.png"]
        .iter()
        .any(|suffix| lowered.ends_with(suffix))
}

/// A submitted job running on its own thread.
pub struct JobHandle {
    id: String,
    handle: JoinHandle<()>,
}

impl JobHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wait for the job to finish. Its outcome is in the status record.
    pub fn join(self) -> Result<String, PipelineError> {
        self.handle
            .join()
            .map_err(|_| PipelineError::ThreadPanic(self.id.clone()))?;
        Ok(self.id)
    }
}

/// Accepts input images and runs each as an independent job.
#[derive(Clone)]
pub struct JobRunner {
    root: JobRoot,
    coordinator: Arc<MergeCoordinator>,
}

impl JobRunner {
    pub fn new(root: JobRoot, coordinator: MergeCoordinator) -> Self {
        Self {
            root,
            coordinator: Arc::new(coordinator),
        }
    }

    pub fn root(&self) -> &JobRoot {
        &self.root
    }

    /// Clear the job root, stage `input` in a fresh job directory, and start
    /// processing it on a worker thread. Returns once the job is `pending`.
    pub fn submit(&self, input: &Path) -> Result<JobHandle, PipelineError> {
        self.root.clear()?;
        let id = Uuid::new_v4().simple().to_string();

        let filename = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let staged = self.root.input_image_path(&id, &filename)?;
        self.root
            .write_status(&id, &JobStatus::new(JobState::Pending, UPLOAD_RECEIVED))?;
        if let Err(e) = std::fs::copy(input, &staged) {
            let err = PipelineError::io(input, e);
            error!("Job {id} upload failed: {err}");
            set_status(&self.root, &id, JobState::Error, &format!("upload failed: {err}"));
            return Err(err);
        }
        info!("Job {id} accepted: {filename}");

        let root = self.root.clone();
        let coordinator = Arc::clone(&self.coordinator);
        let job_id = id.clone();
        let handle = thread::Builder::new()
            .name(format!("job-{id}"))
            .spawn(move || run_job(&root, &coordinator, &job_id, &staged))
            .map_err(PipelineError::Spawn)?;

        Ok(JobHandle { id, handle })
    }
}

fn set_status(root: &JobRoot, job_id: &str, state: JobState, message: &str) {
    if let Err(e) = root.write_status(job_id, &JobStatus::new(state, message)) {
        warn!("Failed to write status for job {job_id}: {e}");
    }
}

fn run_job(root: &JobRoot, coordinator: &MergeCoordinator, job_id: &str, input: &Path) {
    let job_dir = root.job_dir(job_id);
    let log = root.job_log(job_id);
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let (started, done, result) = if is_360_filename(&name) {
        set_status(root, job_id, JobState::Running, PANORAMA_STARTED);
        let result = coordinator.run(input, &job_dir, &log).map(|_| ());
        (PANORAMA_STARTED, PANORAMA_DONE, result)
    } else {
        set_status(root, job_id, JobState::Running, SINGLE_STARTED);
        let tool = coordinator.reconstruction_tool();
        let result = run_single_image(tool.as_ref(), input, &job_dir, &log).map(|_| ());
        (SINGLE_STARTED, SINGLE_DONE, result)
    };

    match result {
        Ok(()) => {
            info!("Job {job_id} done");
            set_status(root, job_id, JobState::Done, done);
        }
        Err(e) => {
            error!("Job {job_id} failed after '{started}' ({:?}): {e}", e.kind());
            set_status(root, job_id, JobState::Error, &e.to_string());
        }
    }
}
