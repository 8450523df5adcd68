//! Service-level error types: explicit `thiserror` variants, `From` impls
//! at the seams, and a mapping onto `tonic::Status` at the gRPC boundary.

use thiserror::Error;
use tonic::Status;

#[derive(Debug, Error, Clone)]
pub enum JobServiceError {
    #[error("job not found: {0}")]
    JobNotFound(String),
    #[error("job id already exists: {0}")]
    DuplicateJobId(String),
    #[error("epochs must be >= 1, got {0}")]
    InvalidEpochs(u32),
    #[error("num_workers must be >= 1, got {0}")]
    InvalidNumWorkers(u32),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<JobServiceError> for Status {
    fn from(value: JobServiceError) -> Self {
        match value {
            JobServiceError::JobNotFound(id) => {
                Status::not_found(format!("job not found: {id}"))
            }
            JobServiceError::DuplicateJobId(id) => {
                Status::invalid_argument(format!("job id already exists: {id}"))
            }
            JobServiceError::InvalidEpochs(_) | JobServiceError::InvalidNumWorkers(_) => {
                Status::invalid_argument(value.to_string())
            }
            JobServiceError::Internal(msg) => Status::internal(msg),
        }
    }
}
