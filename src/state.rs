use std::sync::Arc;

use crate::submission::SubmissionService;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub submissions: SubmissionService,
}
