pub mod answer_store;
pub mod completion_gate;
pub mod question_provider;
pub mod submission;
pub mod validator;

pub use answer_store::{AnswerStore, CanonicalAnswers, SurveyState};
pub use completion_gate::{
    AccessToken, CompletionGate, CompletionMarker, FileMarkerStore, MarkerStore, MemoryMarkerStore,
    ResultsAccess,
};
pub use question_provider::QuestionProvider;
pub use submission::{SubmissionCoordinator, SurveyBackend};
pub use validator::{validate, Violation};
