pub mod answer;
pub mod page;
pub mod question;
pub mod submission;

pub use answer::{AnswerBuffer, AnswerValue, YesNo};
pub use page::{PageIndex, PageKind, PageRule, SlotConstraint, CANONICAL_LEN, PAGE_RULES};
pub use question::{Question, QuestionSet, QuestionsResponse};
pub use submission::{ErrorBody, FinalSubmission, PageSubmission};
