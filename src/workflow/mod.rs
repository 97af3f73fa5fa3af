pub mod page_controller;
pub mod request_tag;
pub mod wizard;

pub use page_controller::PageController;
pub use request_tag::RequestTag;
pub use wizard::{Applied, Effect, Stage, Wizard};
