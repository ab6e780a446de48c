/// UI module exports
pub mod components;
pub mod modal;
pub mod page;

pub use modal::{ModalContent, show_modal};
pub use page::DomPage;
