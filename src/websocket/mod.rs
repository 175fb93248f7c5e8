pub mod handler;
pub mod session;
pub mod msg_initiate_handler;
pub mod msg_edit_handler;
pub mod msg_save_handler;
