//! Backend module.

mod dialog;

pub use dialog::HttpDialogForwarder;
