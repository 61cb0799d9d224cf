pub mod dir_broadcast;
pub mod dir_request;
pub mod file_broadcast;
pub mod file_request;
pub mod pb_response;
