pub mod pb_error;
pub mod pb_file_req_mode;
