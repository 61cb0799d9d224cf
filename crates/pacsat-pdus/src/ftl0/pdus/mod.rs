pub mod login_resp;
pub mod ul_go_resp;
pub mod ul_status_resp;
pub mod upload_cmd;
