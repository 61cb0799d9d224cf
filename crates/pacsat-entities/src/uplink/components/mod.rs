pub mod ul_session;
pub mod upload_table;
