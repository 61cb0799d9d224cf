pub mod pfh_compression;
pub mod pfh_file_type;
pub mod pfh_item_id;
