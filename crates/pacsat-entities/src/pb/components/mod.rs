pub mod pb_list;
