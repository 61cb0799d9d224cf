pub mod enums;
pub mod ftl0_header;
pub mod pdus;
