pub mod ftl0_error;
pub mod ftl0_packet_type;
