pub mod dl_session;
