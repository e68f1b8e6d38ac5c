pub mod ingest;
pub mod init;
pub mod migrate;
pub mod status;
pub mod verify;
