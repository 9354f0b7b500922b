mod init;
mod init_db;

pub use init::cmd_init;
pub use init_db::cmd_init_db;
