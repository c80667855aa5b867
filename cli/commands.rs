pub mod check;
pub mod completion;
pub mod init;
pub mod open;
pub mod publish;
pub mod tree;
pub mod update;
