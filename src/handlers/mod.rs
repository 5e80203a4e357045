pub mod branches;
pub mod check;
pub mod init;
pub mod review;
