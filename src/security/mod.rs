pub mod admin_key;
pub mod jwt;
pub mod otp;
pub mod password;
