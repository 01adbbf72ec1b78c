pub mod health;
pub mod onesignal;
pub mod realtime;
